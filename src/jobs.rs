//! Job control: run options, progress reporting and the shared job status.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::config::DEFAULT_FLUSH_SIZE;
use crate::store::RecordId;

/// Errors raised while parsing identifier ranges such as `1-100,250`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeParseError {
    /// A bound was not a positive integer.
    #[error("invalid record id '{0}'")]
    InvalidId(String),
    /// The lower bound exceeds the upper bound.
    #[error("range {0}-{1} is reversed")]
    Reversed(RecordId, RecordId),
    /// No range was supplied.
    #[error("empty range list")]
    Empty,
}

/// Inclusive range of record identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordRange {
    /// First identifier.
    pub lower: RecordId,
    /// Last identifier.
    pub upper: RecordId,
}

impl RecordRange {
    /// Build a range, rejecting reversed bounds.
    pub fn new(lower: RecordId, upper: RecordId) -> Result<Self, RangeParseError> {
        if lower > upper {
            return Err(RangeParseError::Reversed(lower, upper));
        }
        Ok(Self { lower, upper })
    }

    /// Parse a comma separated list of ids and `lo-hi` ranges.
    pub fn parse_list(input: &str) -> Result<Vec<Self>, RangeParseError> {
        let ranges = input
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<Self>, _>>()?;
        if ranges.is_empty() {
            return Err(RangeParseError::Empty);
        }
        Ok(ranges)
    }
}

impl FromStr for RecordRange {
    type Err = RangeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_id = |raw: &str| -> Result<RecordId, RangeParseError> {
            raw.trim()
                .parse::<RecordId>()
                .ok()
                .filter(|id| *id > 0)
                .ok_or_else(|| RangeParseError::InvalidId(raw.trim().to_string()))
        };
        match s.split_once('-') {
            Some((lower, upper)) => Self::new(parse_id(lower)?, parse_id(upper)?),
            None => {
                let id = parse_id(s)?;
                Self::new(id, id)
            }
        }
    }
}

impl fmt::Display for RecordRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.lower, self.upper)
    }
}

/// Options of one indexing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOptions {
    /// Records submitted between two commits.
    pub flush: usize,
    /// Explicit ranges; empty means every record.
    pub ranges: Vec<RecordRange>,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            flush: DEFAULT_FLUSH_SIZE,
            ranges: Vec::new(),
        }
    }
}

/// Sink for the messages a run emits.
pub trait ProgressReporter: Send + Sync {
    /// Log a free-form message.
    fn write_message(&self, message: &str);

    /// Record the latest progress line of the run.
    fn report_progress(&self, message: &str);
}

/// Reporter that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn write_message(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn report_progress(&self, message: &str) {
        tracing::info!(progress = message, "Indexing progress");
    }
}

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Nothing started yet.
    Idle,
    /// A run is in progress.
    Running,
    /// The last run finished.
    Done,
    /// The last run aborted.
    Failed,
}

/// Serializable view of the current job.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    /// Lifecycle state.
    pub state: JobState,
    /// Latest progress line.
    pub progress: Option<String>,
    /// Error that aborted the last run.
    pub error: Option<String>,
    /// RFC 3339 start time of the current or last run.
    pub started_at: Option<String>,
    /// RFC 3339 end time of the last run.
    pub finished_at: Option<String>,
}

impl Default for JobSnapshot {
    fn default() -> Self {
        Self {
            state: JobState::Idle,
            progress: None,
            error: None,
            started_at: None,
            finished_at: None,
        }
    }
}

/// Shared, cloneable job status doubling as a progress reporter.
#[derive(Debug, Clone, Default)]
pub struct JobStatus {
    inner: Arc<Mutex<JobSnapshot>>,
}

impl JobStatus {
    /// Create an idle status.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move to `Running` unless a run is already active. Returns whether the run may start.
    pub fn try_start(&self) -> bool {
        let mut guard = self.lock();
        if guard.state == JobState::Running {
            return false;
        }
        *guard = JobSnapshot {
            state: JobState::Running,
            started_at: Some(now_rfc3339()),
            ..JobSnapshot::default()
        };
        true
    }

    /// Mark the run finished.
    pub fn finish(&self) {
        let mut guard = self.lock();
        guard.state = JobState::Done;
        guard.finished_at = Some(now_rfc3339());
    }

    /// Mark the run failed with `error`.
    pub fn fail(&self, error: &str) {
        let mut guard = self.lock();
        guard.state = JobState::Failed;
        guard.error = Some(error.to_string());
        guard.finished_at = Some(now_rfc3339());
    }

    /// Copy of the current status.
    pub fn snapshot(&self) -> JobSnapshot {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, JobSnapshot> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ProgressReporter for JobStatus {
    fn write_message(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn report_progress(&self, message: &str) {
        tracing::info!(progress = message, "Indexing progress");
        self.lock().progress = Some(message.to_string());
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ranges_and_single_ids() {
        let ranges = RecordRange::parse_list("1-10, 42 ,100-100").expect("ranges");
        assert_eq!(
            ranges,
            vec![
                RecordRange { lower: 1, upper: 10 },
                RecordRange { lower: 42, upper: 42 },
                RecordRange { lower: 100, upper: 100 },
            ]
        );
        assert_eq!(ranges[0].to_string(), "1-10");
    }

    #[test]
    fn rejects_bad_ranges() {
        assert_eq!(
            RecordRange::parse_list("10-1"),
            Err(RangeParseError::Reversed(10, 1))
        );
        assert_eq!(
            RecordRange::parse_list("a-3"),
            Err(RangeParseError::InvalidId("a".into()))
        );
        assert_eq!(
            RecordRange::parse_list("0"),
            Err(RangeParseError::InvalidId("0".into()))
        );
        assert_eq!(RecordRange::parse_list(" , "), Err(RangeParseError::Empty));
    }

    #[test]
    fn job_status_tracks_lifecycle() {
        let status = JobStatus::new();
        assert_eq!(status.snapshot().state, JobState::Idle);

        assert!(status.try_start());
        assert!(!status.try_start());
        status.report_progress("......processed 5/10 records");
        let running = status.snapshot();
        assert_eq!(running.state, JobState::Running);
        assert_eq!(running.progress.as_deref(), Some("......processed 5/10 records"));
        assert!(running.started_at.is_some());

        status.fail("Solr unreachable");
        let failed = status.snapshot();
        assert_eq!(failed.state, JobState::Failed);
        assert_eq!(failed.error.as_deref(), Some("Solr unreachable"));

        assert!(status.try_start());
        let restarted = status.snapshot();
        assert!(restarted.error.is_none());
        assert!(restarted.progress.is_none());
        status.finish();
        assert_eq!(status.snapshot().state, JobState::Done);
    }
}
