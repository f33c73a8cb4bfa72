//! Batch driver walking record ranges and pushing documents to the index.

use std::ops::AddAssign;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::jobs::{JobOptions, ProgressReporter, RecordRange};
use crate::solr::{DocumentIndex, SolrError};
use crate::store::{FullTextSource, RecordId, RecordStore, StoreError};

use super::chunks::chunk_ranges;
use super::extract::extract_record;

/// Errors aborting a synchronization run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The requested range is reversed.
    #[error("invalid record range {lower}-{upper}")]
    InvalidRange {
        /// Requested lower bound.
        lower: RecordId,
        /// Requested upper bound.
        upper: RecordId,
    },
    /// The flush size must be at least one.
    #[error("flush size must be greater than zero")]
    InvalidFlushSize,
    /// The primary store could not be queried.
    #[error("record store query failed: {0}")]
    Store(#[from] StoreError),
    /// Solr rejected a submission or a commit, or could not be reached.
    #[error("Solr request failed: {0}")]
    Solr(#[from] SolrError),
}

/// Counters describing a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    /// Identifiers walked, existing or not.
    pub visited: u64,
    /// Documents submitted to the index.
    pub submitted: u64,
    /// Identifiers without a live record.
    pub skipped: u64,
    /// Fields indexed empty because their extraction failed.
    pub field_failures: u64,
    /// Commits issued.
    pub commits: u64,
}

impl AddAssign for SyncSummary {
    fn add_assign(&mut self, other: Self) {
        self.visited += other.visited;
        self.submitted += other.submitted;
        self.skipped += other.skipped;
        self.field_failures += other.field_failures;
        self.commits += other.commits;
    }
}

/// Pushes bibliographic fields of record ranges into the index, one commit per chunk.
///
/// The synchronizer owns its collaborators; the index handle is opened by the caller once per
/// process and reused for every chunk of every run.
pub struct Synchronizer {
    store: Arc<dyn RecordStore>,
    fulltext: Arc<dyn FullTextSource>,
    index: Arc<dyn DocumentIndex>,
}

impl Synchronizer {
    /// Assemble a synchronizer from its collaborators.
    pub fn new(
        store: Arc<dyn RecordStore>,
        fulltext: Arc<dyn FullTextSource>,
        index: Arc<dyn DocumentIndex>,
    ) -> Self {
        Self {
            store,
            fulltext,
            index,
        }
    }

    /// Index every identifier of `[lower, upper]`, committing every `flush` identifiers.
    pub async fn synchronize(
        &self,
        lower: RecordId,
        upper: RecordId,
        flush: usize,
        reporter: &dyn ProgressReporter,
    ) -> Result<SyncSummary, SyncError> {
        if flush == 0 {
            return Err(SyncError::InvalidFlushSize);
        }
        if lower > upper {
            return Err(SyncError::InvalidRange { lower, upper });
        }

        let total = u64::from(upper) - u64::from(lower) + 1;
        let mut processed = 0_u64;
        let mut summary = SyncSummary::default();

        for chunk in chunk_ranges(lower, upper, flush) {
            summary += self.index_chunk(chunk).await?;
            processed += chunk.len();
            let message = format!("......processed {processed}/{total} records");
            reporter.write_message(&message);
            reporter.report_progress(&message);
        }

        tracing::info!(
            lower,
            upper,
            flush,
            submitted = summary.submitted,
            skipped = summary.skipped,
            field_failures = summary.field_failures,
            commits = summary.commits,
            "Range synchronized"
        );
        Ok(summary)
    }

    /// Index every record from `1` up to the largest known identifier.
    pub async fn synchronize_all(
        &self,
        flush: usize,
        reporter: &dyn ProgressReporter,
    ) -> Result<SyncSummary, SyncError> {
        if flush == 0 {
            return Err(SyncError::InvalidFlushSize);
        }
        let upper = self.store.max_record_id().await?;
        reporter.write_message(&format!("Solr ranking indexer called for 1-{upper}"));
        if upper == 0 {
            reporter.report_progress("......processed 0/0 records");
            return Ok(SyncSummary::default());
        }
        self.synchronize(1, upper, flush, reporter).await
    }

    /// Run a full indexing job: the explicit ranges of `options`, or every record.
    pub async fn run_job(
        &self,
        options: &JobOptions,
        reporter: &dyn ProgressReporter,
    ) -> Result<SyncSummary, SyncError> {
        let summary = if options.ranges.is_empty() {
            self.synchronize_all(options.flush, reporter).await?
        } else {
            let mut summary = SyncSummary::default();
            for RecordRange { lower, upper } in &options.ranges {
                reporter.write_message(&format!("Solr ranking indexer called for {lower}-{upper}"));
                summary += self
                    .synchronize(*lower, *upper, options.flush, reporter)
                    .await?;
            }
            summary
        };
        reporter.write_message("Solr ranking indexer completed");
        Ok(summary)
    }

    async fn index_chunk(&self, chunk: RecordRange) -> Result<SyncSummary, SyncError> {
        let mut summary = SyncSummary::default();
        for recid in chunk.ids() {
            summary.visited += 1;
            if !self.store.record_exists(recid).await? {
                tracing::trace!(recid, "Skipping missing record");
                summary.skipped += 1;
                continue;
            }

            let extraction =
                extract_record(self.store.as_ref(), self.fulltext.as_ref(), recid).await;
            summary.field_failures += extraction.failures() as u64;
            self.index.submit(&extraction.into_document()).await?;
            summary.submitted += 1;
        }

        self.index.commit().await?;
        summary.commits += 1;
        tracing::debug!(
            lower = chunk.lower,
            upper = chunk.upper,
            submitted = summary.submitted,
            "Chunk committed"
        );
        Ok(summary)
    }
}
