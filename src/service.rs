//! Long-lived indexing service shared by the HTTP surface.

use crate::jobs::{JobOptions, JobSnapshot, JobStatus};
use crate::solr::{SolrClient, SolrError};
use crate::store::{
    DirectoryFullText, FullTextSource, MemoryRecordStore, NoFullText, RecordId, StoreError,
};
use crate::sync::{SyncError, SyncSummary, Synchronizer};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

/// Operations exposed to external surfaces.
#[async_trait]
pub trait IndexingApi: Send + Sync {
    /// Start a background run. Returns `false` when a run is already active.
    fn start_sync(&self, options: JobOptions) -> bool;

    /// Status of the current or last run.
    fn status(&self) -> JobSnapshot;

    /// Record ids matching `field:query`.
    async fn search(&self, field: &str, query: &str) -> Result<BTreeSet<RecordId>, SolrError>;
}

/// Synchronizer, Solr client and job status bundled for the server.
pub struct IndexingService {
    synchronizer: Arc<Synchronizer>,
    solr: Arc<SolrClient>,
    status: JobStatus,
}

impl IndexingService {
    /// Wrap an assembled synchronizer and the client it submits to.
    pub fn new(synchronizer: Synchronizer, solr: Arc<SolrClient>) -> Self {
        Self {
            synchronizer: Arc::new(synchronizer),
            solr,
            status: JobStatus::new(),
        }
    }
}

#[async_trait]
impl IndexingApi for IndexingService {
    fn start_sync(&self, options: JobOptions) -> bool {
        if !self.status.try_start() {
            tracing::warn!("Indexing run requested while another is active");
            return false;
        }

        let synchronizer = Arc::clone(&self.synchronizer);
        let status = self.status.clone();
        tokio::spawn(supervise(status.clone(), async move {
            synchronizer.run_job(&options, &status).await
        }));
        true
    }

    fn status(&self) -> JobSnapshot {
        self.status.snapshot()
    }

    async fn search(&self, field: &str, query: &str) -> Result<BTreeSet<RecordId>, SolrError> {
        self.solr.search_ids(field, query).await
    }
}

/// Drive `run` on its own task and settle `status` however it ends, panics included.
async fn supervise<F>(status: JobStatus, run: F)
where
    F: Future<Output = Result<SyncSummary, SyncError>> + Send + 'static,
{
    match tokio::spawn(run).await {
        Ok(Ok(summary)) => {
            tracing::info!(
                submitted = summary.submitted,
                commits = summary.commits,
                "Background indexing run finished"
            );
            status.finish();
        }
        Ok(Err(err)) => {
            tracing::error!(error = %err, "Background indexing run failed");
            status.fail(&err.to_string());
        }
        Err(err) => {
            tracing::error!(error = %err, "Background indexing run aborted");
            status.fail(&format!("indexing run aborted: {err}"));
        }
    }
}

/// Load the record export and full-text directory and wire them to `solr`.
pub async fn build_synchronizer(
    records_path: &Path,
    fulltext_dir: Option<&Path>,
    solr: Arc<SolrClient>,
) -> Result<Synchronizer, StoreError> {
    let store = MemoryRecordStore::load(records_path).await?;
    let fulltext: Arc<dyn FullTextSource> = match fulltext_dir {
        Some(dir) => Arc::new(DirectoryFullText::new(dir)),
        None => {
            tracing::info!("No full-text directory configured; fulltext fields stay empty");
            Arc::new(NoFullText)
        }
    };
    Ok(Synchronizer::new(Arc::new(store), fulltext, solr))
}
