//! Batch field synchronizer: record store to Solr, chunk by chunk.

pub mod chunks;
pub mod extract;
mod synchronizer;

pub use chunks::{ChunkPlan, chunk_ranges};
pub use extract::{FieldOutcome, RecordExtraction, extract_record, sanitize};
pub use synchronizer::{SyncError, SyncSummary, Synchronizer};
