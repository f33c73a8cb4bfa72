//! Primary bibliographic store and full-text collaborators.

pub mod fulltext;
pub mod memory;
pub mod types;

pub use fulltext::{DirectoryFullText, NoFullText, decode_attachment};
pub use memory::{MemoryRecordStore, StoredRecord};
pub use types::{FieldTag, FullTextSource, RecordId, RecordStore, StoreError};
