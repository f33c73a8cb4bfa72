//! Collaborator traits and shared types for the record store.

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Identifier of a bibliographic record.
pub type RecordId = u32;

/// Errors returned by the record store and the full-text source.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failed while reading the export or an attachment.
    #[error("I/O failure on {path}: {source}")]
    Io {
        /// File being read.
        path: PathBuf,
        /// Error raised by the operating system.
        #[source]
        source: std::io::Error,
    },
    /// A line of the JSON Lines export could not be parsed.
    #[error("Malformed record on line {line}: {source}")]
    Malformed {
        /// One-based line number inside the export.
        line: usize,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },
    /// The record has no full-text attachment.
    #[error("Record {0} has no full-text attachment")]
    MissingAttachment(RecordId),
    /// The attachment bytes are not valid text.
    #[error("Record {recid} attachment could not be decoded: {reason}")]
    Decode {
        /// Record owning the attachment.
        recid: RecordId,
        /// Decoder diagnostic.
        reason: String,
    },
}

/// MARC field tags read by the indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldTag {
    /// `520__a`
    Abstract,
    /// `100__a`
    AuthorName,
    /// `700__a`
    AdditionalAuthorName,
    /// `245__a`
    Title,
    /// `6531_a`
    Keyword,
}

impl FieldTag {
    /// MARC code of the tag as stored in the record export.
    pub const fn code(self) -> &'static str {
        match self {
            Self::Abstract => "520__a",
            Self::AuthorName => "100__a",
            Self::AdditionalAuthorName => "700__a",
            Self::Title => "245__a",
            Self::Keyword => "6531_a",
        }
    }
}

impl fmt::Display for FieldTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Query interface of the primary bibliographic store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Largest record identifier known to the store, `0` when empty.
    async fn max_record_id(&self) -> Result<RecordId, StoreError>;

    /// Whether `recid` refers to a live record.
    async fn record_exists(&self, recid: RecordId) -> Result<bool, StoreError>;

    /// Ordered values stored under `tag`; empty when the field is absent.
    async fn field_values(&self, recid: RecordId, tag: FieldTag)
    -> Result<Vec<String>, StoreError>;
}

/// Source of extracted document text for a record.
#[async_trait]
pub trait FullTextSource: Send + Sync {
    /// Full text of the record's attachments.
    async fn full_text(&self, recid: RecordId) -> Result<String, StoreError>;
}
