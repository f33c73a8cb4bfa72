//! In-memory record store loaded from a JSON Lines export.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use super::types::{FieldTag, RecordId, RecordStore, StoreError};

/// One line of the record export.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoredRecord {
    /// Record identifier.
    pub id: RecordId,
    /// Field values keyed by MARC code (`245__a`, ...).
    #[serde(default)]
    pub fields: HashMap<String, Vec<String>>,
    /// Deleted records keep their identifier but no longer exist.
    #[serde(default)]
    pub deleted: bool,
}

impl StoredRecord {
    /// Build a live record with no fields.
    pub fn new(id: RecordId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Append a value under `tag`.
    pub fn with_field(mut self, tag: FieldTag, value: impl Into<String>) -> Self {
        self.fields
            .entry(tag.code().to_string())
            .or_default()
            .push(value.into());
        self
    }
}

/// Record store holding the whole export in memory, keyed by identifier.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: BTreeMap<RecordId, StoredRecord>,
}

impl MemoryRecordStore {
    /// Build a store from already materialized records. Later duplicates replace earlier ones.
    pub fn from_records(records: impl IntoIterator<Item = StoredRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|record| (record.id, record))
                .collect(),
        }
    }

    /// Parse a JSON Lines export. Blank lines are ignored.
    pub fn parse(contents: &str) -> Result<Self, StoreError> {
        let mut records = Vec::new();
        for (index, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: StoredRecord =
                serde_json::from_str(line).map_err(|source| StoreError::Malformed {
                    line: index + 1,
                    source,
                })?;
            records.push(record);
        }
        Ok(Self::from_records(records))
    }

    /// Read and parse the export at `path`.
    pub async fn load(path: &Path) -> Result<Self, StoreError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| StoreError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let store = Self::parse(&contents)?;
        tracing::info!(
            path = %path.display(),
            records = store.len(),
            max_recid = store.records.keys().next_back().copied().unwrap_or(0),
            "Loaded record export"
        );
        Ok(store)
    }

    /// Number of records in the export, deleted ones included.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the export is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn live(&self, recid: RecordId) -> Option<&StoredRecord> {
        self.records.get(&recid).filter(|record| !record.deleted)
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn max_record_id(&self) -> Result<RecordId, StoreError> {
        Ok(self.records.keys().next_back().copied().unwrap_or(0))
    }

    async fn record_exists(&self, recid: RecordId) -> Result<bool, StoreError> {
        Ok(self.live(recid).is_some())
    }

    async fn field_values(
        &self,
        recid: RecordId,
        tag: FieldTag,
    ) -> Result<Vec<String>, StoreError> {
        Ok(self
            .live(recid)
            .and_then(|record| record.fields.get(tag.code()))
            .cloned()
            .unwrap_or_default())
    }
}
