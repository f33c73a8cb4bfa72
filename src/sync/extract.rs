//! Per-record field extraction.
//!
//! Every field is extracted independently into a [`FieldOutcome`]. Absence and failure both end
//! up as an empty string in the indexed document, but they stay distinguishable here so that the
//! run can log and count real failures.

use crate::solr::SolrDocument;
use crate::store::{FieldTag, FullTextSource, RecordId, RecordStore, StoreError};
use crate::text::{remove_control_characters, remove_invalid_index_characters};

/// Result of extracting one field of one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldOutcome {
    /// The field had a value.
    Present(String),
    /// The record does not carry the field.
    Absent,
    /// Reading or decoding the field failed.
    Failed(String),
}

impl FieldOutcome {
    /// Collapse into the sanitized value submitted to the index.
    pub fn into_value(self) -> String {
        match self {
            Self::Present(value) => sanitize(&value),
            Self::Absent | Self::Failed(_) => String::new(),
        }
    }

    /// Whether extraction failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Outcomes of the six indexed fields of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordExtraction {
    /// Record identifier.
    pub recid: RecordId,
    /// `abstract` field.
    pub abstract_text: FieldOutcome,
    /// `author` field.
    pub author: FieldOutcome,
    /// `fulltext` field.
    pub fulltext: FieldOutcome,
    /// `keyword` field.
    pub keyword: FieldOutcome,
    /// `title` field.
    pub title: FieldOutcome,
}

impl RecordExtraction {
    /// Fields paired with their index names.
    pub fn fields(&self) -> [(&'static str, &FieldOutcome); 5] {
        [
            ("abstract", &self.abstract_text),
            ("author", &self.author),
            ("fulltext", &self.fulltext),
            ("keyword", &self.keyword),
            ("title", &self.title),
        ]
    }

    /// Number of fields whose extraction failed.
    pub fn failures(&self) -> usize {
        self.fields()
            .iter()
            .filter(|(_, outcome)| outcome.is_failed())
            .count()
    }

    /// Build the sanitized document.
    pub fn into_document(self) -> SolrDocument {
        SolrDocument {
            id: self.recid,
            abstract_text: self.abstract_text.into_value(),
            author: self.author.into_value(),
            fulltext: self.fulltext.into_value(),
            keyword: self.keyword.into_value(),
            title: self.title.into_value(),
        }
    }
}

/// Extract all indexed fields of `recid`. Never fails; errors are captured per field.
pub async fn extract_record(
    store: &dyn RecordStore,
    fulltext: &dyn FullTextSource,
    recid: RecordId,
) -> RecordExtraction {
    let extraction = RecordExtraction {
        recid,
        abstract_text: first_value(store, recid, FieldTag::Abstract).await,
        author: authors(store, recid).await,
        fulltext: full_text(fulltext, recid).await,
        keyword: joined_values(store, recid, FieldTag::Keyword).await,
        title: first_value(store, recid, FieldTag::Title).await,
    };

    for (field, outcome) in extraction.fields() {
        match outcome {
            FieldOutcome::Failed(reason) => tracing::warn!(
                recid,
                field,
                reason = %reason,
                "Field extraction failed; indexing empty value"
            ),
            FieldOutcome::Absent => tracing::trace!(recid, field, "Field absent"),
            FieldOutcome::Present(_) => {}
        }
    }
    extraction
}

/// Control-character removal followed by Solr character filtering.
pub fn sanitize(value: &str) -> String {
    remove_invalid_index_characters(&remove_control_characters(value))
}

async fn first_value(store: &dyn RecordStore, recid: RecordId, tag: FieldTag) -> FieldOutcome {
    match store.field_values(recid, tag).await {
        Ok(values) => values
            .into_iter()
            .next()
            .map_or(FieldOutcome::Absent, FieldOutcome::Present),
        Err(err) => failed(tag, &err),
    }
}

async fn joined_values(store: &dyn RecordStore, recid: RecordId, tag: FieldTag) -> FieldOutcome {
    match store.field_values(recid, tag).await {
        Ok(values) if values.is_empty() => FieldOutcome::Absent,
        Ok(values) => FieldOutcome::Present(values.join(" ")),
        Err(err) => failed(tag, &err),
    }
}

/// Primary author followed by additional authors. Without a primary author the field is absent.
///
/// Names are joined with single spaces and the value never starts with a separator.
async fn authors(store: &dyn RecordStore, recid: RecordId) -> FieldOutcome {
    let first = match first_value(store, recid, FieldTag::AuthorName).await {
        FieldOutcome::Present(first) => first,
        other => return other,
    };
    match store
        .field_values(recid, FieldTag::AdditionalAuthorName)
        .await
    {
        Ok(additional) => {
            let mut names = Vec::with_capacity(additional.len() + 1);
            names.push(first);
            names.extend(additional);
            FieldOutcome::Present(names.join(" "))
        }
        Err(err) => failed(FieldTag::AdditionalAuthorName, &err),
    }
}

async fn full_text(source: &dyn FullTextSource, recid: RecordId) -> FieldOutcome {
    match source.full_text(recid).await {
        Ok(text) => FieldOutcome::Present(text),
        Err(StoreError::MissingAttachment(_)) => FieldOutcome::Absent,
        Err(err) => FieldOutcome::Failed(err.to_string()),
    }
}

fn failed(tag: FieldTag, err: &StoreError) -> FieldOutcome {
    FieldOutcome::Failed(format!("{tag}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryRecordStore, NoFullText, StoredRecord};
    use async_trait::async_trait;

    struct BrokenKeywords(MemoryRecordStore);

    #[async_trait]
    impl RecordStore for BrokenKeywords {
        async fn max_record_id(&self) -> Result<RecordId, StoreError> {
            self.0.max_record_id().await
        }

        async fn record_exists(&self, recid: RecordId) -> Result<bool, StoreError> {
            self.0.record_exists(recid).await
        }

        async fn field_values(
            &self,
            recid: RecordId,
            tag: FieldTag,
        ) -> Result<Vec<String>, StoreError> {
            if tag == FieldTag::Keyword {
                return Err(StoreError::Decode {
                    recid,
                    reason: "invalid utf-8".into(),
                });
            }
            self.0.field_values(recid, tag).await
        }
    }

    struct FixedText(&'static str);

    #[async_trait]
    impl FullTextSource for FixedText {
        async fn full_text(&self, _recid: RecordId) -> Result<String, StoreError> {
            Ok(self.0.to_string())
        }
    }

    fn sample_store() -> MemoryRecordStore {
        MemoryRecordStore::from_records([StoredRecord::new(1)
            .with_field(FieldTag::Abstract, "abc\u{0}\ndef")
            .with_field(FieldTag::Abstract, "ignored second abstract")
            .with_field(FieldTag::AuthorName, "Ellis, J")
            .with_field(FieldTag::AdditionalAuthorName, "Higgs, P")
            .with_field(FieldTag::AdditionalAuthorName, "Englert, F")
            .with_field(FieldTag::Keyword, "boson")
            .with_field(FieldTag::Keyword, "mass")])
    }

    #[tokio::test]
    async fn missing_title_is_absent_and_other_fields_survive() {
        let store = sample_store();
        let extraction = extract_record(&store, &FixedText("body\u{FFFF}"), 1).await;

        assert_eq!(extraction.title, FieldOutcome::Absent);
        assert_eq!(extraction.failures(), 0);

        let document = extraction.into_document();
        assert_eq!(document.id, 1);
        assert_eq!(document.title, "");
        assert_eq!(document.abstract_text, "abc \ndef");
        assert_eq!(document.author, "Ellis, J Higgs, P Englert, F");
        assert_eq!(document.keyword, "boson mass");
        assert_eq!(document.fulltext, "body");
    }

    #[tokio::test]
    async fn failed_field_is_distinguished_but_indexed_empty() {
        let store = BrokenKeywords(sample_store());
        let extraction = extract_record(&store, &NoFullText, 1).await;

        assert!(extraction.keyword.is_failed());
        assert_eq!(extraction.fulltext, FieldOutcome::Absent);
        assert_eq!(extraction.failures(), 1);

        let document = extraction.into_document();
        assert_eq!(document.keyword, "");
        assert_eq!(document.author, "Ellis, J Higgs, P Englert, F");
    }

    #[tokio::test]
    async fn additional_authors_without_primary_author_yield_empty_author() {
        let store = MemoryRecordStore::from_records([
            StoredRecord::new(2).with_field(FieldTag::AdditionalAuthorName, "Orphan, A")
        ]);
        let extraction = extract_record(&store, &NoFullText, 2).await;
        assert_eq!(extraction.author, FieldOutcome::Absent);
    }

    #[tokio::test]
    async fn primary_author_alone_has_no_trailing_separator() {
        let store = MemoryRecordStore::from_records([
            StoredRecord::new(3).with_field(FieldTag::AuthorName, "Solo, H")
        ]);
        let extraction = extract_record(&store, &NoFullText, 3).await;
        assert_eq!(extraction.author, FieldOutcome::Present("Solo, H".into()));
    }
}
