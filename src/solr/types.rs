//! Shared types used by the Solr client and the synchronizer.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::store::RecordId;

/// Errors returned while interacting with Solr.
#[derive(Debug, Error)]
pub enum SolrError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid Solr URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Solr responded with an unexpected status code.
    #[error("Unexpected Solr response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from Solr.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// A returned document carried an identifier that is not a record id.
    #[error("Solr returned a non-numeric document id: {0}")]
    InvalidDocumentId(String),
}

/// Sanitized projection of a record as stored in the index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolrDocument {
    /// Record identifier, the document's unique key.
    pub id: RecordId,
    /// Abstract text.
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// Primary author followed by additional authors.
    pub author: String,
    /// Extracted full text of the attachments.
    pub fulltext: String,
    /// Space separated keywords.
    pub keyword: String,
    /// Title.
    pub title: String,
}

/// Index operations used by the synchronizer.
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// Add or overwrite a document; the id is the key.
    async fn submit(&self, document: &SolrDocument) -> Result<(), SolrError>;

    /// Make every submitted document visible to searchers.
    async fn commit(&self) -> Result<(), SolrError>;
}

/// Cutoffs applied to ranking queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankingParams {
    /// Maximum number of hit-set ids shipped to Solr as a filter.
    pub cutoff_amount: usize,
    /// Solr `timeAllowed` in milliseconds.
    pub cutoff_time_ms: u64,
    /// MoreLikeThis tuning used by similar-record queries.
    pub similar: SimilarityParams,
}

impl Default for RankingParams {
    fn default() -> Self {
        Self {
            cutoff_amount: 10_000,
            cutoff_time_ms: 2_000,
            similar: SimilarityParams::default(),
        }
    }
}

/// MoreLikeThis parameters (`mlt.*`) of similar-record queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimilarityParams {
    /// Rows requested from Solr per wanted result.
    pub more_results_factor: usize,
    /// `mlt.mintf`: minimum term frequency in the source document.
    pub min_term_freq: u32,
    /// `mlt.mindf`: minimum number of documents a term must occur in.
    pub min_doc_freq: u32,
    /// `mlt.minwl`: minimum word length; `0` disables the check.
    pub min_word_len: u32,
    /// `mlt.maxwl`: maximum word length; `0` disables the check.
    pub max_word_len: u32,
    /// `mlt.maxqt`: maximum number of query terms.
    pub max_query_terms: u32,
    /// `mlt.maxntp`: maximum number of tokens parsed per field.
    pub max_tokens_parsed: u32,
    /// `mlt.boost`: boost query terms by their relevance.
    pub boost: bool,
}

impl Default for SimilarityParams {
    fn default() -> Self {
        Self {
            more_results_factor: 5,
            min_term_freq: 0,
            min_doc_freq: 0,
            min_word_len: 0,
            max_word_len: 0,
            max_query_terms: 25,
            max_tokens_parsed: 1000,
            boost: false,
        }
    }
}

/// A record and the score Solr gave it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankedHit {
    /// Record identifier.
    pub recid: RecordId,
    /// Raw Solr score.
    pub score: f32,
    /// Score relative to the best hit, `0..=100`.
    pub relevance: u8,
}

#[derive(Deserialize)]
pub(crate) struct SelectResponse {
    pub(crate) response: SelectResult,
}

#[derive(Deserialize)]
pub(crate) struct SelectResult {
    #[serde(rename = "numFound")]
    pub(crate) num_found: usize,
    #[serde(default)]
    pub(crate) docs: Vec<SelectDoc>,
}

#[derive(Deserialize)]
pub(crate) struct SelectDoc {
    pub(crate) id: Value,
    #[serde(default)]
    pub(crate) score: Option<f32>,
}

impl SelectDoc {
    pub(crate) fn recid(&self) -> Result<RecordId, SolrError> {
        match &self.id {
            Value::Number(number) => number
                .as_u64()
                .and_then(|value| RecordId::try_from(value).ok())
                .ok_or_else(|| SolrError::InvalidDocumentId(number.to_string())),
            Value::String(text) => text
                .trim()
                .parse()
                .map_err(|_| SolrError::InvalidDocumentId(text.clone())),
            other => Err(SolrError::InvalidDocumentId(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn document_serializes_abstract_under_its_solr_name() {
        let doc = SolrDocument {
            id: 7,
            abstract_text: "summary".into(),
            title: "Title".into(),
            ..Default::default()
        };
        let value = serde_json::to_value(&doc).expect("serialize");
        assert_eq!(value["id"], json!(7));
        assert_eq!(value["abstract"], json!("summary"));
        assert_eq!(value["author"], json!(""));
        assert!(value.get("abstract_text").is_none());
    }

    #[test]
    fn select_doc_accepts_numeric_and_string_ids() {
        let numeric: SelectDoc = serde_json::from_value(json!({ "id": 12 })).expect("doc");
        assert_eq!(numeric.recid().expect("id"), 12);
        let text: SelectDoc = serde_json::from_value(json!({ "id": "13", "score": 0.5 })).expect("doc");
        assert_eq!(text.recid().expect("id"), 13);
        let bad: SelectDoc = serde_json::from_value(json!({ "id": "abc" })).expect("doc");
        assert!(matches!(bad.recid(), Err(SolrError::InvalidDocumentId(_))));
    }
}
