//! Solr integration: document submission, commits and ranking queries.

pub mod client;
pub mod filters;
pub mod types;

pub use client::SolrClient;
pub use filters::collection_filter;
pub use types::{
    DocumentIndex, RankedHit, RankingParams, SimilarityParams, SolrDocument, SolrError,
};
