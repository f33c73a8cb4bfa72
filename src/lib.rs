#![deny(missing_docs)]

//! Batch synchronizer pushing bibliographic record fields into a Solr core, plus the text and
//! URL helpers used around it.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Run options, progress reporting and job status.
pub mod jobs;
/// Structured logging and tracing setup.
pub mod logging;
/// Indexing service shared by the HTTP surface.
pub mod service;
/// Solr HTTP client and ranking helpers.
pub mod solr;
/// Primary record store and full-text sources.
pub mod store;
/// Chunked record-to-index synchronization.
pub mod sync;
/// Text sanitization and formatting.
pub mod text;
/// URL, link and redirect helpers.
pub mod urlutils;
