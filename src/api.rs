//! HTTP surface for the synchronizer.
//!
//! - `GET /` – Redirect to `/status`.
//! - `GET /status` – Snapshot of the current or last indexing run.
//! - `POST /sync` – Start a run over explicit ranges (or every record). Answers `202 Accepted`,
//!   or `409 Conflict` while another run is active.
//! - `GET /search` – Record ids matching `field:q` (default field `fulltext`).
//! - `GET /commands` – Machine-readable catalog of the endpoints above.

use crate::config::DEFAULT_FLUSH_SIZE;
use crate::jobs::{JobOptions, JobSnapshot, RangeParseError, RecordRange};
use crate::service::IndexingApi;
use crate::solr::SolrError;
use crate::store::RecordId;
use crate::urlutils::{RedirectError, redirect_to_url};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

/// Build the HTTP router around an indexing service.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: IndexingApi + 'static,
{
    Router::new()
        .route("/", get(root))
        .route("/status", get(get_status::<S>))
        .route("/sync", post(start_sync::<S>))
        .route("/search", get(search::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

async fn root() -> Result<Response, AppError> {
    Ok(redirect_to_url("/status", None, &HeaderMap::new(), false)?)
}

async fn get_status<S>(State(service): State<Arc<S>>) -> Json<JobSnapshot>
where
    S: IndexingApi,
{
    Json(service.status())
}

/// Request body for `POST /sync`.
#[derive(Deserialize)]
struct SyncRequest {
    /// Ranges such as `"1-100"` or `"42"`; empty means every record.
    #[serde(default)]
    ranges: Vec<String>,
    /// Records submitted between two commits.
    #[serde(default)]
    flush: Option<usize>,
}

#[derive(Serialize)]
struct SyncAccepted {
    ranges: Vec<String>,
    flush: usize,
}

async fn start_sync<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<SyncRequest>,
) -> Result<Response, AppError>
where
    S: IndexingApi,
{
    let flush = request.flush.unwrap_or(DEFAULT_FLUSH_SIZE);
    if flush == 0 {
        return Err(AppError::InvalidFlush);
    }
    let mut ranges = Vec::with_capacity(request.ranges.len());
    for raw in &request.ranges {
        ranges.extend(RecordRange::parse_list(raw)?);
    }

    let accepted = SyncAccepted {
        ranges: ranges.iter().map(ToString::to_string).collect(),
        flush,
    };
    if !service.start_sync(JobOptions { flush, ranges }) {
        return Err(AppError::Busy);
    }
    tracing::info!(ranges = ?accepted.ranges, flush, "Indexing run accepted");
    Ok((StatusCode::ACCEPTED, Json(accepted)).into_response())
}

#[derive(Deserialize)]
struct SearchQuery {
    q: String,
    #[serde(default = "default_search_field")]
    field: String,
}

fn default_search_field() -> String {
    "fulltext".to_string()
}

#[derive(Serialize)]
struct SearchResponse {
    total: usize,
    ids: Vec<RecordId>,
}

async fn search<S>(
    State(service): State<Arc<S>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError>
where
    S: IndexingApi,
{
    let ids: Vec<RecordId> = service
        .search(&query.field, &query.q)
        .await?
        .into_iter()
        .collect();
    Ok(Json(SearchResponse {
        total: ids.len(),
        ids,
    }))
}

#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "status",
                method: "GET",
                path: "/status",
                description: "Return the state, latest progress line and timestamps of the indexing run.",
                request_example: None,
            },
            CommandDescriptor {
                name: "sync",
                method: "POST",
                path: "/sync",
                description: "Start an indexing run in the background. Omit ranges to index every record.",
                request_example: Some(json!({
                    "ranges": ["1-100", "250"],
                    "flush": 50
                })),
            },
            CommandDescriptor {
                name: "search",
                method: "GET",
                path: "/search?q=higgs&field=fulltext",
                description: "Return the ids of indexed records matching the query in one field.",
                request_example: None,
            },
        ],
    })
}

#[derive(Debug, Error)]
enum AppError {
    #[error("an indexing run is already active")]
    Busy,
    #[error("flush must be greater than zero")]
    InvalidFlush,
    #[error(transparent)]
    Range(#[from] RangeParseError),
    #[error(transparent)]
    Solr(#[from] SolrError),
    #[error(transparent)]
    Redirect(#[from] RedirectError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Busy => StatusCode::CONFLICT,
            Self::InvalidFlush | Self::Range(_) => StatusCode::BAD_REQUEST,
            Self::Solr(_) => StatusCode::BAD_GATEWAY,
            Self::Redirect(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
