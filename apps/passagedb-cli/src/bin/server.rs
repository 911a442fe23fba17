//! HTTP retrieval API.
//!
//! `GET /api/search` runs the full pipeline; `GET /api/health` does no
//! retrieval work. Artifacts are loaded once at startup and shared
//! read-only; a missing or empty artifact aborts startup.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing::info;

use passagedb_chunk::ChunkStore;
use passagedb_core::config::{AppConfig, RetrievalConfig};
use passagedb_core::error::Error;
use passagedb_core::types::{SearchRequest, SearchResponse, SortOrder, YearFilter};
use passagedb_embed::{embedder_from_config, reranker_from_config};
use passagedb_index::snapshot;
use passagedb_retrieval::{EngineConfig, RetrievalEngine};

struct AppState {
    engine: RetrievalEngine,
    defaults: RetrievalConfig,
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: String,
    k: Option<usize>,
    neighbors: Option<usize>,
    per_doc: Option<usize>,
    cursor: Option<String>,
    /// `2018` or an inclusive `2015-2020` range
    year: Option<String>,
    year_min: Option<i32>,
    year_max: Option<i32>,
    doc_id: Option<String>,
    sort: Option<String>,
}

struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Validation(_) | Error::Decode(_) => StatusCode::BAD_REQUEST,
            Error::Upstream { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({
            "error": { "code": self.0.code(), "message": self.0.to_string() }
        }));
        (status, body).into_response()
    }
}

async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> std::result::Result<Json<SearchResponse>, ApiError> {
    let req = to_request(params, &state.defaults)?;
    let resp = state.engine.search(&req).await?;
    Ok(Json(resp))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

fn to_request(
    params: SearchParams,
    defaults: &RetrievalConfig,
) -> std::result::Result<SearchRequest, Error> {
    let sort = match params.sort.as_deref() {
        None | Some("relevance") => SortOrder::Relevance,
        Some("recency") => SortOrder::Recency,
        Some(other) => {
            return Err(Error::validation(format!(
                "unknown sort '{other}' (expected 'relevance' or 'recency')"
            )))
        }
    };
    Ok(SearchRequest {
        q: params.q,
        k: params.k.unwrap_or(8),
        neighbors: params.neighbors.unwrap_or(defaults.neighbors),
        per_doc: params.per_doc.unwrap_or(defaults.per_doc),
        year: parse_year(params.year.as_deref(), params.year_min, params.year_max)?,
        doc_id: params.doc_id,
        sort,
        cursor: params.cursor,
    })
}

/// `year=2018` is exact, `year=2015-2020` is an inclusive range;
/// `year_min`/`year_max` build an open-ended range.
fn parse_year(
    year: Option<&str>,
    year_min: Option<i32>,
    year_max: Option<i32>,
) -> std::result::Result<Option<YearFilter>, Error> {
    if let Some(raw) = year {
        if year_min.is_some() || year_max.is_some() {
            return Err(Error::validation(
                "year cannot be combined with year_min/year_max",
            ));
        }
        let raw = raw.trim();
        if let Some((lo, hi)) = raw.split_once('-') {
            let min = lo.trim().parse().map_err(|_| bad_year(raw))?;
            let max = hi.trim().parse().map_err(|_| bad_year(raw))?;
            return Ok(Some(YearFilter::Range { min, max }));
        }
        return Ok(Some(YearFilter::Exact(
            raw.parse().map_err(|_| bad_year(raw))?,
        )));
    }
    match (year_min, year_max) {
        (None, None) => Ok(None),
        (min, max) => Ok(Some(YearFilter::Range {
            min: min.unwrap_or(i32::MIN),
            max: max.unwrap_or(i32::MAX),
        })),
    }
}

fn bad_year(raw: &str) -> Error {
    Error::validation(format!("year '{raw}' is not an integer or 'min-max' range"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cfg = AppConfig::load()?;
    let store_dir = PathBuf::from(&cfg.data.store_dir);
    let index_dir = PathBuf::from(&cfg.data.index_dir);

    let store = ChunkStore::load(&store_dir)
        .with_context(|| format!("loading chunk store from {}", store_dir.display()))?;
    let index = snapshot::load_dir(&index_dir)
        .with_context(|| format!("loading index snapshot from {}", index_dir.display()))?;
    info!(
        docs = store.doc_count(),
        chunks = store.chunk_count(),
        vectors = index.len(),
        dim = index.dim(),
        "artifacts loaded"
    );

    let embedder = embedder_from_config(&cfg.embedding)?;
    let reranker = reranker_from_config(&cfg.rerank)?;
    let engine = RetrievalEngine::new(
        Arc::new(store),
        Arc::new(index),
        embedder,
        reranker,
        EngineConfig {
            overfetch_factor: cfg.retrieval.overfetch_factor,
            max_preview_chars: cfg.retrieval.max_preview_chars,
            upstream_timeout: std::time::Duration::from_millis(cfg.embedding.timeout_ms),
            upstream_retries: cfg.embedding.retries,
        },
    );
    let state = Arc::new(AppState { engine, defaults: cfg.retrieval.clone() });

    // CORS stays permissive for local frontend dev; tighten by origin in prod.
    let app = Router::new()
        .route("/api/search", get(search))
        .route("/api/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cfg.server.addr)
        .await
        .with_context(|| format!("binding {}", cfg.server.addr))?;
    info!("listening on http://{}", cfg.server.addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;
    Ok(())
}
