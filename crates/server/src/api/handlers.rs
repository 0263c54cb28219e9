//! HTTP request handlers and shared application state.

use crate::api::errors::ApiError;
use crate::api::metrics;
use crate::api::models::*;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use embedb_core::{config, Embedding, VectorService};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state passed to every handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<VectorService>,
    pub prometheus_handle: PrometheusHandle,
    pub start_time: Instant,
}

fn validate_id(id: &str) -> Result<(), ApiError> {
    if id.is_empty() || id.len() > config::MAX_ID_LEN {
        return Err(ApiError::BadRequest(format!(
            "Id must be 1-{} bytes",
            config::MAX_ID_LEN
        )));
    }
    Ok(())
}

fn parse_vector(values: Vec<f64>) -> Result<Embedding, ApiError> {
    let vector = Embedding::try_from(values)?;
    if !vector.is_finite() {
        return Err(ApiError::BadRequest("Vector contains NaN or Inf".into()));
    }
    if vector.max_abs() > config::MAX_COMPONENT_MAGNITUDE {
        return Err(ApiError::BadRequest(format!(
            "Vector components must be within ±{:e}",
            config::MAX_COMPONENT_MAGNITUDE
        )));
    }
    Ok(vector)
}

/// Runs a blocking core call off the async runtime.
async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> embedb_core::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            tracing::error!("Blocking task failed: {}", e);
            ApiError::Internal("Internal error".into())
        })?
        .map_err(ApiError::from)
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = state.service.store();
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        vectors: state.service.len(),
        store_keys: store.len(),
        store_log_bytes: store.log_size_bytes(),
    })
}

/// `PUT /add`
pub async fn add(
    State(state): State<AppState>,
    Json(req): Json<AddRequest>,
) -> Result<StatusCode, ApiError> {
    validate_id(&req.id)?;
    let vector = parse_vector(req.vector)?;

    let service = state.service.clone();
    let id = req.id.clone();
    run_blocking(move || service.add(&id, vector, req.data.into_bytes())).await?;

    metrics::record_operation("add");
    tracing::info!(id = %req.id, "Record added");
    Ok(StatusCode::CREATED)
}

/// `POST /search`
pub async fn search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<Vec<SearchHit>>, ApiError> {
    let count = usize::try_from(req.count)
        .ok()
        .filter(|&c| (1..=config::MAX_SEARCH_COUNT).contains(&c))
        .ok_or_else(|| {
            ApiError::BadRequest(format!("count must be 1-{}", config::MAX_SEARCH_COUNT))
        })?;
    let query = parse_vector(req.vector)?;

    let service = state.service.clone();
    let start = Instant::now();
    let records = run_blocking(move || service.search(&query, count)).await?;

    metrics::record_operation("search");
    tracing::debug!(
        count,
        returned = records.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Search complete"
    );
    Ok(Json(
        records
            .into_iter()
            .map(|r| SearchHit {
                id: r.id,
                data: String::from_utf8_lossy(&r.data).into_owned(),
                distance: r.score,
            })
            .collect(),
    ))
}

/// `GET /get/:id`
pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let service = state.service.clone();
    let data = run_blocking(move || service.get(&id)).await?;
    metrics::record_operation("get");
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], data))
}

/// `DELETE /delete/:id`
pub async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let service = state.service.clone();
    let target = id.clone();
    run_blocking(move || service.delete(&target)).await?;
    metrics::record_operation("delete");
    tracing::info!(id = %id, "Record deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /metrics`
pub async fn metrics_endpoint(State(state): State<AppState>) -> String {
    metrics::update_index_metrics(&state.service);
    state.prometheus_handle.render()
}
