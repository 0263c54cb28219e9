//! Request and response data transfer objects for the REST API.
//!
//! All types derive `Serialize` and/or `Deserialize` for JSON marshalling via Axum.

use serde::{Deserialize, Serialize};

/// Request body for `PUT /add`.
#[derive(Debug, Deserialize)]
pub struct AddRequest {
    pub id: String,
    pub vector: Vec<f64>,
    /// Opaque payload returned verbatim by `GET /get/:id` and in search hits.
    #[serde(default)]
    pub data: String,
}

/// Request body for `POST /search`.
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub vector: Vec<f64>,
    /// Signed so out-of-range values reach validation instead of failing to parse.
    pub count: i64,
}

/// A single hit in the `POST /search` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub data: String,
    /// Dot-product similarity; higher is closer.
    pub distance: f64,
}

/// Response body for `GET /health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub vectors: usize,
    pub store_keys: usize,
    pub store_log_bytes: u64,
}
