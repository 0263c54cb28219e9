//! embedb-server: HTTP server for embedb.
//!
//! Provides the REST API over a [`embedb_core::VectorService`].
//! Core index and storage logic lives in `embedb-core`.

/// REST API layer: Axum router, HTTP handlers, models, metrics.
pub mod api;
