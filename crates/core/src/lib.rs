//! # embedb-core
//!
//! Exact nearest-neighbour engine for fixed-dimension `f64` embeddings.
//!
//! Records are held in a concurrent, key-ordered in-memory index and scored
//! by brute-force dot product with a bounded top-K selector. Every record is
//! also persisted to a durable key-value store, from which the index is
//! rebuilt in parallel at startup.
//!
//! This crate has no async dependencies; the HTTP server lives in `embedb-server`.

/// Global configuration constants: dimension, key namespaces, limits, and defaults.
pub mod config;
/// Error type shared across the crate.
pub mod error;
/// The in-memory vector index, embedding type, and similarity function.
pub mod index;
/// Top-K selection and scored result types.
pub mod search;
/// Record-level operations over the store and the index.
pub mod service;
/// Durable key-value store, record encoding, and index rebuild.
pub mod storage;

pub use error::{Error, Result};
pub use index::{Embedding, VectorIndex};
pub use search::{ScoredRecord, SearchResult};
pub use service::VectorService;
pub use storage::{KvStore, LogStore, RestoreStats, StoreOptions};
