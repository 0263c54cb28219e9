//! Scored result types.

use serde::Serialize;

/// An id with its similarity score against a query.
///
/// Produced per query and never stored. Higher scores are more similar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    /// Record identifier.
    pub id: String,
    /// Dot-product similarity.
    pub score: f64,
}

/// A search hit hydrated with its stored data payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    /// Record identifier.
    pub id: String,
    /// Opaque payload stored alongside the vector.
    pub data: Vec<u8>,
    /// Dot-product similarity.
    pub score: f64,
}
