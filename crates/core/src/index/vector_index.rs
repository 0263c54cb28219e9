//! Concurrent, key-ordered vector index with exact top-K search.
//!
//! Records live in a `BTreeMap` keyed by id behind a single reader/writer lock.
//! Search is a full scan in ascending key order; ordering is only used to make
//! exact-score ties reproducible, never for pruning.

use crate::error::{Error, Result};
use crate::index::embedding::Embedding;
use crate::index::similarity::dot_product;
use crate::search::{SearchResult, TopK};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::mem::size_of;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// A thread-safe map of id → embedding supporting exact similarity search.
///
/// `add`/`delete` take the write lock for the mutation only. `search` holds the
/// read lock for the whole scan, so a long search delays writers until it
/// finishes; searches are not cancelable once started.
/// Cloning a `VectorIndex` produces a new handle to the same shared data.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    records: Arc<RwLock<BTreeMap<String, Embedding>>>,
}

impl VectorIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record, replacing the vector of an existing id in place.
    pub fn add(&self, id: String, vector: Embedding) {
        self.records.write().insert(id, vector);
    }

    /// Removes a record. Returns `true` if it was present; absent ids are a no-op.
    pub fn delete(&self, id: &str) -> bool {
        self.records.write().remove(id).is_some()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns `true` if the index holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Returns `true` if a record with this id is present.
    pub fn contains(&self, id: &str) -> bool {
        self.records.read().contains_key(id)
    }

    /// Returns a copy of the stored vector for `id`.
    pub fn get(&self, id: &str) -> Option<Embedding> {
        self.records.read().get(id).cloned()
    }

    /// Removes every record.
    pub fn clear(&self) {
        self.records.write().clear();
    }

    /// Exact top-`k` search by dot product.
    ///
    /// Returns `min(k, len)` results sorted by descending score. Among equal
    /// scores the record scanned first (lowest id) ranks first and wins the last
    /// slot when not all of them fit. Fails with `InvalidArgument` if `k == 0`.
    pub fn search(&self, query: &Embedding, k: usize) -> Result<Vec<SearchResult>> {
        let k = NonZeroUsize::new(k)
            .ok_or_else(|| Error::invalid_argument("k must be at least 1"))?;

        let records = self.records.read();
        let mut top = TopK::new(k);
        for (id, vector) in records.iter() {
            top.offer(id.as_str(), dot_product(query, vector));
        }

        Ok(top
            .into_sorted_desc()
            .into_iter()
            .map(|(id, score)| SearchResult {
                id: id.to_owned(),
                score,
            })
            .collect())
    }

    /// Estimates the heap memory held by the index in bytes.
    pub fn estimate_memory_bytes(&self) -> usize {
        let records = self.records.read();
        let per_vector = size_of::<[f64; crate::config::DIMENSION]>();
        records
            .keys()
            .map(|id| id.capacity() + size_of::<String>() + size_of::<Embedding>() + per_vector)
            .sum()
    }
}
