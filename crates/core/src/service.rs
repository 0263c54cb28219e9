//! Record-level operations tying the durable store to the in-memory index.
//!
//! The store is written first and the index second. Concurrent writers are
//! serialized across both steps by a write gate, and searches hold the gate
//! shared while they hydrate hits, so the two views never diverge at runtime.
//! Only a crash between the steps can leave a record that is durable but not
//! yet searchable until the next rebuild.

use crate::error::{Error, Result};
use crate::index::{Embedding, VectorIndex};
use crate::search::ScoredRecord;
use crate::storage::codec::{data_key, encode_vector, vector_key};
use crate::storage::log_store::LogStore;
use crate::storage::restore::{restore_from_store, RestoreStats};
use crate::storage::store::{KvStore, WriteBatch};
use parking_lot::RwLock;
use std::sync::Arc;

/// Owns the store handle and the index; shared by every request handler.
pub struct VectorService<S: KvStore + ?Sized = LogStore> {
    store: Arc<S>,
    index: VectorIndex,
    /// Write gate: add/delete take exclusive, search takes shared.
    write_gate: RwLock<()>,
}

impl<S: KvStore + ?Sized> VectorService<S> {
    /// Wraps `store` with an empty index. Call [`restore`](Self::restore) before serving.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            index: VectorIndex::new(),
            write_gate: RwLock::new(()),
        }
    }

    /// Rebuilds the index from the store using `workers` decode threads.
    pub fn restore(&self, workers: usize) -> Result<RestoreStats> {
        restore_from_store(&self.index, self.store.as_ref(), workers)
    }

    /// Persists a record and makes it searchable, replacing any previous record
    /// with the same id.
    pub fn add(&self, id: &str, vector: Embedding, data: Vec<u8>) -> Result<()> {
        if id.is_empty() {
            return Err(Error::invalid_argument("id must not be empty"));
        }
        let mut batch = WriteBatch::new();
        batch
            .put(data_key(id), data)
            .put(vector_key(id), encode_vector(&vector)?);
        let _gate = self.write_gate.write();
        self.store.write(batch)?;
        self.index.add(id.to_owned(), vector);
        tracing::debug!(id = %id, "Record added");
        Ok(())
    }

    /// Top-`k` search, with each hit hydrated with its stored payload.
    pub fn search(&self, query: &Embedding, k: usize) -> Result<Vec<ScoredRecord>> {
        let _gate = self.write_gate.read();
        let hits = self.index.search(query, k)?;
        hits.into_iter()
            .map(|hit| {
                let data = self
                    .store
                    .get(&data_key(&hit.id))?
                    .ok_or_else(|| Error::not_found(hit.id.clone()))?;
                Ok(ScoredRecord {
                    id: hit.id,
                    data,
                    score: hit.score,
                })
            })
            .collect()
    }

    /// The raw data payload stored for `id`.
    pub fn get(&self, id: &str) -> Result<Vec<u8>> {
        self.store
            .get(&data_key(id))?
            .ok_or_else(|| Error::not_found(id))
    }

    /// Removes a record from the store and the index.
    ///
    /// Fails with `NotFound` if the store held neither key for `id`.
    pub fn delete(&self, id: &str) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.delete(data_key(id)).delete(vector_key(id));
        let _gate = self.write_gate.write();
        let summary = self.store.write(batch)?;
        self.index.delete(id);
        if summary.removed == 0 {
            return Err(Error::not_found(id));
        }
        tracing::debug!(id = %id, "Record deleted");
        Ok(())
    }

    /// Number of searchable records.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if no records are searchable.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The in-memory index.
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// The durable store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}
