//! Durable key-value store interface consumed by the index rebuild and the
//! service layer.

use serde::{Deserialize, Serialize};
use std::io;

/// A key/value pair yielded by a prefix scan.
pub type KvPair = (Vec<u8>, Vec<u8>);

/// Ordered stream of pairs from [`KvStore::scan_prefix`].
///
/// Items are fallible so streaming implementations can surface I/O errors
/// mid-scan.
pub type KvScan = Box<dyn Iterator<Item = io::Result<KvPair>> + Send + 'static>;

/// A single mutation inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WriteOp {
    /// Set `key` to `value`, replacing any previous value.
    Put { key: Vec<u8>, value: Vec<u8> },
    /// Remove `key` if present.
    Delete { key: Vec<u8> },
}

/// An ordered group of mutations applied atomically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a put.
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.ops.push(WriteOp::Put {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Queues a delete.
    pub fn delete(&mut self, key: impl Into<Vec<u8>>) -> &mut Self {
        self.ops.push(WriteOp::Delete { key: key.into() });
        self
    }

    /// The queued operations, in order.
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    /// Consumes the batch, yielding its operations in order.
    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    /// Number of queued operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns `true` if no operations are queued.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Outcome of applying a [`WriteBatch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    /// Number of put operations applied.
    pub written: usize,
    /// Number of delete operations that removed an existing key.
    pub removed: usize,
}

/// Transactional key-value store with ordered prefix scans.
///
/// Implementations must apply each [`WriteBatch`] all-or-nothing and must be
/// safe to share across threads.
pub trait KvStore: Send + Sync {
    /// Reads the value stored under `key`.
    fn get(&self, key: &[u8]) -> io::Result<Option<Vec<u8>>>;

    /// Applies every operation in `batch` atomically.
    fn write(&self, batch: WriteBatch) -> io::Result<WriteSummary>;

    /// Streams every pair whose key starts with `prefix`, in ascending key order.
    fn scan_prefix(&self, prefix: &[u8]) -> io::Result<KvScan>;
}
