//! Storage layer: the durable key-value store, record encoding, and the
//! startup index rebuild.
//!
//! Each record is persisted under two keys in a [`KvStore`]: `d_<id>` for the
//! data payload and `v_<id>` for the encoded vector. [`LogStore`] is the
//! embedded implementation (batch log with CRC32 + fsync, bincode snapshots
//! with atomic temp-file + rename).

/// Key layout and vector encoding.
pub mod codec;
/// Log-structured embedded store.
pub mod log_store;
/// Parallel index rebuild from the store.
pub mod restore;
/// The `KvStore` trait and write batches.
pub mod store;

pub use codec::{data_key, decode_record, decode_vector, encode_vector, vector_key};
pub use log_store::{LogStore, ReplayStats, StoreOptions};
pub use restore::{restore_from_store, RestoreStats};
pub use store::{KvPair, KvScan, KvStore, WriteBatch, WriteOp, WriteSummary};
