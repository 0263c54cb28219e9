//! Error type shared by the index, the durable store, and the rebuild pipeline.

use std::io;
use thiserror::Error;

/// Errors surfaced by embedb core operations.
///
/// `InvalidArgument` and `NotFound` are ordinary, recoverable conditions.
/// `Store` is propagated unchanged from the durable store. `Decode` raised
/// during the startup rebuild is fatal: the process must not serve with a
/// partially populated index.
#[derive(Debug, Error)]
pub enum Error {
    /// Caller supplied an unusable argument (e.g. `k < 1`).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No record exists under the requested id.
    #[error("not found: {0}")]
    NotFound(String),

    /// The durable store reported an I/O or transaction failure.
    #[error("store failure: {0}")]
    Store(#[from] io::Error),

    /// A persisted vector record could not be decoded.
    #[error("decode failure for key {key:?}: {reason}")]
    Decode {
        /// Store key of the offending record, lossily rendered.
        key: String,
        /// What was wrong with the payload.
        reason: String,
    },

    /// An internal resource (e.g. a worker pool) could not be set up.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an InvalidArgument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a NotFound error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    /// Create a Decode error for the given raw store key.
    pub fn decode(key: &[u8], reason: impl Into<String>) -> Self {
        Self::Decode {
            key: String::from_utf8_lossy(key).into_owned(),
            reason: reason.into(),
        }
    }
}

/// Result alias for embedb core operations.
pub type Result<T> = std::result::Result<T, Error>;
