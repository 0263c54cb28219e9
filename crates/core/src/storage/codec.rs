//! Key layout and binary encoding for persisted vector records.
//!
//! A record `id` occupies two keys: `v_<id>` holds the vector and `d_<id>` holds
//! the opaque data payload. Vectors are bincode-encoded as a `u64` little-endian
//! length prefix followed by `DIMENSION` little-endian `f64` values.

use crate::config::{DATA_PREFIX, DIMENSION, VECTOR_PREFIX};
use crate::error::{Error, Result};
use crate::index::Embedding;
use bincode::Options;
use std::io;

/// Exact size of an encoded vector payload in bytes.
pub const ENCODED_VECTOR_LEN: usize = 8 + DIMENSION * 8;

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .with_limit(ENCODED_VECTOR_LEN as u64)
        .reject_trailing_bytes()
}

/// Store key holding the vector for `id`.
pub fn vector_key(id: &str) -> Vec<u8> {
    [VECTOR_PREFIX.as_bytes(), id.as_bytes()].concat()
}

/// Store key holding the data payload for `id`.
pub fn data_key(id: &str) -> Vec<u8> {
    [DATA_PREFIX.as_bytes(), id.as_bytes()].concat()
}

/// Serializes a vector into its persisted form.
pub fn encode_vector(vector: &Embedding) -> Result<Vec<u8>> {
    options()
        .serialize(vector.as_slice())
        .map_err(|e| Error::Store(io::Error::other(e.to_string())))
}

/// Parses a persisted vector payload. `key` is only used for error reporting.
pub fn decode_vector(key: &[u8], bytes: &[u8]) -> Result<Embedding> {
    let values: Vec<f64> = options()
        .deserialize(bytes)
        .map_err(|e| Error::decode(key, e.to_string()))?;
    Embedding::try_from(values).map_err(|e| Error::decode(key, e.to_string()))
}

/// Decodes a `(key, value)` pair from the vector namespace into `(id, vector)`.
pub fn decode_record(key: &[u8], value: &[u8]) -> Result<(String, Embedding)> {
    let raw_id = key
        .strip_prefix(VECTOR_PREFIX.as_bytes())
        .ok_or_else(|| Error::decode(key, "key outside vector namespace"))?;
    if raw_id.is_empty() {
        return Err(Error::decode(key, "empty record id"));
    }
    let id = std::str::from_utf8(raw_id)
        .map_err(|_| Error::decode(key, "record id is not valid UTF-8"))?
        .to_owned();
    let vector = decode_vector(key, value)?;
    Ok((id, vector))
}
