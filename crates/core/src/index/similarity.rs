//! Similarity scoring between embeddings.
//!
//! The index ranks by raw dot product: higher is more similar. No normalization
//! is applied, so callers wanting cosine similarity must store unit vectors.

use crate::index::embedding::Embedding;

/// Dot product of two embeddings, accumulated left to right in `f64`.
///
/// Accumulation order is fixed so identical inputs always produce identical
/// scores, which keeps exact-tie handling reproducible.
pub fn dot_product(a: &Embedding, b: &Embedding) -> f64 {
    let a = a.as_array();
    let b = b.as_array();
    let mut sum = 0.0f64;
    for i in 0..a.len() {
        sum += a[i] * b[i];
    }
    sum
}
