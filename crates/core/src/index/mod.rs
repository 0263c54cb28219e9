//! In-memory vector index: the embedding type, dot-product scoring, and the
//! concurrent key-ordered index with exact top-K search.

/// Fixed-length embedding value type.
pub mod embedding;
/// Dot-product similarity.
pub mod similarity;
/// Concurrent `BTreeMap`-backed index with brute-force top-K search.
pub mod vector_index;

pub use embedding::Embedding;
pub use similarity::dot_product;
pub use vector_index::VectorIndex;
