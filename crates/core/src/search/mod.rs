//! Search primitives: the bounded top-K selector and scored result types.

/// Size-bounded min-heap selector with deterministic tie-breaking.
pub mod topk;
/// Scored result types returned from the index and the service layer.
pub mod types;

pub use topk::TopK;
pub use types::{ScoredRecord, SearchResult};
