//! Prometheus metrics recording and background collection.

use embedb_core::VectorService;
use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Records HTTP request metrics.
pub fn record_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];
    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());
}

/// Records a record-level operation (`add`, `search`, `get`, `delete`).
pub fn record_operation(operation: &'static str) {
    counter!("embedb_operations_total", "operation" => operation).increment(1);
}

/// Updates index and store gauges, returning `(vectors, index_bytes, log_bytes)`.
pub fn update_index_metrics(service: &VectorService) -> (usize, usize, u64) {
    let vectors = service.len();
    let index_bytes = service.index().estimate_memory_bytes();
    let log_bytes = service.store().log_size_bytes();
    gauge!("embedb_vectors_total").set(vectors as f64);
    gauge!("embedb_index_memory_bytes").set(index_bytes as f64);
    gauge!("embedb_store_log_bytes").set(log_bytes as f64);
    (vectors, index_bytes, log_bytes)
}
