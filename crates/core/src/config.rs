//! Global configuration constants for embedb.
//!
//! Dimensionality, key namespaces, and server defaults are defined here.
//! These are compile-time constants; runtime configuration is handled via CLI arguments
//! and environment variables in the server's `main.rs`.

/// Number of components in every stored embedding.
///
/// Fixed system-wide. Vectors of any other length are rejected at the API boundary.
pub const DIMENSION: usize = 1536;

/// Key prefix for serialized vector payloads in the durable store.
pub const VECTOR_PREFIX: &str = "v_";

/// Key prefix for the opaque data payload stored alongside each vector.
pub const DATA_PREFIX: &str = "d_";

/// Default number of worker threads decoding records during the startup rebuild.
pub const DEFAULT_REBUILD_WORKERS: usize = 16;

/// Default directory for the store snapshot and log files.
pub const DEFAULT_DATA_DIR: &str = "/tmp/embedb";

/// Default `host:port` the HTTP server listens on.
pub const DEFAULT_HOST: &str = "localhost:6723";

/// Default interval (in seconds) between memory usage reports. 0 = disabled.
pub const MEMORY_REPORT_INTERVAL_SECS: u64 = 60;

/// Maximum number of results (`count`) per search request.
pub const MAX_SEARCH_COUNT: usize = 10_000;

/// Largest accepted absolute value of a vector component.
///
/// Keeps every dot product of two accepted vectors finite:
/// `DIMENSION * MAX_COMPONENT_MAGNITUDE^2` stays below `f64::MAX`.
pub const MAX_COMPONENT_MAGNITUDE: f64 = 1e150;

/// Maximum length of a record id in bytes.
pub const MAX_ID_LEN: usize = 512;

/// Maximum HTTP request body size in bytes (16 MB).
pub const MAX_REQUEST_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Per-request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of concurrent in-flight requests.
pub const MAX_CONCURRENT_REQUESTS: usize = 512;

/// File name of the append-only store log inside the data directory.
pub const STORE_LOG_FILE: &str = "store.log";

/// File name of the store snapshot inside the data directory.
pub const STORE_SNAPSHOT_FILE: &str = "store.snap";
