//! Startup rebuild of the in-memory index from the durable store.

use crate::config::VECTOR_PREFIX;
use crate::error::{Error, Result};
use crate::index::VectorIndex;
use crate::storage::codec::decode_record;
use crate::storage::store::KvStore;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Outcome of a successful [`restore_from_store`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreStats {
    /// Number of vector records inserted into the index.
    pub records: usize,
    /// Wall-clock time spent scanning, decoding, and inserting.
    pub elapsed: Duration,
}

/// Populates `index` with every record in the vector namespace of `store`.
///
/// A single producer streams `v_*` pairs in key order; `workers` threads decode
/// and insert them concurrently. The first decode or scan failure aborts the
/// rebuild, clears the index, and is returned to the caller, who must not serve
/// traffic with it.
pub fn restore_from_store<S: KvStore + ?Sized>(
    index: &VectorIndex,
    store: &S,
    workers: usize,
) -> Result<RestoreStats> {
    if workers == 0 {
        return Err(Error::invalid_argument("rebuild workers must be at least 1"));
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("embedb-restore-{}", i))
        .build()
        .map_err(|e| Error::Internal(format!("failed to build restore pool: {}", e)))?;

    let start = Instant::now();
    let restored = AtomicUsize::new(0);
    let scan = store.scan_prefix(VECTOR_PREFIX.as_bytes())?;

    let outcome = pool.install(|| {
        scan.par_bridge().try_for_each(|pair| -> Result<()> {
            let (key, value) = pair?;
            let (id, vector) = decode_record(&key, &value)?;
            index.add(id, vector);
            restored.fetch_add(1, Ordering::Relaxed);
            Ok(())
        })
    });

    if let Err(e) = outcome {
        index.clear();
        return Err(e);
    }

    let stats = RestoreStats {
        records: restored.into_inner(),
        elapsed: start.elapsed(),
    };
    tracing::info!(
        records = stats.records,
        workers,
        elapsed_ms = stats.elapsed.as_millis() as u64,
        "Index rebuilt from store"
    );
    Ok(stats)
}
