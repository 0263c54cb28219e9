//! Log-structured embedded key-value store.
//!
//! The live key space is held in memory in a `BTreeMap`. Durability comes from
//! two files in the data directory:
//!
//! - `store.log`: append-only batches, each framed as
//!   `[u32 length BE][u32 CRC32 BE][bincode WriteBatch]` and fsynced before the
//!   batch becomes visible.
//! - `store.snap`: a full bincode snapshot with a `[magic "ESN1"][u32 CRC32 BE]`
//!   footer, written to a temp file and renamed into place by [`LogStore::compact`].
//!
//! Opening loads the snapshot, then replays the log on top of it. Replaying a
//! log whose batches are already reflected in the snapshot is harmless: each
//! key ends with the value of its last operation either way.

use crate::config::{STORE_LOG_FILE, STORE_SNAPSHOT_FILE};
use crate::storage::store::{KvScan, KvStore, WriteBatch, WriteOp, WriteSummary};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, VecDeque};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type Entries = Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>;

/// Magic bytes placed before the CRC32 footer of a snapshot file.
const SNAPSHOT_MAGIC: &[u8; 4] = b"ESN1";

/// Size of a log frame header: length + CRC32.
const FRAME_HEADER_LEN: usize = 8;

/// Largest accepted frame payload. A header claiming more is treated as corrupt.
const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Number of pairs copied per read-lock acquisition during a prefix scan.
const SCAN_PAGE_LEN: usize = 256;

/// Options controlling how a [`LogStore`] is opened.
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    /// Fail to open if log replay hits a torn tail, CRC mismatch, or bad frame.
    pub strict: bool,
    /// fsync the log after every batch.
    pub sync_writes: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            strict: false,
            sync_writes: true,
        }
    }
}

/// Diagnostic statistics from replaying the log at open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Number of batches successfully applied.
    pub applied: usize,
    /// Number of batches skipped because they failed to deserialize (CRC was valid).
    pub skipped: usize,
    /// Number of CRC mismatches encountered (replay stopped).
    pub crc_errors: usize,
    /// Whether replay was terminated by a truncated frame.
    pub truncated: bool,
}

impl ReplayStats {
    /// Returns `true` if replay met anything other than clean frames.
    pub fn has_errors(&self) -> bool {
        self.skipped > 0 || self.crc_errors > 0 || self.truncated
    }
}

/// Embedded transactional key-value store backed by a snapshot and a batch log.
///
/// Readers take a shared lock on the in-memory map. Writers are serialized by
/// the log writer mutex, so log order always equals apply order. A failed
/// append is rolled back to the previous frame boundary; if that rollback also
/// fails, writes are refused until [`LogStore::compact`] succeeds.
pub struct LogStore {
    entries: Entries,
    writer: Mutex<BufWriter<File>>,
    failed: AtomicBool,
    log_path: PathBuf,
    snapshot_path: PathBuf,
    options: StoreOptions,
    replay_stats: ReplayStats,
}

impl LogStore {
    /// Opens (or creates) a store in `dir` with default options.
    pub fn open(dir: impl AsRef<Path>) -> io::Result<Self> {
        Self::open_with(dir, StoreOptions::default())
    }

    /// Opens (or creates) a store in `dir`.
    pub fn open_with(dir: impl AsRef<Path>, options: StoreOptions) -> io::Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(dir, fs::Permissions::from_mode(0o700));
        }
        let log_path = dir.join(STORE_LOG_FILE);
        let snapshot_path = dir.join(STORE_SNAPSHOT_FILE);

        let mut entries = load_snapshot(&snapshot_path)?;
        let (replay_stats, valid_len) = replay_log(&log_path, &mut entries)?;

        if replay_stats.has_errors() {
            tracing::warn!(
                applied = replay_stats.applied,
                skipped = replay_stats.skipped,
                crc_errors = replay_stats.crc_errors,
                truncated = replay_stats.truncated,
                "Store log replay encountered errors"
            );
            if options.strict {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "store log replay failed (strict mode): {} CRC errors, {} skipped, truncated={}",
                        replay_stats.crc_errors, replay_stats.skipped, replay_stats.truncated
                    ),
                ));
            }
        }

        let file = open_log_for_append(&log_path)?;
        // Drop any torn or corrupt tail so new frames are not appended after garbage.
        if file.metadata()?.len() > valid_len {
            tracing::warn!(valid_len, "Truncating store log to last valid frame");
            file.set_len(valid_len)?;
            file.sync_all()?;
        }

        tracing::info!(
            path = %dir.display(),
            keys = entries.len(),
            batches_replayed = replay_stats.applied,
            "Store opened"
        );

        Ok(Self {
            entries: Arc::new(RwLock::new(entries)),
            writer: Mutex::new(BufWriter::new(file)),
            failed: AtomicBool::new(false),
            log_path,
            snapshot_path,
            options,
            replay_stats,
        })
    }

    /// Statistics from the log replay performed at open.
    pub fn replay_stats(&self) -> ReplayStats {
        self.replay_stats
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Current size of the batch log on disk in bytes.
    pub fn log_size_bytes(&self) -> u64 {
        fs::metadata(&self.log_path).map(|m| m.len()).unwrap_or(0)
    }

    /// Writes a fresh snapshot of the live key space and truncates the log.
    ///
    /// Blocks writers for the duration; readers are unaffected.
    pub fn compact(&self) -> io::Result<()> {
        let mut writer = self.writer.lock();
        writer.flush()?;

        let keys = {
            let entries = self.entries.read();
            save_snapshot(&self.snapshot_path, &entries)?;
            entries.len()
        };

        let truncated = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.log_path)?;
        truncated.sync_all()?;
        replace_writer(&mut writer, open_log_for_append(&self.log_path)?);
        self.failed.store(false, Ordering::Release);

        tracing::info!(keys, "Store compacted, log truncated");
        Ok(())
    }

    /// Cuts the log back to `len` bytes after a failed append and discards
    /// whatever part of the frame is still buffered.
    fn roll_back(&self, writer: &mut BufWriter<File>, len: u64) {
        let reopened = open_log_for_append(&self.log_path).and_then(|file| {
            file.set_len(len)?;
            file.sync_all()?;
            Ok(file)
        });
        match reopened {
            Ok(file) => replace_writer(writer, file),
            Err(e) => {
                tracing::error!(error = %e, "Store log rollback failed, refusing further writes");
                self.failed.store(true, Ordering::Release);
            }
        }
    }

    /// Returns `true` if applying `batch` would change nothing.
    fn is_noop(entries: &BTreeMap<Vec<u8>, Vec<u8>>, batch: &WriteBatch) -> bool {
        batch.ops().iter().all(|op| match op {
            WriteOp::Put { .. } => false,
            WriteOp::Delete { key } => !entries.contains_key(key),
        })
    }
}

impl KvStore for LogStore {
    fn get(&self, key: &[u8]) -> io::Result<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn write(&self, batch: WriteBatch) -> io::Result<WriteSummary> {
        let mut writer = self.writer.lock();

        if Self::is_noop(&self.entries.read(), &batch) {
            return Ok(WriteSummary::default());
        }

        if self.failed.load(Ordering::Acquire) {
            return Err(io::Error::other(
                "store log is unwritable after a failed rollback",
            ));
        }

        let framed = frame_batch(&batch)?;
        let frame_start = writer.get_ref().metadata()?.len();
        if let Err(e) = append_frame(&mut writer, &framed, self.options.sync_writes) {
            tracing::error!(error = %e, "Store log append failed, rolling back partial frame");
            self.roll_back(&mut writer, frame_start);
            return Err(e);
        }

        let mut entries = self.entries.write();
        Ok(apply_batch(&mut entries, batch))
    }

    fn scan_prefix(&self, prefix: &[u8]) -> io::Result<KvScan> {
        Ok(Box::new(PrefixScan {
            entries: Arc::clone(&self.entries),
            prefix: prefix.to_vec(),
            last_key: None,
            page: VecDeque::new(),
            exhausted: false,
        }))
    }
}

/// Lazy prefix scan that copies at most [`SCAN_PAGE_LEN`] pairs per read lock.
///
/// Each page resumes strictly after the last key yielded, so keys written
/// during the scan may or may not be observed, but none is yielded twice.
struct PrefixScan {
    entries: Entries,
    prefix: Vec<u8>,
    last_key: Option<Vec<u8>>,
    page: VecDeque<(Vec<u8>, Vec<u8>)>,
    exhausted: bool,
}

impl PrefixScan {
    fn fill_page(&mut self) {
        let entries = self.entries.read();
        let lower = match &self.last_key {
            Some(last) => Bound::Excluded(last.as_slice()),
            None => Bound::Included(self.prefix.as_slice()),
        };
        let prefix = self.prefix.as_slice();
        self.page.extend(
            entries
                .range::<[u8], _>((lower, Bound::Unbounded))
                .take_while(|(k, _)| k.starts_with(prefix))
                .take(SCAN_PAGE_LEN)
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        if self.page.len() < SCAN_PAGE_LEN {
            self.exhausted = true;
        }
        if let Some((key, _)) = self.page.back() {
            self.last_key = Some(key.clone());
        }
    }
}

impl Iterator for PrefixScan {
    type Item = io::Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.page.is_empty() && !self.exhausted {
            self.fill_page();
        }
        self.page.pop_front().map(Ok)
    }
}

/// Writes one frame through the buffered writer and makes it durable.
fn append_frame(writer: &mut BufWriter<File>, framed: &[u8], sync: bool) -> io::Result<()> {
    writer.write_all(framed)?;
    writer.flush()?;
    if sync {
        writer.get_ref().sync_all()?;
    }
    Ok(())
}

/// Swaps in a writer over `file`, dropping the old writer's buffer unflushed.
fn replace_writer(writer: &mut BufWriter<File>, file: File) {
    let stale = std::mem::replace(writer, BufWriter::new(file));
    let (_file, _unflushed) = stale.into_parts();
}

/// Applies `batch` to the in-memory map.
fn apply_batch(entries: &mut BTreeMap<Vec<u8>, Vec<u8>>, batch: WriteBatch) -> WriteSummary {
    let mut summary = WriteSummary::default();
    for op in batch.into_ops() {
        match op {
            WriteOp::Put { key, value } => {
                entries.insert(key, value);
                summary.written += 1;
            }
            WriteOp::Delete { key } => {
                if entries.remove(&key).is_some() {
                    summary.removed += 1;
                }
            }
        }
    }
    summary
}

fn open_log_for_append(path: &Path) -> io::Result<File> {
    let mut opts = OpenOptions::new();
    opts.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    opts.open(path)
}

/// Serialize a batch into its on-disk frame format:
/// `[u32 len BE][u32 crc32 BE][bincode payload]`.
fn frame_batch(batch: &WriteBatch) -> io::Result<Vec<u8>> {
    let bytes = bincode::serialize(batch).map_err(|e| io::Error::other(e.to_string()))?;
    if bytes.len() > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("write batch of {} bytes exceeds {} byte limit", bytes.len(), MAX_FRAME_LEN),
        ));
    }
    let len = u32::try_from(bytes.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "write batch too large"))?;
    let crc = crc32fast::hash(&bytes);

    let mut framed = Vec::with_capacity(FRAME_HEADER_LEN + bytes.len());
    framed.extend_from_slice(&len.to_be_bytes());
    framed.extend_from_slice(&crc.to_be_bytes());
    framed.extend_from_slice(&bytes);
    Ok(framed)
}

/// Replays every intact frame of the log into `entries`.
///
/// Returns the replay statistics and the byte offset just past the last frame
/// that was read cleanly.
fn replay_log(
    path: &Path,
    entries: &mut BTreeMap<Vec<u8>, Vec<u8>>,
) -> io::Result<(ReplayStats, u64)> {
    let mut stats = ReplayStats::default();
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok((stats, 0)),
        Err(e) => return Err(e),
    };
    let mut reader = BufReader::new(file);
    let mut header = [0u8; FRAME_HEADER_LEN];
    let mut valid_len = 0u64;

    loop {
        match reader.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                // A clean EOF lands exactly on a frame boundary; anything else is a torn header.
                if at_eof(path, valid_len)? {
                    break;
                }
                tracing::warn!("Store log truncated mid-header, stopping replay");
                stats.truncated = true;
                break;
            }
            Err(e) => return Err(e),
        }
        let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let stored_crc = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
        if len > MAX_FRAME_LEN {
            tracing::warn!(offset = valid_len, len, "Store log frame length out of range, stopping replay");
            stats.crc_errors += 1;
            break;
        }

        let mut data = vec![0u8; len];
        match reader.read_exact(&mut data) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                tracing::warn!("Store log truncated mid-frame, stopping replay");
                stats.truncated = true;
                break;
            }
            Err(e) => return Err(e),
        }
        if crc32fast::hash(&data) != stored_crc {
            tracing::warn!(offset = valid_len, "Store log CRC mismatch, stopping replay");
            stats.crc_errors += 1;
            break;
        }
        valid_len += (FRAME_HEADER_LEN + len) as u64;

        match bincode::deserialize::<WriteBatch>(&data) {
            Ok(batch) => {
                apply_batch(entries, batch);
                stats.applied += 1;
            }
            Err(e) => {
                tracing::warn!("Store log frame failed to deserialize, skipping: {}", e);
                stats.skipped += 1;
            }
        }
    }

    Ok((stats, valid_len))
}

fn at_eof(path: &Path, offset: u64) -> io::Result<bool> {
    Ok(fs::metadata(path)?.len() == offset)
}

/// Save the key space atomically: `[bincode map][magic][CRC32 BE]` to a temp
/// file, then rename over the previous snapshot.
fn save_snapshot(path: &Path, entries: &BTreeMap<Vec<u8>, Vec<u8>>) -> io::Result<()> {
    let bytes = bincode::serialize(entries).map_err(|e| io::Error::other(e.to_string()))?;
    let crc = crc32fast::hash(&bytes);

    let mut output = Vec::with_capacity(bytes.len() + 8);
    output.extend_from_slice(&bytes);
    output.extend_from_slice(SNAPSHOT_MAGIC);
    output.extend_from_slice(&crc.to_be_bytes());

    let tmp_path = path.with_extension("snap.tmp");
    {
        let mut tmp = File::create(&tmp_path)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        tmp.write_all(&output)?;
        tmp.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;

    tracing::debug!(
        bytes = bytes.len(),
        crc = %format!("{:#010x}", crc),
        "Store snapshot written"
    );
    Ok(())
}

/// Load a snapshot, verifying its CRC32 footer. A missing file is an empty store.
fn load_snapshot(path: &Path) -> io::Result<BTreeMap<Vec<u8>, Vec<u8>>> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(e),
    };

    if raw.len() < 8 || &raw[raw.len() - 8..raw.len() - 4] != SNAPSHOT_MAGIC {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Snapshot {:?} is missing its CRC32 footer", path),
        ));
    }
    let payload = &raw[..raw.len() - 8];
    let stored_crc = u32::from_be_bytes([
        raw[raw.len() - 4],
        raw[raw.len() - 3],
        raw[raw.len() - 2],
        raw[raw.len() - 1],
    ]);
    let computed_crc = crc32fast::hash(payload);
    if computed_crc != stored_crc {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Snapshot CRC32 mismatch: expected {:#010x}, got {:#010x}. File may be corrupted: {:?}",
                stored_crc, computed_crc, path
            ),
        ));
    }

    bincode::deserialize(payload).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fast() -> StoreOptions {
        StoreOptions {
            sync_writes: false,
            ..StoreOptions::default()
        }
    }

    fn put(store: &LogStore, key: &str, value: &str) {
        let mut batch = WriteBatch::new();
        batch.put(key, value);
        store.write(batch).unwrap();
    }

    fn collect(store: &LogStore, prefix: &str) -> Vec<(String, String)> {
        store
            .scan_prefix(prefix.as_bytes())
            .unwrap()
            .map(|r| {
                let (k, v) = r.unwrap();
                (String::from_utf8(k).unwrap(), String::from_utf8(v).unwrap())
            })
            .collect()
    }

    #[test]
    fn test_put_get_delete() {
        let dir = TempDir::new().unwrap();
        let store = LogStore::open_with(dir.path(), fast()).unwrap();
        assert!(store.is_empty());
        put(&store, "a", "1");
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.get(b"b").unwrap(), None);

        let mut batch = WriteBatch::new();
        batch.delete("a").delete("b");
        let summary = store.write(batch).unwrap();
        assert_eq!(summary.removed, 1);
        assert_eq!(store.get(b"a").unwrap(), None);
    }

    #[test]
    fn test_batch_summary_counts() {
        let dir = TempDir::new().unwrap();
        let store = LogStore::open_with(dir.path(), fast()).unwrap();
        let mut batch = WriteBatch::new();
        batch.put("d_x", "data").put("v_x", "vec");
        let summary = store.write(batch).unwrap();
        assert_eq!(
            summary,
            WriteSummary {
                written: 2,
                removed: 0
            }
        );
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_noop_delete_not_logged() {
        let dir = TempDir::new().unwrap();
        let store = LogStore::open_with(dir.path(), fast()).unwrap();
        let mut batch = WriteBatch::new();
        batch.delete("missing");
        assert_eq!(store.write(batch).unwrap(), WriteSummary::default());
        assert_eq!(store.log_size_bytes(), 0);
    }

    #[test]
    fn test_scan_prefix_is_ordered_and_bounded() {
        let dir = TempDir::new().unwrap();
        let store = LogStore::open_with(dir.path(), fast()).unwrap();
        for key in ["v_c", "d_a", "v_a", "w_z", "v_b", "v"] {
            put(&store, key, key);
        }
        let keys: Vec<String> = collect(&store, "v_").into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["v_a", "v_b", "v_c"]);
        assert!(collect(&store, "x_").is_empty());
    }

    #[test]
    fn test_reopen_replays_log() {
        let dir = TempDir::new().unwrap();
        {
            let store = LogStore::open(dir.path()).unwrap();
            put(&store, "k1", "v1");
            put(&store, "k2", "v2");
            let mut batch = WriteBatch::new();
            batch.delete("k1");
            store.write(batch).unwrap();
        }
        let store = LogStore::open(dir.path()).unwrap();
        assert_eq!(store.replay_stats().applied, 3);
        assert!(!store.replay_stats().has_errors());
        assert_eq!(store.get(b"k1").unwrap(), None);
        assert_eq!(store.get(b"k2").unwrap(), Some(b"v2".to_vec()));
    }

    #[test]
    fn test_compact_then_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = LogStore::open_with(dir.path(), fast()).unwrap();
            put(&store, "a", "1");
            put(&store, "b", "2");
            store.compact().unwrap();
            assert_eq!(store.log_size_bytes(), 0);
            put(&store, "c", "3");
        }
        let store = LogStore::open_with(dir.path(), fast()).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.replay_stats().applied, 1);
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.get(b"c").unwrap(), Some(b"3".to_vec()));
    }

    #[test]
    fn test_replaying_log_over_matching_snapshot_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let log_copy;
        {
            let store = LogStore::open_with(dir.path(), fast()).unwrap();
            put(&store, "a", "1");
            put(&store, "a", "2");
            let mut batch = WriteBatch::new();
            batch.delete("a").put("b", "3");
            store.write(batch).unwrap();
            log_copy = fs::read(dir.path().join(STORE_LOG_FILE)).unwrap();
            store.compact().unwrap();
        }
        // Simulate a crash between snapshot rename and log truncation.
        fs::write(dir.path().join(STORE_LOG_FILE), &log_copy).unwrap();
        let store = LogStore::open_with(dir.path(), fast()).unwrap();
        assert_eq!(store.get(b"a").unwrap(), None);
        assert_eq!(store.get(b"b").unwrap(), Some(b"3".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_torn_tail_is_dropped_and_appends_survive() {
        let dir = TempDir::new().unwrap();
        let log_path = dir.path().join(STORE_LOG_FILE);
        {
            let store = LogStore::open_with(dir.path(), fast()).unwrap();
            put(&store, "a", "1");
            put(&store, "b", "2");
        }
        let mut data = fs::read(&log_path).unwrap();
        data.truncate(data.len() - 3);
        fs::write(&log_path, &data).unwrap();
        {
            let store = LogStore::open_with(dir.path(), fast()).unwrap();
            assert!(store.replay_stats().truncated);
            assert_eq!(store.replay_stats().applied, 1);
            assert_eq!(store.get(b"b").unwrap(), None);
            put(&store, "c", "3");
        }
        let store = LogStore::open_with(dir.path(), fast()).unwrap();
        assert!(!store.replay_stats().has_errors());
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.get(b"c").unwrap(), Some(b"3".to_vec()));
    }

    #[test]
    fn test_crc_corruption_detected() {
        let dir = TempDir::new().unwrap();
        let log_path = dir.path().join(STORE_LOG_FILE);
        {
            let store = LogStore::open_with(dir.path(), fast()).unwrap();
            put(&store, "key", "value");
        }
        let mut data = fs::read(&log_path).unwrap();
        let last = data.len() - 1;
        data[last] ^= 0xFF;
        fs::write(&log_path, &data).unwrap();

        let store = LogStore::open_with(dir.path(), fast()).unwrap();
        assert_eq!(store.replay_stats().crc_errors, 1);
        assert_eq!(store.get(b"key").unwrap(), None);
    }

    #[test]
    fn test_strict_open_rejects_corrupt_log() {
        let dir = TempDir::new().unwrap();
        let log_path = dir.path().join(STORE_LOG_FILE);
        {
            let store = LogStore::open_with(dir.path(), fast()).unwrap();
            put(&store, "key", "value");
        }
        let mut data = fs::read(&log_path).unwrap();
        data[FRAME_HEADER_LEN] ^= 0xFF;
        fs::write(&log_path, &data).unwrap();

        let strict = StoreOptions {
            strict: true,
            ..fast()
        };
        let err = LogStore::open_with(dir.path(), strict).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_corrupt_snapshot_fails_open() {
        let dir = TempDir::new().unwrap();
        {
            let store = LogStore::open_with(dir.path(), fast()).unwrap();
            put(&store, "a", "1");
            store.compact().unwrap();
        }
        let snap = dir.path().join(STORE_SNAPSHOT_FILE);
        let mut data = fs::read(&snap).unwrap();
        data[0] ^= 0xFF;
        fs::write(&snap, &data).unwrap();
        let err = LogStore::open_with(dir.path(), fast()).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_frame_format() {
        let mut batch = WriteBatch::new();
        batch.put("k", "v");
        let framed = frame_batch(&batch).unwrap();
        let len = u32::from_be_bytes([framed[0], framed[1], framed[2], framed[3]]) as usize;
        let stored_crc = u32::from_be_bytes([framed[4], framed[5], framed[6], framed[7]]);
        let payload = &framed[FRAME_HEADER_LEN..];
        assert_eq!(payload.len(), len);
        assert_eq!(crc32fast::hash(payload), stored_crc);
        let decoded: WriteBatch = bincode::deserialize(payload).unwrap();
        assert_eq!(decoded, batch);
    }

    // ── paged scans ──

    #[test]
    fn test_scan_spans_multiple_pages_in_order() {
        let dir = TempDir::new().unwrap();
        let store = LogStore::open_with(dir.path(), fast()).unwrap();
        let total = SCAN_PAGE_LEN * 2 + 17;
        let mut batch = WriteBatch::new();
        for i in 0..total {
            batch.put(format!("v_{:05}", i), i.to_string());
        }
        batch.put("d_00000", "x").put("w_00000", "y");
        store.write(batch).unwrap();

        let keys: Vec<String> = collect(&store, "v_").into_iter().map(|(k, _)| k).collect();
        let expected: Vec<String> = (0..total).map(|i| format!("v_{:05}", i)).collect();
        assert_eq!(keys, expected);
    }

    #[test]
    fn test_scan_of_exact_page_multiple() {
        let dir = TempDir::new().unwrap();
        let store = LogStore::open_with(dir.path(), fast()).unwrap();
        let mut batch = WriteBatch::new();
        for i in 0..SCAN_PAGE_LEN {
            batch.put(format!("v_{:05}", i), "v");
        }
        store.write(batch).unwrap();
        assert_eq!(collect(&store, "v_").len(), SCAN_PAGE_LEN);
    }

    #[test]
    fn test_scan_is_lazy_and_never_repeats_keys() {
        let dir = TempDir::new().unwrap();
        let store = LogStore::open_with(dir.path(), fast()).unwrap();
        let mut batch = WriteBatch::new();
        for i in 0..SCAN_PAGE_LEN * 2 {
            batch.put(format!("v_{:05}", i), "old");
        }
        store.write(batch).unwrap();

        let mut scan = store.scan_prefix(b"v_").unwrap();
        let first = scan.next().unwrap().unwrap();
        assert_eq!(first.0, b"v_00000");

        // Writes after the first page was copied show up in later pages only.
        let mut batch = WriteBatch::new();
        batch.put("v_00001", "new").put("v_99999", "late");
        store.write(batch).unwrap();

        let rest: Vec<(Vec<u8>, Vec<u8>)> = scan.map(|r| r.unwrap()).collect();
        assert_eq!(rest.len(), SCAN_PAGE_LEN * 2);
        assert_eq!(rest[0], (b"v_00001".to_vec(), b"old".to_vec()));
        assert_eq!(rest.last().unwrap().0, b"v_99999");
        let mut keys: Vec<&Vec<u8>> = rest.iter().map(|(k, _)| k).collect();
        keys.dedup();
        assert_eq!(keys.len(), rest.len());
    }

    // ── failed appends ──

    #[test]
    fn test_failed_append_is_rolled_back() {
        let dir = TempDir::new().unwrap();
        {
            let store = LogStore::open_with(dir.path(), fast()).unwrap();
            put(&store, "a", "1");
            let boundary = store.log_size_bytes();
            {
                let mut writer = store.writer.lock();
                let mut batch = WriteBatch::new();
                batch.put("lost", "x");
                let framed = frame_batch(&batch).unwrap();
                let (head, tail) = framed.split_at(framed.len() / 2);
                // Half the frame reached the file, the other half is still buffered.
                writer.get_mut().write_all(head).unwrap();
                writer.write_all(tail).unwrap();
                store.roll_back(&mut writer, boundary);
            }
            assert_eq!(store.log_size_bytes(), boundary);
            put(&store, "b", "2");
        }

        let store = LogStore::open_with(dir.path(), fast()).unwrap();
        assert!(!store.replay_stats().has_errors());
        assert_eq!(store.replay_stats().applied, 2);
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.get(b"b").unwrap(), Some(b"2".to_vec()));
        assert_eq!(store.get(b"lost").unwrap(), None);
    }

    #[test]
    fn test_failed_store_refuses_writes_until_compacted() {
        let dir = TempDir::new().unwrap();
        let store = LogStore::open_with(dir.path(), fast()).unwrap();
        put(&store, "a", "1");
        store.failed.store(true, Ordering::Release);

        let mut batch = WriteBatch::new();
        batch.put("b", "2");
        assert!(store.write(batch).is_err());
        assert_eq!(store.get(b"b").unwrap(), None);

        store.compact().unwrap();
        put(&store, "b", "2");
        drop(store);

        let store = LogStore::open_with(dir.path(), fast()).unwrap();
        assert_eq!(store.len(), 2);
    }

    // ── frame limits ──

    #[test]
    fn test_oversized_frame_header_stops_replay() {
        let dir = TempDir::new().unwrap();
        let log_path = dir.path().join(STORE_LOG_FILE);
        {
            let store = LogStore::open_with(dir.path(), fast()).unwrap();
            put(&store, "a", "1");
        }
        let mut data = fs::read(&log_path).unwrap();
        let good_len = data.len();
        data.extend_from_slice(&u32::MAX.to_be_bytes());
        data.extend_from_slice(&0u32.to_be_bytes());
        data.extend_from_slice(b"garbage");
        fs::write(&log_path, &data).unwrap();

        let store = LogStore::open_with(dir.path(), fast()).unwrap();
        assert_eq!(store.replay_stats().crc_errors, 1);
        assert_eq!(store.replay_stats().applied, 1);
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.log_size_bytes(), good_len as u64);
    }

    #[test]
    fn test_oversized_batch_rejected() {
        let mut batch = WriteBatch::new();
        batch.put("big", vec![0u8; MAX_FRAME_LEN + 1]);
        let err = frame_batch(&batch).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
