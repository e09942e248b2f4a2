//! Persistent Store Adapter
//!
//! A byte-oriented key/value cache that survives process restarts. The
//! synchronization core stores a single JSON [`Snapshot`] under one namespaced
//! key ([`DEFAULT_CACHE_KEY`] unless configured otherwise).
//!
//! Two implementations are provided:
//!
//! - [`FileCache`]: one file per key inside a directory, written atomically
//! - [`MemoryCache`]: in-process map, optionally with a size quota

use crate::error::CacheError;
use crate::state::{PartialSnapshot, Snapshot};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Key the snapshot is stored under by default
pub const DEFAULT_CACHE_KEY: &str = "pantry:app-state";

/// Synchronous key/value storage
///
/// Calls are synchronous because the change propagator writes from inside a
/// state observer, before [`Store::send`](pantry_runtime::Store::send) returns.
pub trait LocalCache: Send + Sync {
    /// Read the bytes stored under `key`
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] if the storage cannot be read.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store `bytes` under `key`, replacing any previous value
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] or [`CacheError::QuotaExceeded`] if the
    /// storage refuses the write.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), CacheError>;
}

/// Read and parse the snapshot stored under `key`
///
/// Collections missing from the stored JSON come back as `None`.
///
/// # Errors
///
/// Returns [`CacheError::Serialization`] if the stored bytes are not a JSON
/// object of collections, or any read error from the cache.
pub fn read_snapshot(
    cache: &dyn LocalCache,
    key: &str,
) -> Result<Option<PartialSnapshot>, CacheError> {
    match cache.read(key)? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Serialize `snapshot` and store it under `key`
///
/// Returns the number of bytes written.
///
/// # Errors
///
/// Returns [`CacheError::Serialization`] if encoding fails, or any write error
/// from the cache.
pub fn write_snapshot(
    cache: &dyn LocalCache,
    key: &str,
    snapshot: &Snapshot,
) -> Result<usize, CacheError> {
    let bytes = serde_json::to_vec(snapshot)?;
    cache.write(key, &bytes)?;
    Ok(bytes.len())
}

/// In-process cache backed by a shared map
///
/// Clones share the same map, so a test can keep one handle while the
/// application owns another.
#[derive(Clone, Debug, Default)]
pub struct MemoryCache {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    quota: Option<usize>,
}

impl MemoryCache {
    /// Create an empty, unbounded cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes larger than `limit` bytes with [`CacheError::QuotaExceeded`]
    #[must_use]
    pub const fn with_quota(mut self, limit: usize) -> Self {
        self.quota = Some(limit);
        self
    }

    /// Number of stored keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LocalCache for MemoryCache {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.lock().get(key).cloned())
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), CacheError> {
        if let Some(limit) = self.quota {
            if bytes.len() > limit {
                return Err(CacheError::QuotaExceeded {
                    size: bytes.len(),
                    limit,
                });
            }
        }

        self.lock().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

/// Directory-backed cache: one JSON file per key
///
/// Writes go to a temporary file that is then renamed over the target, so a
/// crash mid-write leaves the previous value intact.
#[derive(Clone, Debug)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Use `dir` as the cache directory, creating it if needed
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| CacheError::Io {
            key: dir.display().to_string(),
            message: e.to_string(),
        })?;

        tracing::debug!(dir = %dir.display(), "Opened file cache");
        Ok(Self { dir })
    }

    /// The cache directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that holds the value for `key`
    ///
    /// Characters outside `[A-Za-z0-9._-]` are replaced with `_`.
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

fn io_error(key: &str, error: &std::io::Error) -> CacheError {
    CacheError::Io {
        key: key.to_string(),
        message: error.to_string(),
    }
}

impl LocalCache for FileCache {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        match std::fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(key, &e)),
        }
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), CacheError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");

        std::fs::write(&tmp, bytes).map_err(|e| io_error(key, &e))?;
        std::fs::rename(&tmp, &path).map_err(|e| io_error(key, &e))
    }
}
