//! On-disk snapshot cache
//!
//! The cache is a single JSON file replaced wholesale after every successful
//! build. Its freshness is judged from the file's modification time only.
//! Concurrent writers are not coordinated; the last one wins.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::InventoryError;
use crate::types::InventorySnapshot;

/// Name of the cache file inside the cache directory
pub const CACHE_FILE_NAME: &str = "abiquo-inventory";

/// Default maximum age of a cached snapshot
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

/// TTL-gated snapshot cache
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
    ttl: Duration,
}

impl CacheStore {
    /// Create a cache backed by the given file
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            ttl,
        }
    }

    /// Create a cache stored as [`CACHE_FILE_NAME`] inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>, ttl: Duration) -> Self {
        Self::new(dir.as_ref().join(CACHE_FILE_NAME), ttl)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Check whether the cache file exists and is younger than the TTL
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(SystemTime::now())
    }

    /// Freshness as seen at `now`, in whole seconds
    #[must_use]
    pub fn is_fresh_at(&self, now: SystemTime) -> bool {
        let Ok(modified) = fs::metadata(&self.path).and_then(|m| m.modified()) else {
            return false;
        };
        let age = DateTime::<Utc>::from(now).timestamp() - DateTime::<Utc>::from(modified).timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        debug!(path = %self.path.display(), age, ttl, "cache age");
        age <= ttl
    }

    /// Read the cached snapshot, or an empty one if it is missing or corrupt
    #[must_use]
    pub fn read(&self) -> InventorySnapshot {
        self.try_read().unwrap_or_else(|e| {
            debug!(error = %e, "ignoring unreadable cache");
            InventorySnapshot::empty()
        })
    }

    /// Read the cached snapshot
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn try_read(&self) -> Result<InventorySnapshot, InventoryError> {
        let content = fs::read_to_string(&self.path)
            .map_err(|e| InventoryError::CacheError(format!("{}: {e}", self.path.display())))?;
        serde_json::from_str(&content)
            .map_err(|e| InventoryError::CacheError(format!("{}: {e}", self.path.display())))
    }

    /// Replace the cached snapshot, creating the cache directory if needed
    ///
    /// # Errors
    /// Returns an error if the directory or file cannot be written.
    pub fn write(&self, snapshot: &InventorySnapshot) -> Result<(), InventoryError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .map_err(|e| InventoryError::CacheError(format!("{}: {e}", dir.display())))?;
        }
        let json = serde_json::to_string(snapshot)
            .map_err(|e| InventoryError::CacheError(e.to_string()))?;
        fs::write(&self.path, json)
            .map_err(|e| InventoryError::CacheError(format!("{}: {e}", self.path.display())))?;
        debug!(path = %self.path.display(), "cache written");
        Ok(())
    }
}
