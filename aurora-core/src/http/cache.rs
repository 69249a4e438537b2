//! Response cache keyed by request signature.
//!
//! Layout of the on-disk cache: `{cache_dir}/{signature}.json`, one entry per
//! request. Writes are atomic (write to `.tmp`, rename into place). An entry
//! that fails to parse is quarantined as `{signature}.json.quarantined` and
//! treated as a miss.
//!
//! Expiry is a property of the cache instance, not of the entry: `None` means
//! entries never expire.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::DataError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
    pub fetched_at: DateTime<Utc>,
}

impl CachedResponse {
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status,
            body: body.into(),
            fetched_at: Utc::now(),
        }
    }

    /// An entry from the future (clock skew) is treated as fresh.
    pub fn is_expired(&self, expire_after: Option<Duration>, now: DateTime<Utc>) -> bool {
        let Some(ttl) = expire_after else {
            return false;
        };
        match now.signed_duration_since(self.fetched_at).to_std() {
            Ok(age) => age >= ttl,
            Err(_) => false,
        }
    }
}

pub trait ResponseCache: Send + Sync {
    /// Fetch a live entry. Expired entries are evicted and reported as a miss.
    fn get(&self, signature: &str) -> Result<Option<CachedResponse>, DataError>;

    fn put(&self, signature: &str, response: &CachedResponse) -> Result<(), DataError>;

    fn remove(&self, signature: &str) -> Result<(), DataError>;

    /// Remove every entry, returning how many were removed.
    fn clear(&self) -> Result<usize, DataError>;

    fn len(&self) -> Result<usize, DataError>;

    fn is_empty(&self) -> Result<bool, DataError> {
        Ok(self.len()? == 0)
    }
}

/// Size summary of an on-disk cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub bytes: u64,
}

pub struct DiskCache {
    cache_dir: PathBuf,
    expire_after: Option<Duration>,
}

impl DiskCache {
    /// Open (creating if needed) a cache rooted at `cache_dir`.
    pub fn open(cache_dir: impl Into<PathBuf>) -> Result<Self, DataError> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir).map_err(|e| {
            DataError::Cache(format!(
                "failed to create cache dir {}: {e}",
                cache_dir.display()
            ))
        })?;
        Ok(Self {
            cache_dir,
            expire_after: None,
        })
    }

    pub fn with_expiry(mut self, expire_after: Option<Duration>) -> Self {
        self.expire_after = expire_after;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn stats(&self) -> Result<CacheStats, DataError> {
        let mut stats = CacheStats {
            entries: 0,
            bytes: 0,
        };
        for path in self.entry_paths()? {
            stats.entries += 1;
            stats.bytes += fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        }
        Ok(stats)
    }

    fn entry_path(&self, signature: &str) -> PathBuf {
        self.cache_dir.join(format!("{signature}.json"))
    }

    fn entry_paths(&self) -> Result<Vec<PathBuf>, DataError> {
        let entries = fs::read_dir(&self.cache_dir)
            .map_err(|e| DataError::Cache(format!("read dir: {e}")))?;
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DataError::Cache(format!("dir entry: {e}")))?;
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        Ok(paths)
    }
}

impl ResponseCache for DiskCache {
    fn get(&self, signature: &str) -> Result<Option<CachedResponse>, DataError> {
        let path = self.entry_path(signature);
        if !path.exists() {
            return Ok(None);
        }

        let content =
            fs::read_to_string(&path).map_err(|e| DataError::Cache(format!("read entry: {e}")))?;

        let entry: CachedResponse = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(e) => {
                let quarantine = path.with_extension("json.quarantined");
                warn!(path = %path.display(), error = %e, "quarantining corrupt cache entry");
                let _ = fs::rename(&path, &quarantine);
                return Ok(None);
            }
        };

        if entry.is_expired(self.expire_after, Utc::now()) {
            let _ = fs::remove_file(&path);
            return Ok(None);
        }

        Ok(Some(entry))
    }

    fn put(&self, signature: &str, response: &CachedResponse) -> Result<(), DataError> {
        let path = self.entry_path(signature);
        let tmp_path = path.with_extension("json.tmp");

        let json = serde_json::to_string(response)
            .map_err(|e| DataError::Cache(format!("entry serialization: {e}")))?;
        fs::write(&tmp_path, json).map_err(|e| DataError::Cache(format!("entry write: {e}")))?;

        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::Cache(format!("atomic rename failed: {e}"))
        })
    }

    fn remove(&self, signature: &str) -> Result<(), DataError> {
        let path = self.entry_path(signature);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| DataError::Cache(format!("remove entry: {e}")))?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<usize, DataError> {
        let paths = self.entry_paths()?;
        for path in &paths {
            fs::remove_file(path).map_err(|e| DataError::Cache(format!("remove entry: {e}")))?;
        }
        Ok(paths.len())
    }

    fn len(&self) -> Result<usize, DataError> {
        Ok(self.entry_paths()?.len())
    }
}

/// In-process cache for tests and one-shot runs.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CachedResponse>>,
    expire_after: Option<Duration>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_expiry(mut self, expire_after: Option<Duration>) -> Self {
        self.expire_after = expire_after;
        self
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, CachedResponse>>, DataError> {
        self.entries
            .lock()
            .map_err(|_| DataError::Cache("memory cache lock poisoned".into()))
    }
}

impl ResponseCache for MemoryCache {
    fn get(&self, signature: &str) -> Result<Option<CachedResponse>, DataError> {
        let mut entries = self.lock()?;
        let expired = match entries.get(signature) {
            None => return Ok(None),
            Some(entry) => entry.is_expired(self.expire_after, Utc::now()),
        };
        if expired {
            entries.remove(signature);
            return Ok(None);
        }
        Ok(entries.get(signature).cloned())
    }

    fn put(&self, signature: &str, response: &CachedResponse) -> Result<(), DataError> {
        self.lock()?.insert(signature.to_string(), response.clone());
        Ok(())
    }

    fn remove(&self, signature: &str) -> Result<(), DataError> {
        self.lock()?.remove(signature);
        Ok(())
    }

    fn clear(&self) -> Result<usize, DataError> {
        let mut entries = self.lock()?;
        let n = entries.len();
        entries.clear();
        Ok(n)
    }

    fn len(&self) -> Result<usize, DataError> {
        Ok(self.lock()?.len())
    }
}
