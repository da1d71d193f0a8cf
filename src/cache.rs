use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use thiserror::Error;

const CACHE_TTL_SECS: u64 = 86400; // 1 day

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to create cache directory: {0}")]
    CreateDir(std::io::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// JSON files under the user cache directory, one per (namespace, key)
pub struct Cache {
    cache_dir: PathBuf,
    enabled: bool,
    ttl: Duration,
}

impl Cache {
    pub fn new(enabled: bool) -> Result<Self, CacheError> {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("pidmr");
        Self::in_dir(cache_dir, enabled)
    }

    /// Cache rooted at `cache_dir` instead of the user cache directory
    pub fn in_dir(cache_dir: PathBuf, enabled: bool) -> Result<Self, CacheError> {
        if enabled {
            fs::create_dir_all(&cache_dir).map_err(CacheError::CreateDir)?;
        }

        Ok(Self {
            cache_dir,
            enabled,
            ttl: Duration::from_secs(CACHE_TTL_SECS),
        })
    }

    /// Override how long entries stay fresh
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    fn entry_path(&self, namespace: &str, key: &str) -> PathBuf {
        // Hash the key so URLs are safe as file names
        let hash = format!("{:x}", key_hash(key));
        self.cache_dir.join(format!("{}_{}.json", namespace, hash))
    }

    /// Get a cached value if it exists and is not expired
    pub fn get<T: DeserializeOwned>(&self, namespace: &str, key: &str) -> Option<T> {
        self.read(namespace, key, false)
    }

    /// Get a cached value regardless of its age
    pub fn get_stale<T: DeserializeOwned>(&self, namespace: &str, key: &str) -> Option<T> {
        self.read(namespace, key, true)
    }

    fn read<T: DeserializeOwned>(&self, namespace: &str, key: &str, allow_stale: bool) -> Option<T> {
        if !self.enabled {
            return None;
        }

        let path = self.entry_path(namespace, key);

        if !allow_stale {
            let modified = fs::metadata(&path).ok()?.modified().ok()?;
            let age = SystemTime::now().duration_since(modified).ok()?;
            if age > self.ttl {
                return None;
            }
        }

        let content = fs::read_to_string(&path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Store a value in the cache
    pub fn set<T: Serialize>(&self, namespace: &str, key: &str, value: &T) -> Result<(), CacheError> {
        if !self.enabled {
            return Ok(());
        }

        let path = self.entry_path(namespace, key);
        let content = serde_json::to_string(value)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Clear all cached data
    pub fn clear(&self) -> Result<(), CacheError> {
        if self.cache_dir.exists() {
            for entry in fs::read_dir(&self.cache_dir)? {
                let entry = entry?;
                if entry.path().extension().is_some_and(|e| e == "json") {
                    fs::remove_file(entry.path())?;
                }
            }
        }
        Ok(())
    }
}

fn key_hash(s: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}
