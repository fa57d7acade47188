//! Byte caches for downloaded tiles and elevation samples.
//!
//! Keys have the form `<provider-prefix><packed-tile-key>`. A hit short-circuits the
//! network entirely. Raster tiles are stored as their raw image bytes; elevation grids
//! are stored in their bincode form once the provider payload parses.

use crate::prelude::{Arc, Mutex};
use crate::{MapError, Result};
use lru::LruCache;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

/// Persistent or in-memory store for raw payload bytes
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    fn add(&self, key: &str, bytes: &[u8]) -> Result<()>;

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// In-memory cache using LRU eviction
#[derive(Debug)]
pub struct MemoryCache {
    cache: Arc<Mutex<LruCache<String, Arc<Vec<u8>>>>>,
}

impl MemoryCache {
    /// Create a new cache with the given capacity
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    /// Get the current number of cached entries
    pub fn len(&self) -> usize {
        self.cache.lock().map(|cache| cache.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }
}

impl Clone for MemoryCache {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(256)
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.cache
            .lock()
            .ok()?
            .get(key)
            .map(|bytes| bytes.as_ref().clone())
    }

    fn add(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let mut cache = self
            .cache
            .lock()
            .map_err(|_| MapError::Cache("memory cache lock poisoned".to_string()))?;
        cache.put(key.to_string(), Arc::new(bytes.to_vec()));
        Ok(())
    }

    fn contains(&self, key: &str) -> bool {
        self.cache
            .lock()
            .map(|cache| cache.contains(key))
            .unwrap_or(false)
    }
}

/// One file per key under a directory
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Opens a cache rooted at `dir`, creating the directory if needed
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path for a cache key; characters unsafe in file names are replaced
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{name}.bin"))
    }
}

impl CacheStore for FileCache {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        fs::read(self.path_for(key)).ok()
    }

    fn add(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn contains(&self, key: &str) -> bool {
        self.path_for(key).exists()
    }
}

/// Memory in front of a slower backing store. Backing hits are promoted into memory.
pub struct LayeredCache {
    memory: MemoryCache,
    backing: Arc<dyn CacheStore>,
}

impl LayeredCache {
    pub fn new(memory: MemoryCache, backing: Arc<dyn CacheStore>) -> Self {
        Self { memory, backing }
    }
}

impl CacheStore for LayeredCache {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        if let Some(bytes) = self.memory.get(key) {
            return Some(bytes);
        }
        let bytes = self.backing.get(key)?;
        if let Err(e) = self.memory.add(key, &bytes) {
            log::warn!("failed to promote cache entry {}: {}", key, e);
        }
        Some(bytes)
    }

    fn add(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.memory.add(key, bytes)?;
        self.backing.add(key, bytes)
    }
}
