//! Bounded pool of open audio sources.
//!
//! Reading thousands of short units scattered over a corpus would otherwise
//! reopen the same files over and over. The cache keeps at most
//! `max_open_files` sources open and closes the least recently used one when
//! a new file is needed.

use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use lru::LruCache;

use consyn_core::{Error, Result};

use crate::source::{AudioSource, WavSource};

/// Open-file bound used when nothing else is configured.
pub const DEFAULT_MAX_OPEN_FILES: usize = 50;

type Opener = Box<dyn FnMut(&Path) -> Result<Box<dyn AudioSource>>>;

/// Hit and eviction counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// LRU cache of open sources keyed by path.
pub struct SourceCache {
    sources: LruCache<PathBuf, Box<dyn AudioSource>>,
    opener: Opener,
    stats: CacheStats,
}

impl SourceCache {
    /// Cache that opens WAV files.
    pub fn new(max_open_files: usize) -> Self {
        Self::with_opener(max_open_files, |path| {
            Ok(Box::new(WavSource::open(path)?) as Box<dyn AudioSource>)
        })
    }

    /// Cache with a custom way of opening sources.
    pub fn with_opener<F>(max_open_files: usize, opener: F) -> Self
    where
        F: FnMut(&Path) -> Result<Box<dyn AudioSource>> + 'static,
    {
        let capacity = NonZeroUsize::new(max_open_files.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            sources: LruCache::new(capacity),
            opener: Box::new(opener),
            stats: CacheStats::default(),
        }
    }

    /// The open source for `path`, opening it (and possibly closing another)
    /// if needed.
    pub fn get(&mut self, path: &Path) -> Result<&mut (dyn AudioSource + 'static)> {
        if self.sources.contains(path) {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
            let source = (self.opener)(path)?;
            if let Some((evicted, _)) = self.sources.push(path.to_path_buf(), source) {
                self.stats.evictions += 1;
                tracing::trace!(path = %evicted.display(), "closed source");
            }
        }

        self.sources
            .get_mut(path)
            .map(|source| source.as_mut())
            .ok_or_else(|| Error::unreadable(path, "source evicted while in use"))
    }

    /// A fresh source for `path` that the cache does not keep.
    ///
    /// Used for sequential passes over a whole file so they do not disturb
    /// the read positions of cached sources.
    pub fn open(&mut self, path: &Path) -> Result<Box<dyn AudioSource>> {
        (self.opener)(path)
    }

    /// Close `path` if it is open.
    pub fn remove(&mut self, path: &Path) -> bool {
        self.sources.pop(path).is_some()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.sources.contains(path)
    }

    pub fn clear(&mut self) {
        self.sources.clear();
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.sources.cap().get()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

impl Default for SourceCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_OPEN_FILES)
    }
}

impl fmt::Debug for SourceCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceCache")
            .field("open", &self.sources.len())
            .field("capacity", &self.capacity())
            .field("stats", &self.stats)
            .finish()
    }
}
