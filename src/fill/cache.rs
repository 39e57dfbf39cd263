use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use cached::{Cached, SizedCache};

use crate::dict::WordEntry;

/// Default bound on resident pattern entries.
pub const DEFAULT_CACHE_CAPACITY: usize = 50_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

/// Bounded LRU cache from canonical pattern strings to resolved word lists.
///
/// Readers take the lock with `try_write` (an LRU hit reorders the list, so
/// even a lookup needs exclusive access) and report a miss rather than block
/// when it is contended; the solver then falls back to a direct trie query.
/// The cache lives exactly as long as its lexicon, so a dictionary reload
/// (a new lexicon) starts from an empty cache and stale reads are impossible.
pub struct PatternCache {
    inner: RwLock<SizedCache<String, Arc<Vec<WordEntry>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl PatternCache {
    pub fn new(capacity: usize) -> PatternCache {
        PatternCache {
            inner: RwLock::new(SizedCache::with_size(capacity.max(1))),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Look `pattern` up, refreshing its LRU position. Contention and lock
    /// poisoning both count as misses.
    pub fn get(&self, pattern: &str) -> Option<Arc<Vec<WordEntry>>> {
        let hit = match self.inner.try_write() {
            Ok(mut cache) => cache.cache_get(&pattern.to_string()).cloned(),
            Err(_) => None,
        };
        match hit {
            Some(words) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(words)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert a resolved list, evicting the least-recently-used entry when
    /// the cache is full.
    pub fn insert(&self, pattern: String, words: Arc<Vec<WordEntry>>) {
        if let Ok(mut cache) = self.inner.write() {
            let before = cache.cache_size();
            let replaced = cache.cache_set(pattern, words);
            if replaced.is_none() && cache.cache_size() == before {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        let entries = match self.inner.try_write() {
            Ok(cache) => cache.cache_size(),
            Err(_) => 0,
        };
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries,
        }
    }
}

impl std::fmt::Debug for PatternCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("PatternCache")
            .field("hits", &stats.hits)
            .field("misses", &stats.misses)
            .field("evictions", &stats.evictions)
            .field("entries", &stats.entries)
            .finish()
    }
}
