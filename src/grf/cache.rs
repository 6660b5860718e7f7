//! Bounded LRU cache of decoded entry payloads.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

/// Caches decoded bytes keyed by exact filename, with LRU eviction.
///
/// All operations take one short critical section; lookups clone the
/// cached bytes so the lock is never held while callers use them.
#[derive(Debug)]
pub struct ExtractionCache {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    entries: LruCache<String, Vec<u8>>,
    hits: u64,
    misses: u64,
}

impl ExtractionCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(capacity),
                hits: 0,
                misses: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Returns the cached payload and promotes the key to most recently
    /// used. Updates the hit/miss counters either way.
    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        let mut inner = self.lock();
        match inner.entries.get(name).cloned() {
            Some(data) => {
                inner.hits += 1;
                Some(data)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Inserts a freshly decoded payload, evicting the least recently used
    /// entry when at capacity.
    pub fn insert(&self, name: String, data: Vec<u8>) {
        self.lock().entries.put(name, data);
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// (hits, misses) since creation.
    pub fn counters(&self) -> (u64, u64) {
        let inner = self.lock();
        (inner.hits, inner.misses)
    }
}
