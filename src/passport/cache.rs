use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

use lru::LruCache;
use tracing::debug;

/// Process-wide artist → country memo. `None` records a name that could not be resolved.
///
/// Bounded by `capacity` (0 = unbounded); the least recently used name is evicted first.
#[derive(Debug)]
pub struct ResolutionCache {
    entries: Mutex<LruCache<String, Option<String>>>,
}

impl ResolutionCache {
    pub fn new(capacity: usize) -> Self {
        let entries = match NonZeroUsize::new(capacity) {
            Some(capacity) => LruCache::new(capacity),
            None => LruCache::unbounded(),
        };
        Self {
            entries: Mutex::new(entries),
        }
    }

    /// `Some(None)` is a cached negative result; `None` is a miss. A hit refreshes recency.
    pub fn get(&self, artist: &str) -> Option<Option<String>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(artist).cloned()
    }

    pub fn insert(&self, artist: &str, country: Option<String>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((evicted, _)) = entries.push(artist.to_string(), country) {
            if evicted != artist {
                debug!(artist = %evicted, "evicted resolution cache entry");
            }
        }
    }

    pub fn is_full(&self) -> bool {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.len() >= entries.cap().get()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
