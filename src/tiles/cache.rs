use super::image::{Recycle, TileImage};
use super::key::TileKey;
use crate::prelude::{Arc, Mutex};
use fxhash::FxBuildHasher;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{MutexGuard, PoisonError};

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
}

struct CacheState<I> {
    entries: LruCache<TileKey, I, FxBuildHasher>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// In-memory tile cache using strict LRU eviction
///
/// Every operation runs under one mutex, so the key table and the recency
/// order can never disagree. Images pushed out by an insert are recycled
/// before the insert returns. Clones share the same storage.
pub struct TileCache<I: Recycle = TileImage> {
    state: Arc<Mutex<CacheState<I>>>,
}

impl<I: Recycle> TileCache<I> {
    /// Create a new tile cache holding at most `capacity` tiles (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            state: Arc::new(Mutex::new(CacheState {
                entries: LruCache::with_hasher(capacity, FxBuildHasher::default()),
                hits: 0,
                misses: 0,
                evictions: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState<I>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get a tile from the cache and mark it most recently used
    pub fn get(&self, key: &TileKey) -> Option<I> {
        let mut state = self.lock();
        let found = state.entries.get(key).cloned();
        match found {
            Some(image) => {
                state.hits += 1;
                Some(image)
            }
            None => {
                state.misses += 1;
                None
            }
        }
    }

    /// Insert a tile, returning the image it replaced
    ///
    /// A replaced image is handed back to the caller and is not recycled.
    /// When a new key arrives at a full cache, the least recently used tile
    /// is removed and recycled first.
    pub fn put(&self, key: TileKey, image: I) -> Option<I> {
        let mut state = self.lock();

        if !state.entries.contains(&key) && state.entries.len() >= state.entries.cap().get() {
            if let Some((dead_key, dead_image)) = state.entries.pop_lru() {
                log::debug!("evicting tile {}", dead_key);
                dead_image.recycle();
                state.evictions += 1;
            }
        }

        state.entries.put(key, image)
    }

    /// Remove a tile from the cache. The image is returned un-recycled.
    pub fn remove(&self, key: &TileKey) -> Option<I> {
        self.lock().entries.pop(key)
    }

    /// Remove and recycle every cached tile
    pub fn clear(&self) {
        let removed = self.drain();
        if !removed.is_empty() {
            log::debug!("cleared {} cached tiles", removed.len());
        }
        for (_, image) in removed {
            image.recycle();
        }
    }

    /// Remove every cached tile and hand the images back un-recycled,
    /// least recently used first
    pub fn drain(&self) -> Vec<(TileKey, I)> {
        let mut state = self.lock();
        let mut removed = Vec::with_capacity(state.entries.len());
        while let Some(entry) = state.entries.pop_lru() {
            removed.push(entry);
        }
        removed
    }

    /// Check if a tile is in the cache without touching its recency
    pub fn contains(&self, key: &TileKey) -> bool {
        self.lock().entries.contains(key)
    }

    /// Keys ordered from most to least recently used
    pub fn keys_by_recency(&self) -> Vec<TileKey> {
        self.lock().entries.iter().map(|(key, _)| key.clone()).collect()
    }

    /// Get the current number of cached tiles
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get cache capacity
    pub fn capacity(&self) -> usize {
        self.lock().entries.cap().get()
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            size: state.entries.len(),
        }
    }
}

impl<I: Recycle> Clone for TileCache<I> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}
