//! Identifier-keyed cache of decoded light textures
//!
//! Entries are created lazily on first lookup and carry a `last_touched`
//! timestamp that every hit refreshes. Eviction is not done here: an outside
//! sweep reads the timestamps through [`ResourceCache::touched_before`] and
//! calls [`ResourceCache::remove`] for cold entries.

use crate::error::Result;
use crate::texture::LightTexture;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, trace};

/// Cached texture with its liveness marker.
#[derive(Debug, Clone)]
struct CacheEntry {
    texture: Arc<LightTexture>,
    last_touched: Instant,
}

impl CacheEntry {
    fn new(texture: Arc<LightTexture>) -> Self {
        Self {
            texture,
            last_touched: Instant::now(),
        }
    }
}

/// Lazily populated light texture cache.
#[derive(Debug, Default)]
pub struct ResourceCache {
    entries: DashMap<u32, CacheEntry>,
    hits: AtomicUsize,
    misses: AtomicUsize,
    decodes: AtomicUsize,
}

impl ResourceCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached texture for `id`, building it with `compute` on a
    /// miss.
    ///
    /// A hit refreshes the entry's timestamp. A texture disposed by the
    /// texture manager counts as a miss and is rebuilt. The slot for `id`
    /// stays locked while `compute` runs, so concurrent misses for the same
    /// identifier produce a single decode. When `compute` returns `Ok(None)`
    /// or an error nothing is stored.
    pub fn get_or_insert_with<F>(&self, id: u32, compute: F) -> Result<Option<Arc<LightTexture>>>
    where
        F: FnOnce() -> Result<Option<LightTexture>>,
    {
        let mut slot = self.entries.entry(id);

        if let Entry::Occupied(occupied) = &mut slot {
            let cached = occupied.get_mut();
            if !cached.texture.is_disposed() {
                cached.last_touched = Instant::now();
                self.hits.fetch_add(1, Ordering::Relaxed);
                trace!("Light cache hit for {}", id);
                return Ok(Some(Arc::clone(&cached.texture)));
            }
            debug!("Cached light {} was disposed, rebuilding", id);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);

        let texture = match compute() {
            Ok(Some(texture)) => Arc::new(texture),
            Ok(None) => {
                discard(slot);
                return Ok(None);
            }
            Err(e) => {
                discard(slot);
                return Err(e);
            }
        };

        self.decodes.fetch_add(1, Ordering::Relaxed);
        let entry = CacheEntry::new(Arc::clone(&texture));
        match slot {
            Entry::Occupied(mut occupied) => {
                occupied.insert(entry);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(entry);
            }
        }

        Ok(Some(texture))
    }

    /// Liveness marker of `id`, for the eviction sweep
    pub fn last_touched(&self, id: u32) -> Option<Instant> {
        self.entries.get(&id).map(|entry| entry.last_touched)
    }

    /// Identifiers whose last touch is older than `cutoff`
    pub fn touched_before(&self, cutoff: Instant) -> Vec<u32> {
        let mut ids: Vec<u32> = self
            .entries
            .iter()
            .filter(|entry| entry.last_touched < cutoff)
            .map(|entry| *entry.key())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Drop `id` and dispose its texture. Returns whether it was cached.
    pub fn remove(&self, id: u32) -> bool {
        match self.entries.remove(&id) {
            Some((_, entry)) => {
                entry.texture.dispose();
                debug!("Evicted light {} from cache", id);
                true
            }
            None => false,
        }
    }

    /// Drop every entry and dispose their textures
    pub fn clear(&self) {
        self.entries.retain(|_, entry| {
            entry.texture.dispose();
            false
        });
        debug!("Light cache cleared");
    }

    /// Check if `id` has an entry
    pub fn contains(&self, id: u32) -> bool {
        self.entries.contains_key(&id)
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            decodes: self.decodes.load(Ordering::Relaxed),
        }
    }
}

fn discard(slot: Entry<'_, u32, CacheEntry>) {
    if let Entry::Occupied(occupied) = slot {
        occupied.remove();
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Number of entries in the cache
    pub entry_count: usize,
    /// Lookups served from the cache
    pub hits: usize,
    /// Lookups that had to run the decoder
    pub misses: usize,
    /// Textures built and stored
    pub decodes: usize,
}
