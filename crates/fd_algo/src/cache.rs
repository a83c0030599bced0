//! Bounded memoization of region distributions.
//!
//! Keyed by the exact bit pattern of a piece's bounds. Capacity is fixed;
//! when full, the least recently used entry is evicted. The cache knows
//! nothing about regions: whoever changes the region set (or imports a new
//! session) must call [`CalcCache::clear`].

use std::num::NonZeroUsize;

use lru::LruCache;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use fd_core::Piece;

use crate::overlap::RegionDistribution;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct PieceKey {
    start: u64,
    end: u64,
}

impl From<&Piece> for PieceKey {
    fn from(p: &Piece) -> Self {
        PieceKey { start: p.start.to_bits(), end: p.end.to_bits() }
    }
}

/// Snapshot of cache counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub len: usize,
    pub capacity: usize,
}

impl CacheStats {
    /// Hit rate as a fraction (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 { 0.0 } else { self.hits as f64 / total as f64 }
    }
}

pub struct CalcCache {
    inner: LruCache<PieceKey, RegionDistribution>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl CalcCache {
    /// Capacity 0 is bumped to 1.
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        CalcCache { inner: LruCache::new(cap), hits: 0, misses: 0, evictions: 0 }
    }

    pub fn get(&mut self, piece: &Piece) -> Option<RegionDistribution> {
        match self.inner.get(&PieceKey::from(piece)) {
            Some(d) => {
                self.hits += 1;
                Some(d.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn set(&mut self, piece: &Piece, distribution: RegionDistribution) {
        let key = PieceKey::from(piece);
        if let Some((old_key, _)) = self.inner.push(key, distribution) {
            if old_key != key {
                self.evictions += 1;
            }
        }
    }

    /// Drops every entry; counters are kept.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            len: self.inner.len(),
            capacity: self.inner.cap().get(),
        }
    }
}

impl std::fmt::Debug for CalcCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalcCache").field("stats", &self.stats()).finish()
    }
}
