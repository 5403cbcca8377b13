//! In-memory TTL cache for upstream lookups
//!
//! A string-keyed map where every entry carries its own time-to-live.
//!
//! # Architecture
//!
//! - One `RwLock` guards the whole map: reads share it, writes are exclusive
//! - Expiry is lazy: an entry past its TTL reads as a miss, nothing sweeps
//!   in the background
//! - `set` overwrites unconditionally (last write wins)
//! - No size bound; the key space is the set of ASNs and IPs queried
//! - Expiry is driven by an injectable [`Clock`]
//!
//! Concurrent misses on the same key are not coalesced: each caller fetches
//! upstream and the last `set` wins.
//!
//! # Examples
//!
//! ```
//! use v6req_cache::TtlCache;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let cache: TtlCache<Vec<String>> = TtlCache::new();
//!
//! cache
//!     .set("asn_64500", vec!["2001:db8::/32".to_string()], Duration::from_secs(3600))
//!     .await;
//!
//! let cached = cache.get("asn_64500").await;
//! assert_eq!(cached, Some(vec!["2001:db8::/32".to_string()]));
//!
//! let stats = cache.stats().await;
//! println!("Hit rate: {:.1}%", stats.hit_rate());
//! # }
//! ```

mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Cached value with its origin and TTL
#[derive(Clone, Debug)]
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) < self.ttl
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads served from a live entry
    pub hits: u64,
    /// Reads that found nothing, or only an expired entry
    pub misses: u64,
    /// Entries currently stored, expired ones included
    pub size: usize,
}

impl CacheStats {
    /// Calculate hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Typed key → value cache with per-entry TTL
///
/// Values are cloned out on read; callers never hold a reference into the
/// map. Share one instance across tasks with `Arc`.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone> TtlCache<V> {
    /// Create an empty cache driven by the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty cache driven by `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Get a live value
    ///
    /// Returns `None` if the key was never set or its entry has outlived
    /// its TTL.
    pub async fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let entries = self.entries.read().await;

        match entries.get(key) {
            Some(entry) if entry.is_live(now) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert or overwrite a value
    ///
    /// The entry's origin is the clock's current time.
    pub async fn set(&self, key: &str, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            stored_at: self.clock.now(),
            ttl,
        };
        self.entries.write().await.insert(key.to_string(), entry);
    }

    /// Remove an entry
    pub async fn invalidate(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    /// Remove all entries
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Drop every expired entry, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    /// Number of stored entries, expired ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether nothing is stored, expired entries included
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Get cache statistics
    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: self.len().await,
        }
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
