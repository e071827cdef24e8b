//! In-memory TTL cache shared by concurrent callers.
//!
//! Expired entries are dropped lazily on read, swept on the first insert
//! after the earliest known expiry, or by an explicit
//! [`TtlCache::purge_expired`]. Expiry uses tokio's clock so paused-time tests
//! can move it forward.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

#[derive(Debug)]
pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    /// Earliest expiry among stored entries; may lag behind and point too early.
    next_expiry: Mutex<Option<Instant>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V> Default for TtlCache<V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            next_expiry: Mutex::new(None),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a live entry, counting the lookup as a hit or a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();

        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if entry.expires_at > now => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(entry.value.clone());
                }
                Some(_) => {}
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    return None;
                }
            }
        }

        // Entry exists but has expired.
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|e| e.expires_at <= now) {
            entries.remove(key);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store `value` for `ttl`. Sweeps expired entries first once anything
    /// stored may have expired, so keys that are never read again still go.
    pub fn insert(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let now = Instant::now();
        let expires_at = now + ttl;

        let mut entries = self.entries.write();
        let mut next_expiry = self.next_expiry.lock();

        if (*next_expiry).is_some_and(|at| at <= now) {
            let removed = sweep(&mut entries, &mut next_expiry, now);
            if removed > 0 {
                tracing::debug!(removed, remaining = entries.len(), "swept expired cache entries");
            }
        }

        entries.insert(key.into(), CacheEntry { value, expires_at });
        *next_expiry = Some((*next_expiry).map_or(expires_at, |at| at.min(expires_at)));
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write();
        let mut next_expiry = self.next_expiry.lock();
        sweep(&mut entries, &mut next_expiry, Instant::now())
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write();
        entries.clear();
        *self.next_expiry.lock() = None;
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

fn sweep<V>(
    entries: &mut HashMap<String, CacheEntry<V>>,
    next_expiry: &mut Option<Instant>,
    now: Instant,
) -> usize {
    let before = entries.len();
    entries.retain(|_, e| e.expires_at > now);
    *next_expiry = entries.values().map(|e| e.expires_at).min();
    before - entries.len()
}
