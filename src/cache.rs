use crate::models::{iso_date, Mode};
use chrono::NaiveDate;
use dashmap::DashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Results are served from the cache for this long
pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

/// Identity of a query: equal parameters give equal keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub mode: Mode,
    pub months: u32,
    pub offset: u32,
    pub start_date: NaiveDate,
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "availability_{}_m{}_o{}_d{}",
            self.mode,
            self.months,
            self.offset,
            iso_date(self.start_date)
        )
    }
}

struct CacheEntry<V> {
    payload: V,
    stored_at: Instant,
}

#[derive(Debug, Default)]
struct CacheStats {
    hits: AtomicUsize,
    misses: AtomicUsize,
    expired: AtomicUsize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatsReport {
    pub entries: usize,
    pub hits: usize,
    pub misses: usize,
    pub expired: usize,
}

/// Key-scoped TTL cache. Entries are replaced wholesale, never mutated.
pub struct ResponseCache<K, V> {
    entries: DashMap<K, CacheEntry<V>>,
    ttl: Duration,
    stats: CacheStats,
}

impl<K, V> ResponseCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            stats: CacheStats::default(),
        }
    }

    /// Live entry for `key`; an expired one is evicted and reported as a miss
    pub fn get(&self, key: &K) -> Option<V> {
        let ttl = self.ttl;
        let found = self.entries.get(key).map(|entry| {
            if entry.stored_at.elapsed() >= ttl {
                None
            } else {
                Some(entry.payload.clone())
            }
        });

        match found {
            Some(Some(payload)) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(payload)
            }
            Some(None) => {
                self.entries
                    .remove_if(key, |_, entry| entry.stored_at.elapsed() >= ttl);
                self.stats.expired.fetch_add(1, Ordering::Relaxed);
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, key: K, payload: V) {
        self.entries.insert(
            key,
            CacheEntry {
                payload,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop every expired entry, returning how many went
    pub fn purge_expired(&self) -> usize {
        let ttl = self.ttl;
        let before = self.len();
        self.entries
            .retain(|_, entry| entry.stored_at.elapsed() < ttl);
        let purged = before.saturating_sub(self.len());
        self.stats.expired.fetch_add(purged, Ordering::Relaxed);
        purged
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStatsReport {
        CacheStatsReport {
            entries: self.entries.len(),
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            expired: self.stats.expired.load(Ordering::Relaxed),
        }
    }
}
