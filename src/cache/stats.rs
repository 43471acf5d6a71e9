//! Counters reported by `GET /stats`.

use serde::Serialize;

/// Snapshot of cache counters. `total_entries` is refreshed on every write.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    /// Lookups that found nothing, including lazily evicted entries
    pub misses: u64,
    /// Entries dropped because their TTL lapsed
    pub expirations: u64,
    /// `set_if_absent` calls that lost to a live entry
    pub contended: u64,
    pub total_entries: usize,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// hits / (hits + misses); 0.0 before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        match self.hits + self.misses {
            0 => 0.0,
            lookups => self.hits as f64 / lookups as f64,
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    pub fn record_contention(&mut self) {
        self.contended += 1;
    }

    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
