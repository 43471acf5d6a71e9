//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with TTL expiration.
//! Values are handed out as owned copies; callers never alias stored data.

use std::collections::HashMap;

use tokio::sync::broadcast;
use tracing::debug;

use crate::cache::{
    matches_pattern, CacheEntry, CacheStats, EXPIRY_CHANNEL_CAPACITY, MAX_KEY_LENGTH,
    MAX_VALUE_SIZE,
};
use crate::clock::SharedClock;
use crate::error::{BookingError, Result};

// == Expiry Notification ==
/// Published whenever an entry is removed because its TTL elapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiredKey {
    pub key: String,
    /// Time the entry was reaped (Unix milliseconds)
    pub reaped_at: u64,
}

// == Cache Store ==
/// TTL key-value storage with atomic check-and-set.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Performance statistics
    stats: CacheStats,
    /// Default TTL in seconds for entries without explicit TTL
    default_ttl: u64,
    /// Time source
    clock: SharedClock,
    /// Expiry notifications
    expired_tx: broadcast::Sender<ExpiredKey>,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore.
    ///
    /// # Arguments
    /// * `clock` - Time source used for TTL bookkeeping
    /// * `default_ttl` - Default TTL in seconds for entries without explicit TTL
    pub fn new(clock: SharedClock, default_ttl: u64) -> Self {
        let (expired_tx, _) = broadcast::channel(EXPIRY_CHANNEL_CAPACITY);
        Self {
            entries: HashMap::new(),
            stats: CacheStats::new(),
            default_ttl,
            clock,
            expired_tx,
        }
    }

    /// Subscribes to expiry notifications.
    pub fn subscribe_expirations(&self) -> broadcast::Receiver<ExpiredKey> {
        self.expired_tx.subscribe()
    }

    fn validate(key: &str, value: &str) -> Result<()> {
        if key.is_empty() {
            return Err(BookingError::InvalidRequest("Key cannot be empty".to_string()));
        }
        if key.len() > MAX_KEY_LENGTH {
            return Err(BookingError::InvalidRequest(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            )));
        }
        if value.len() > MAX_VALUE_SIZE {
            return Err(BookingError::InvalidRequest(format!(
                "Value exceeds maximum size of {} bytes",
                MAX_VALUE_SIZE
            )));
        }
        Ok(())
    }

    // Drops `key` if it is present but expired, publishing the expiry.
    fn evict_if_expired(&mut self, key: &str, now: u64) {
        let expired = self
            .entries
            .get(key)
            .map(|entry| entry.is_expired(now))
            .unwrap_or(false);
        if expired {
            self.entries.remove(key);
            self.stats.record_expirations(1);
            self.stats.set_total_entries(self.entries.len());
            self.notify_expired(key.to_string(), now);
        }
    }

    fn notify_expired(&self, key: String, now: u64) {
        // No subscribers is fine
        let _ = self.expired_tx.send(ExpiredKey { key, reaped_at: now });
    }

    // == Set ==
    /// Stores a key-value pair, overwriting any existing entry and resetting its TTL.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store
    /// * `ttl` - Optional TTL in seconds (uses default_ttl if None)
    pub fn set(&mut self, key: String, value: String, ttl: Option<u64>) -> Result<()> {
        Self::validate(&key, &value)?;

        let entry = CacheEntry::new(value, self.clock.now_ms(), ttl.unwrap_or(self.default_ttl));
        self.entries.insert(key, entry);
        self.stats.set_total_entries(self.entries.len());

        Ok(())
    }

    // == Set If Absent ==
    /// Inserts the entry only if no live entry exists for `key`.
    ///
    /// Check and insert happen under the same `&mut self` borrow, so with the
    /// store behind a write lock this is a single atomic compare-and-swap.
    /// Returns `true` if the entry was inserted.
    pub fn set_if_absent(&mut self, key: String, value: String, ttl: Option<u64>) -> Result<bool> {
        Self::validate(&key, &value)?;

        let now = self.clock.now_ms();
        self.evict_if_expired(&key, now);
        if self.entries.contains_key(&key) {
            self.stats.record_contention();
            return Ok(false);
        }

        let entry = CacheEntry::new(value, now, ttl.unwrap_or(self.default_ttl));
        self.entries.insert(key, entry);
        self.stats.set_total_entries(self.entries.len());
        Ok(true)
    }

    // == Replace ==
    /// Overwrites a live entry. Returns `false` if the key is absent or expired.
    pub fn replace(&mut self, key: &str, value: String, ttl: Option<u64>) -> Result<bool> {
        Self::validate(key, &value)?;

        let now = self.clock.now_ms();
        self.evict_if_expired(key, now);
        match self.entries.get_mut(key) {
            Some(entry) => {
                *entry = CacheEntry::new(value, now, ttl.unwrap_or(self.default_ttl));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // == Get ==
    /// Retrieves an owned copy of the value for `key`.
    ///
    /// Expired entries are removed and counted as misses.
    pub fn get(&mut self, key: &str) -> Option<String> {
        let now = self.clock.now_ms();
        self.evict_if_expired(key, now);

        match self.entries.get(key) {
            Some(entry) => {
                self.stats.record_hit();
                Some(entry.value.clone())
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Delete ==
    /// Removes an entry by key. Returns `true` if something was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.stats.set_total_entries(self.entries.len());
        }
        removed
    }

    // == Delete If ==
    /// Removes the entry only if its current value satisfies `predicate`.
    pub fn delete_if<F>(&mut self, key: &str, predicate: F) -> bool
    where
        F: FnOnce(&str) -> bool,
    {
        let now = self.clock.now_ms();
        self.evict_if_expired(key, now);

        let matches = self
            .entries
            .get(key)
            .map(|entry| predicate(&entry.value))
            .unwrap_or(false);
        if matches {
            self.delete(key)
        } else {
            false
        }
    }

    // == Delete By Pattern ==
    /// Removes every entry whose key matches a prefix or `*` glob.
    ///
    /// Returns the number of entries removed.
    pub fn delete_by_pattern(&mut self, pattern: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !matches_pattern(pattern, key));
        let removed = before - self.entries.len();

        if removed > 0 {
            debug!("Cache invalidated {} entries matching '{}'", removed, pattern);
            self.stats.set_total_entries(self.entries.len());
        }
        removed
    }

    // == Remaining TTL ==
    /// Seconds until `key` expires, or None if the key is absent or expired.
    pub fn remaining_ttl(&self, key: &str) -> Option<u64> {
        let now = self.clock.now_ms();
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.ttl_remaining(now))
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache, publishing each one.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired_keys.len();

        for key in expired_keys {
            self.entries.remove(&key);
            self.notify_expired(key, now);
        }

        self.stats.record_expirations(count);
        self.stats.set_total_entries(self.entries.len());
        count
    }

    // == Length ==
    /// Returns the current number of entries in the cache, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
