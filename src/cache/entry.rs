//! Cache Entry Module
//!
//! A stored value and the instant it lapses. Every entry carries a TTL.

// == Cache Entry ==
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: String,
    /// Unix milliseconds at which the entry stops being visible
    pub expires_at: u64,
}

impl CacheEntry {
    /// Stamps `value` to lapse `ttl_seconds` after `now_ms`.
    pub fn new(value: String, now_ms: u64, ttl_seconds: u64) -> Self {
        Self {
            value,
            expires_at: now_ms.saturating_add(ttl_seconds.saturating_mul(1000)),
        }
    }

    /// Expired once `now_ms` reaches `expires_at`.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }

    pub fn ttl_remaining_ms(&self, now_ms: u64) -> u64 {
        self.expires_at.saturating_sub(now_ms)
    }

    /// Remaining TTL rounded up to whole seconds, as reported to callers.
    pub fn ttl_remaining(&self, now_ms: u64) -> u64 {
        self.ttl_remaining_ms(now_ms).div_ceil(1000)
    }
}
