//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

// == Cache Category ==
/// Kinds of transient entries kept in the ephemeral cache, each with its own TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheCategory {
    /// Availability snapshots and other general entries
    General,
    /// Slot lock projections once confirmed
    Slot,
    /// Memoized assistant responses. Nothing in this crate caches them; the
    /// TTL is configured so a deployment sharing the cache can read it.
    Ai,
}

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// How long a slot lock is held before it lapses, in minutes
    pub lock_duration_minutes: i64,
    /// Expiry sweeper interval in seconds
    pub sweeper_interval: u64,
    /// Cache reaper interval in seconds
    pub cache_cleanup_interval: u64,
    /// TTL in seconds for general cache entries
    pub cache_ttl_general: u64,
    /// TTL in seconds for slot cache entries
    pub cache_ttl_slot: u64,
    /// TTL in seconds for assistant cache entries
    pub cache_ttl_ai: u64,
    /// Attempts per post-commit notification job
    pub notification_max_attempts: u32,
    /// Optional JSON file used to seed sellers and schedules
    pub seed_file: Option<PathBuf>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `LOCK_DURATION_MINUTES` - Lock hold time (default: 5)
    /// - `SWEEPER_INTERVAL_SECS` - Expiry sweep frequency (default: 60)
    /// - `CACHE_CLEANUP_INTERVAL_SECS` - Cache reaper frequency (default: 1)
    /// - `CACHE_TTL_GENERAL` / `CACHE_TTL_SLOT` / `CACHE_TTL_AI` (defaults: 60 / 300 / 30)
    /// - `NOTIFICATION_MAX_ATTEMPTS` - Retries for calendar/email jobs (default: 3)
    /// - `SEED_FILE` - Path to a seed JSON file (default: unset)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            lock_duration_minutes: env_or("LOCK_DURATION_MINUTES", defaults.lock_duration_minutes),
            sweeper_interval: env_or("SWEEPER_INTERVAL_SECS", defaults.sweeper_interval),
            cache_cleanup_interval: env_or(
                "CACHE_CLEANUP_INTERVAL_SECS",
                defaults.cache_cleanup_interval,
            ),
            cache_ttl_general: env_or("CACHE_TTL_GENERAL", defaults.cache_ttl_general),
            cache_ttl_slot: env_or("CACHE_TTL_SLOT", defaults.cache_ttl_slot),
            cache_ttl_ai: env_or("CACHE_TTL_AI", defaults.cache_ttl_ai),
            notification_max_attempts: env_or(
                "NOTIFICATION_MAX_ATTEMPTS",
                defaults.notification_max_attempts,
            ),
            seed_file: env::var("SEED_FILE").ok().filter(|v| !v.is_empty()).map(PathBuf::from),
        }
    }

    /// TTL in seconds for a cache category.
    pub fn cache_ttl(&self, category: CacheCategory) -> u64 {
        match category {
            CacheCategory::General => self.cache_ttl_general,
            CacheCategory::Slot => self.cache_ttl_slot,
            CacheCategory::Ai => self.cache_ttl_ai,
        }
    }

    /// Lock hold time as a chrono duration.
    pub fn lock_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.lock_duration_minutes)
    }
}

fn env_or<T: FromStr>(name: &str, fallback: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(fallback)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            lock_duration_minutes: 5,
            sweeper_interval: 60,
            cache_cleanup_interval: 1,
            cache_ttl_general: 60,
            cache_ttl_slot: 300,
            cache_ttl_ai: 30,
            notification_max_attempts: 3,
            seed_file: None,
        }
    }
}
