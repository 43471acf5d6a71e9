//! Cache Module
//!
//! Provides the in-process ephemeral cache with per-key TTL, atomic
//! check-and-set and pattern invalidation.

mod entry;
mod pattern;
mod stats;
mod store;


use std::sync::Arc;

use tokio::sync::RwLock;

// Re-export public types
pub use entry::CacheEntry;
pub use pattern::matches_pattern;
pub use stats::CacheStats;
pub use store::{CacheStore, ExpiredKey};

/// Cache handle shared between the lock manager, resolver and background tasks.
pub type SharedCache = Arc<RwLock<CacheStore>>;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB

/// Capacity of the expiry notification channel
pub const EXPIRY_CHANNEL_CAPACITY: usize = 256;
