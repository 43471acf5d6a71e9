//! Slot Lock - short-lived buyer holds on seller booking slots
//!
//! Buyers lock a slot for a few minutes, then confirm it into an appointment.
//! Locks live in a TTL cache for fast exclusion and in a durable store for
//! confirmation and expiry sweeping.

pub mod api;
pub mod availability;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod locks;
pub mod models;
pub mod notify;
pub mod storage;
pub mod tasks;

#[cfg(test)]
mod testing;

pub use api::AppState;
pub use config::Config;
pub use error::{BookingError, Result};
pub use locks::LockManager;
pub use tasks::{spawn_cleanup_task, spawn_sweeper_task};
