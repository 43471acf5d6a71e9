//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Cache cleanup: reaps expired cache entries and publishes their keys
//! - Expiry sweeper: cancels durable locks whose hold has lapsed

mod cleanup;
mod sweeper;

pub use cleanup::spawn_cleanup_task;
pub use sweeper::{spawn_sweeper_task, SweeperHandle};
