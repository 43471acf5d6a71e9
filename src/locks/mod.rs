//! Slot Lock Module
//!
//! Acquire, cancel, confirm and expire buyer-owned holds on seller slots.
//!
//! The cache holds a volatile JSON projection of each live lock under its
//! identity key; acquisition is decided by the cache's atomic check-and-set.
//! The durable store holds the authoritative record used by confirmation and
//! the sweeper, and its `(seller_id, start)` appointment index is the final
//! arbiter against double booking.

mod commit;
mod manager;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{BookingError, Result};
use crate::models::{Appointment, LockStatus, Seller, SlotLock};

pub use manager::{LockManager, LockSettings};

// == Results ==
/// Returned by a successful acquire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockGrant {
    pub lock_id: Uuid,
    pub key: String,
    pub expires_at: DateTime<Utc>,
}

/// Point-in-time view of a slot identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockStatusView {
    pub is_locked: bool,
    pub status: Option<LockStatus>,
    pub owner_id: Option<String>,
    pub lock_id: Option<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl LockStatusView {
    fn free() -> Self {
        Self {
            is_locked: false,
            status: None,
            owner_id: None,
            lock_id: None,
            expires_at: None,
        }
    }

    fn held(lock: &SlotLock) -> Self {
        Self {
            is_locked: true,
            status: Some(lock.status),
            owner_id: Some(lock.buyer_id.clone()),
            lock_id: Some(lock.id),
            expires_at: Some(lock.expires_at),
        }
    }
}

/// Returned by a successful confirm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmedBooking {
    pub appointment: Appointment,
    pub lock: SlotLock,
}

/// Outcome of one sweeper pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub cancelled: usize,
}

// == Helpers ==
fn encode(lock: &SlotLock) -> Result<String> {
    serde_json::to_string(lock).map_err(|e| BookingError::Internal(format!("encode lock: {}", e)))
}

fn decode(raw: &str) -> Option<SlotLock> {
    serde_json::from_str(raw).ok()
}

/// Resolves a seller-local slot to UTC bounds.
pub fn slot_bounds(
    seller: &Seller,
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    if end_time <= start_time {
        return Err(BookingError::InvalidRequest(format!(
            "End time {} must be after start time {}",
            end_time.format("%H:%M"),
            start_time.format("%H:%M")
        )));
    }

    let resolve = |time: NaiveTime| {
        seller
            .timezone
            .from_local_datetime(&date.and_time(time))
            .earliest()
            .map(|local| local.with_timezone(&Utc))
            .ok_or_else(|| {
                BookingError::InvalidRequest(format!(
                    "{} {} does not exist in {}",
                    date,
                    time.format("%H:%M"),
                    seller.timezone
                ))
            })
    };

    Ok((resolve(start_time)?, resolve(end_time)?))
}
