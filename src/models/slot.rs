//! Slot lock model
//!
//! A lock is one buyer's time-boxed claim on one seller's slot, identified by
//! `slot:{seller_id}:{date}:{start_time}`.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BookingError, Result};

/// Date format used in slot identities and the HTTP surface.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Time-of-day format used in slot identities.
pub const TIME_FORMAT: &str = "%H:%M";

/// Parses a `YYYY-MM-DD` calendar day.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|_| BookingError::InvalidRequest(format!("Invalid date '{}', expected YYYY-MM-DD", raw)))
}

/// Parses an `HH:MM` local time of day. `HH:MM:00` is accepted; any other
/// seconds value is rejected since slot identities have minute precision.
pub fn parse_time(raw: &str) -> Result<NaiveTime> {
    let invalid = || BookingError::InvalidRequest(format!("Invalid time '{}', expected HH:MM", raw));
    let time = NaiveTime::parse_from_str(raw, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| invalid())?;
    if time.second() != 0 || time.nanosecond() != 0 {
        return Err(invalid());
    }
    Ok(time)
}

/// Drops seconds and sub-second parts.
fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

// == Lock Status ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockStatus {
    Locked,
    Confirmed,
    Cancelled,
}

impl LockStatus {
    /// CONFIRMED and CANCELLED locks can no longer be confirmed or released by the buyer.
    pub fn is_terminal(self) -> bool {
        !matches!(self, LockStatus::Locked)
    }
}

impl fmt::Display for LockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LockStatus::Locked => "LOCKED",
            LockStatus::Confirmed => "CONFIRMED",
            LockStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

// == Slot Identity ==
/// Composite identity of a slot: seller, calendar day and local start time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotIdentity {
    pub seller_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
}

impl SlotIdentity {
    /// The start time is truncated to the minute so that two identities are
    /// equal exactly when their cache keys are.
    pub fn new(seller_id: impl Into<String>, date: NaiveDate, start_time: NaiveTime) -> Self {
        Self {
            seller_id: seller_id.into(),
            date,
            start_time: truncate_to_minute(start_time),
        }
    }

    /// Builds an identity from raw path/body strings.
    pub fn parse(seller_id: &str, date: &str, start_time: &str) -> Result<Self> {
        if seller_id.is_empty() {
            return Err(BookingError::InvalidRequest("Seller id cannot be empty".to_string()));
        }
        Ok(Self::new(seller_id, parse_date(date)?, parse_time(start_time)?))
    }

    /// Cache key, e.g. `slot:seller1:2025-09-16:10:00`.
    pub fn cache_key(&self) -> String {
        format!(
            "slot:{}:{}:{}",
            self.seller_id,
            self.date.format(DATE_FORMAT),
            self.start_time.format(TIME_FORMAT)
        )
    }
}

impl fmt::Display for SlotIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cache_key())
    }
}

// == Slot Lock ==
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotLock {
    pub id: Uuid,
    pub seller_id: String,
    pub buyer_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: LockStatus,
    pub locked_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SlotLock {
    /// Creates a fresh LOCKED lock owned by `buyer_id`.
    pub fn new(
        identity: &SlotIdentity,
        end_time: NaiveTime,
        buyer_id: impl Into<String>,
        locked_at: DateTime<Utc>,
        hold: chrono::Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            seller_id: identity.seller_id.clone(),
            buyer_id: buyer_id.into(),
            date: identity.date,
            start_time: identity.start_time,
            end_time,
            status: LockStatus::Locked,
            locked_at,
            expires_at: locked_at + hold,
        }
    }

    pub fn identity(&self) -> SlotIdentity {
        SlotIdentity::new(self.seller_id.clone(), self.date, self.start_time)
    }

    pub fn is_owned_by(&self, buyer_id: &str) -> bool {
        self.buyer_id == buyer_id
    }

    /// LOCKED and past its expiry.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == LockStatus::Locked && self.expires_at <= now
    }

    /// Blocks the identity: CONFIRMED, or LOCKED and not yet expired.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            LockStatus::Confirmed => true,
            LockStatus::Locked => self.expires_at > now,
            LockStatus::Cancelled => false,
        }
    }
}
