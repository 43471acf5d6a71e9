//! Appointment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Durable booking. At most one exists per `(seller_id, start)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub seller_id: String,
    pub buyer_id: String,
    /// Lock this appointment was confirmed from
    pub lock_id: Option<Uuid>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_minutes: i64,
    pub title: String,
    /// Filled in later by the calendar integration
    pub calendar_event_id: Option<String>,
    pub meet_link: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for an appointment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppointment {
    pub seller_id: String,
    pub buyer_id: String,
    pub lock_id: Option<Uuid>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub title: String,
}

impl NewAppointment {
    pub fn into_appointment(self, created_at: DateTime<Utc>) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            duration_minutes: (self.end - self.start).num_minutes(),
            seller_id: self.seller_id,
            buyer_id: self.buyer_id,
            lock_id: self.lock_id,
            start: self.start,
            end: self.end,
            title: self.title,
            calendar_event_id: None,
            meet_link: None,
            created_at,
        }
    }
}

impl Appointment {
    /// Half-open overlap test against `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && self.end > start
    }
}
