//! Response DTOs for the slot lock API
//!
//! Defines the structure of outgoing HTTP response bodies.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::appointment::Appointment;
use super::slot::{LockStatus, SlotLock};
use crate::availability::AvailabilitySlot;
use crate::cache::CacheStats;
use crate::locks::{ConfirmedBooking, LockGrant};

/// Response body for POST /locks
#[derive(Debug, Clone, Serialize)]
pub struct LockResponse {
    pub message: String,
    pub lock_id: Uuid,
    pub key: String,
    pub expires_at: DateTime<Utc>,
}

impl From<LockGrant> for LockResponse {
    fn from(grant: LockGrant) -> Self {
        Self {
            message: format!("Slot '{}' locked", grant.key),
            lock_id: grant.lock_id,
            key: grant.key,
            expires_at: grant.expires_at,
        }
    }
}

/// Response body for DELETE /locks/:lock_id and DELETE /slots/...
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseResponse {
    pub message: String,
    pub lock_id: Uuid,
    pub status: LockStatus,
}

impl From<SlotLock> for ReleaseResponse {
    fn from(lock: SlotLock) -> Self {
        Self {
            message: format!("Lock '{}' released", lock.id),
            lock_id: lock.id,
            status: lock.status,
        }
    }
}

/// Response body for POST /locks/:lock_id/confirm
#[derive(Debug, Clone, Serialize)]
pub struct ConfirmResponse {
    pub message: String,
    pub lock_id: Uuid,
    pub status: LockStatus,
    pub appointment: Appointment,
}

impl From<ConfirmedBooking> for ConfirmResponse {
    fn from(booking: ConfirmedBooking) -> Self {
        Self {
            message: format!("Appointment '{}' booked", booking.appointment.id),
            lock_id: booking.lock.id,
            status: booking.lock.status,
            appointment: booking.appointment,
        }
    }
}

/// Response body for GET /sellers/:seller_id/availability
#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityResponse {
    pub seller_id: String,
    pub date: NaiveDate,
    pub slots: Vec<AvailabilitySlot>,
}

/// Response body for DELETE /appointments/:appointment_id
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentCancelledResponse {
    pub message: String,
    pub appointment_id: Uuid,
}

impl From<Appointment> for AppointmentCancelledResponse {
    fn from(appointment: Appointment) -> Self {
        Self {
            message: format!("Appointment '{}' cancelled", appointment.id),
            appointment_id: appointment.id,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of entries reaped after their TTL lapsed
    pub expirations: u64,
    /// Conditional inserts that lost to a live entry
    pub contended: u64,
    /// Current number of entries in cache
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            expirations: stats.expirations,
            contended: stats.contended,
            total_entries: stats.total_entries,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy(now: DateTime<Utc>) -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: now.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_lock_response_serialize() {
        let grant = LockGrant {
            lock_id: Uuid::new_v4(),
            key: "slot:seller1:2025-09-16:10:00".to_string(),
            expires_at: Utc.with_ymd_and_hms(2025, 9, 16, 8, 5, 0).unwrap(),
        };
        let json = serde_json::to_string(&LockResponse::from(grant)).unwrap();
        assert!(json.contains("slot:seller1:2025-09-16:10:00"));
        assert!(json.contains("2025-09-16T08:05:00Z"));
    }

    #[test]
    fn test_stats_response_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            expirations: 5,
            contended: 2,
            total_entries: 100,
        };
        let resp = StatsResponse::from(stats);
        assert!((resp.hit_rate - 0.8).abs() < 0.001);
    }

    #[test]
    fn test_stats_response_zero_requests() {
        let resp = StatsResponse::from(CacheStats::new());
        assert_eq!(resp.hit_rate, 0.0);
    }

    #[test]
    fn test_health_response_serialize() {
        let now = Utc.with_ymd_and_hms(2025, 9, 16, 8, 0, 0).unwrap();
        let json = serde_json::to_string(&HealthResponse::healthy(now)).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("2025-09-16T08:00:00+00:00"));
    }
}
