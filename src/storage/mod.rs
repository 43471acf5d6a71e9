//! Durable Store Module
//!
//! The authoritative record of locks and appointments. The lock manager,
//! sweeper and availability resolver consume it through [`BookingStore`].

mod memory;
mod seed;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc, Weekday};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Appointment, LockStatus, NewAppointment, Seller, SlotIdentity, SlotLock, TimeWindow,
};

pub use memory::MemoryStore;
pub use seed::{DateOverride, SeedData, SeedSeller, WeeklyRule};

// == Store Error ==
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Referenced row does not exist
    #[error("record not found: {0}")]
    NotFound(String),

    /// Insert would break a uniqueness constraint
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// Conditional update matched no row
    #[error("condition failed: {0}")]
    ConditionFailed(String),

    /// Storage backend failure
    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

// == Booking Store ==
/// Transactional store for sellers, slot locks and appointments.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn find_seller(&self, seller_id: &str) -> StoreResult<Option<Seller>>;

    async fn find_lock(&self, lock_id: Uuid) -> StoreResult<Option<SlotLock>>;

    /// The non-cancelled lock for `identity` that still blocks it at `now`.
    async fn find_active_lock(
        &self,
        identity: &SlotIdentity,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<SlotLock>>;

    /// Inserts a lock. Fails with `UniqueViolation` if a non-cancelled lock
    /// already exists for the same identity.
    async fn create_lock(&self, lock: SlotLock) -> StoreResult<SlotLock>;

    /// Moves a lock from `from` to `to`. Returns the updated lock, or `None`
    /// if the lock was not in `from` (nothing written).
    async fn transition_lock(
        &self,
        lock_id: Uuid,
        from: LockStatus,
        to: LockStatus,
    ) -> StoreResult<Option<SlotLock>>;

    /// Cancels LOCKED rows for `identity` whose expiry has passed.
    async fn cancel_stale_locks_for(
        &self,
        identity: &SlotIdentity,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<SlotLock>>;

    /// Cancels every LOCKED row whose expiry has passed.
    async fn cancel_expired_locks(&self, now: DateTime<Utc>) -> StoreResult<Vec<SlotLock>>;

    async fn find_appointment(&self, appointment_id: Uuid) -> StoreResult<Option<Appointment>>;

    async fn find_appointment_at(
        &self,
        seller_id: &str,
        start: DateTime<Utc>,
    ) -> StoreResult<Option<Appointment>>;

    async fn appointments_between(
        &self,
        seller_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Appointment>>;

    /// One transaction: LOCKED→CONFIRMED on the lock and insert the appointment.
    /// Either both land or neither does.
    async fn commit_confirmation(
        &self,
        lock_id: Uuid,
        appointment: NewAppointment,
    ) -> StoreResult<(SlotLock, Appointment)>;

    /// Inserts an appointment outside the lock flow.
    async fn insert_appointment(&self, appointment: NewAppointment) -> StoreResult<Appointment>;

    /// One transaction: delete the appointment and cancel its confirmed lock.
    async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
    ) -> StoreResult<(Appointment, Option<SlotLock>)>;

    async fn weekly_availability(
        &self,
        seller_id: &str,
        weekday: Weekday,
    ) -> StoreResult<Vec<TimeWindow>>;

    /// `Some(windows)` if the seller overrode this date; an empty list means closed.
    async fn date_override(
        &self,
        seller_id: &str,
        date: NaiveDate,
    ) -> StoreResult<Option<Vec<TimeWindow>>>;
}
