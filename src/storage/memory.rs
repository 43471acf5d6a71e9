//! In-process implementation of [`BookingStore`].
//!
//! All tables sit behind one async mutex. Multi-statement operations run
//! through [`Tables::transaction`], which restores a snapshot if any step fails.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc, Weekday};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{BookingStore, SeedData, StoreError, StoreResult};
use crate::clock::SharedClock;
use crate::models::{
    Appointment, LockStatus, NewAppointment, Seller, SlotIdentity, SlotLock, TimeWindow,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    sellers: HashMap<String, Seller>,
    weekly: HashMap<(String, Weekday), Vec<TimeWindow>>,
    overrides: HashMap<(String, NaiveDate), Vec<TimeWindow>>,
    locks: HashMap<Uuid, SlotLock>,
    appointments: HashMap<Uuid, Appointment>,
    /// Unique index on (seller_id, start)
    appointment_starts: HashMap<(String, DateTime<Utc>), Uuid>,
}

impl Tables {
    fn transaction<T, F>(&mut self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Tables) -> StoreResult<T>,
    {
        let snapshot = self.clone();
        let result = f(self);
        if result.is_err() {
            *self = snapshot;
        }
        result
    }

    fn insert_lock(&mut self, lock: SlotLock) -> StoreResult<SlotLock> {
        let identity = lock.identity();
        let taken = self
            .locks
            .values()
            .any(|l| l.status != LockStatus::Cancelled && l.identity() == identity);
        if taken {
            return Err(StoreError::UniqueViolation(format!("slot lock {}", identity)));
        }
        self.locks.insert(lock.id, lock.clone());
        Ok(lock)
    }

    fn update_lock_status(
        &mut self,
        lock_id: Uuid,
        from: LockStatus,
        to: LockStatus,
    ) -> StoreResult<SlotLock> {
        match self.locks.get_mut(&lock_id) {
            Some(lock) if lock.status == from => {
                lock.status = to;
                Ok(lock.clone())
            }
            Some(lock) => Err(StoreError::ConditionFailed(format!(
                "lock {} is {}, expected {}",
                lock_id, lock.status, from
            ))),
            None => Err(StoreError::NotFound(format!("lock {}", lock_id))),
        }
    }

    fn insert_appointment(
        &mut self,
        new: NewAppointment,
        now: DateTime<Utc>,
    ) -> StoreResult<Appointment> {
        let key = (new.seller_id.clone(), new.start);
        if self.appointment_starts.contains_key(&key) {
            return Err(StoreError::UniqueViolation(format!(
                "appointment for seller {} at {}",
                new.seller_id,
                new.start.to_rfc3339()
            )));
        }
        let appointment = new.into_appointment(now);
        self.appointment_starts.insert(key, appointment.id);
        self.appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    fn cancel_locked_where<P>(&mut self, mut predicate: P) -> Vec<SlotLock>
    where
        P: FnMut(&SlotLock) -> bool,
    {
        let mut cancelled = Vec::new();
        for lock in self.locks.values_mut() {
            if lock.status == LockStatus::Locked && predicate(lock) {
                lock.status = LockStatus::Cancelled;
                cancelled.push(lock.clone());
            }
        }
        cancelled
    }
}

// == Memory Store ==
#[derive(Debug)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    clock: SharedClock,
    #[cfg(test)]
    offline: std::sync::atomic::AtomicBool,
}

impl MemoryStore {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            clock,
            #[cfg(test)]
            offline: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Registers or replaces a seller.
    pub async fn add_seller(&self, seller: Seller) {
        let mut tables = self.tables.lock().await;
        tables.sellers.insert(seller.id.clone(), seller);
    }

    /// Sets the recurring windows for one weekday.
    pub async fn set_weekly_availability(
        &self,
        seller_id: &str,
        weekday: Weekday,
        windows: Vec<TimeWindow>,
    ) {
        let mut tables = self.tables.lock().await;
        tables.weekly.insert((seller_id.to_string(), weekday), windows);
    }

    /// Overrides a single date. An empty list closes the day.
    pub async fn set_date_override(&self, seller_id: &str, date: NaiveDate, windows: Vec<TimeWindow>) {
        let mut tables = self.tables.lock().await;
        tables.overrides.insert((seller_id.to_string(), date), windows);
    }

    /// Loads sellers and schedules from seed data.
    pub async fn apply_seed(&self, seed: SeedData) -> usize {
        let count = seed.sellers.len();
        for entry in seed.sellers {
            let id = entry.seller.id.clone();
            self.add_seller(entry.seller).await;
            for rule in entry.weekly {
                self.set_weekly_availability(&id, rule.weekday, rule.windows).await;
            }
            for rule in entry.overrides {
                self.set_date_override(&id, rule.date, rule.windows).await;
            }
        }
        count
    }

    #[cfg(test)]
    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline
            .store(offline, std::sync::atomic::Ordering::SeqCst);
    }

    fn check_online(&self) -> StoreResult<()> {
        #[cfg(test)]
        if self.offline.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(StoreError::Backend("store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn find_seller(&self, seller_id: &str) -> StoreResult<Option<Seller>> {
        self.check_online()?;
        Ok(self.tables.lock().await.sellers.get(seller_id).cloned())
    }

    async fn find_lock(&self, lock_id: Uuid) -> StoreResult<Option<SlotLock>> {
        self.check_online()?;
        Ok(self.tables.lock().await.locks.get(&lock_id).cloned())
    }

    async fn find_active_lock(
        &self,
        identity: &SlotIdentity,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<SlotLock>> {
        self.check_online()?;
        let tables = self.tables.lock().await;
        Ok(tables
            .locks
            .values()
            .find(|l| l.is_active_at(now) && &l.identity() == identity)
            .cloned())
    }

    async fn create_lock(&self, lock: SlotLock) -> StoreResult<SlotLock> {
        self.check_online()?;
        self.tables.lock().await.insert_lock(lock)
    }

    async fn transition_lock(
        &self,
        lock_id: Uuid,
        from: LockStatus,
        to: LockStatus,
    ) -> StoreResult<Option<SlotLock>> {
        self.check_online()?;
        let mut tables = self.tables.lock().await;
        match tables.update_lock_status(lock_id, from, to) {
            Ok(lock) => Ok(Some(lock)),
            Err(StoreError::ConditionFailed(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn cancel_stale_locks_for(
        &self,
        identity: &SlotIdentity,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<SlotLock>> {
        self.check_online()?;
        let mut tables = self.tables.lock().await;
        Ok(tables.cancel_locked_where(|l| l.expires_at <= now && &l.identity() == identity))
    }

    async fn cancel_expired_locks(&self, now: DateTime<Utc>) -> StoreResult<Vec<SlotLock>> {
        self.check_online()?;
        let mut tables = self.tables.lock().await;
        Ok(tables.cancel_locked_where(|l| l.expires_at <= now))
    }

    async fn find_appointment(&self, appointment_id: Uuid) -> StoreResult<Option<Appointment>> {
        self.check_online()?;
        Ok(self.tables.lock().await.appointments.get(&appointment_id).cloned())
    }

    async fn find_appointment_at(
        &self,
        seller_id: &str,
        start: DateTime<Utc>,
    ) -> StoreResult<Option<Appointment>> {
        self.check_online()?;
        let tables = self.tables.lock().await;
        Ok(tables
            .appointment_starts
            .get(&(seller_id.to_string(), start))
            .and_then(|id| tables.appointments.get(id))
            .cloned())
    }

    async fn appointments_between(
        &self,
        seller_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Appointment>> {
        self.check_online()?;
        let tables = self.tables.lock().await;
        let mut found: Vec<Appointment> = tables
            .appointments
            .values()
            .filter(|a| a.seller_id == seller_id && a.overlaps(from, to))
            .cloned()
            .collect();
        found.sort_by_key(|a| a.start);
        Ok(found)
    }

    async fn commit_confirmation(
        &self,
        lock_id: Uuid,
        appointment: NewAppointment,
    ) -> StoreResult<(SlotLock, Appointment)> {
        self.check_online()?;
        let now = self.clock.now();
        let mut tables = self.tables.lock().await;
        tables.transaction(|tx| {
            let lock = tx.update_lock_status(lock_id, LockStatus::Locked, LockStatus::Confirmed)?;
            let appointment = tx.insert_appointment(appointment, now)?;
            Ok((lock, appointment))
        })
    }

    async fn insert_appointment(&self, appointment: NewAppointment) -> StoreResult<Appointment> {
        self.check_online()?;
        let now = self.clock.now();
        self.tables.lock().await.insert_appointment(appointment, now)
    }

    async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
    ) -> StoreResult<(Appointment, Option<SlotLock>)> {
        self.check_online()?;
        let mut tables = self.tables.lock().await;
        tables.transaction(|tx| {
            let appointment = tx
                .appointments
                .remove(&appointment_id)
                .ok_or_else(|| StoreError::NotFound(format!("appointment {}", appointment_id)))?;
            tx.appointment_starts
                .remove(&(appointment.seller_id.clone(), appointment.start));

            let lock = match appointment.lock_id {
                Some(lock_id) => Some(tx.update_lock_status(
                    lock_id,
                    LockStatus::Confirmed,
                    LockStatus::Cancelled,
                )?),
                None => None,
            };
            Ok((appointment, lock))
        })
    }

    async fn weekly_availability(
        &self,
        seller_id: &str,
        weekday: Weekday,
    ) -> StoreResult<Vec<TimeWindow>> {
        self.check_online()?;
        let tables = self.tables.lock().await;
        Ok(tables
            .weekly
            .get(&(seller_id.to_string(), weekday))
            .cloned()
            .unwrap_or_default())
    }

    async fn date_override(
        &self,
        seller_id: &str,
        date: NaiveDate,
    ) -> StoreResult<Option<Vec<TimeWindow>>> {
        self.check_online()?;
        let tables = self.tables.lock().await;
        Ok(tables.overrides.get(&(seller_id.to_string(), date)).cloned())
    }
}
