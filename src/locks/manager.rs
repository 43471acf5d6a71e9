use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, NaiveTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{decode, encode, slot_bounds, LockGrant, LockStatusView, SweepReport};
use crate::availability::snapshot_pattern;
use crate::cache::SharedCache;
use crate::clock::SharedClock;
use crate::config::{CacheCategory, Config};
use crate::error::{BookingError, Result};
use crate::models::{LockStatus, SlotIdentity, SlotLock};
use crate::notify::NotificationQueue;
use crate::storage::{BookingStore, StoreError};

/// Timing knobs for the lock manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockSettings {
    /// How long a LOCKED hold lives
    pub lock_duration: Duration,
    /// Cache TTL in seconds for a CONFIRMED projection
    pub confirmed_ttl: u64,
}

impl LockSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            lock_duration: config.lock_duration(),
            confirmed_ttl: config.cache_ttl(CacheCategory::Slot),
        }
    }
}

impl Default for LockSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

// == Lock Manager ==
/// Owns every transition of a slot lock.
pub struct LockManager {
    pub(super) store: Arc<dyn BookingStore>,
    pub(super) cache: SharedCache,
    pub(super) clock: SharedClock,
    pub(super) notifications: NotificationQueue,
    pub(super) settings: LockSettings,
}

impl LockManager {
    pub fn new(
        store: Arc<dyn BookingStore>,
        cache: SharedCache,
        clock: SharedClock,
        notifications: NotificationQueue,
        settings: LockSettings,
    ) -> Self {
        Self {
            store,
            cache,
            clock,
            notifications,
            settings,
        }
    }

    // == Cache projection ==

    pub(super) async fn cached_lock(&self, key: &str) -> Option<SlotLock> {
        let raw = self.cache.write().await.get(key)?;
        decode(&raw)
    }

    /// Removes the projection for `lock`, leaving any other lock's entry alone.
    pub(super) async fn drop_projection(&self, lock: &SlotLock) -> bool {
        let id = lock.id;
        self.cache
            .write()
            .await
            .delete_if(&lock.identity().cache_key(), |raw| {
                decode(raw).map(|cached| cached.id == id).unwrap_or(false)
            })
    }

    pub(super) async fn invalidate_availability(&self, seller_id: &str) {
        self.cache
            .write()
            .await
            .delete_by_pattern(&snapshot_pattern(seller_id));
    }

    // == Acquire ==
    /// Places a LOCKED hold on `identity` for `buyer_id`.
    ///
    /// # Errors
    /// - `SellerNotFound` if the seller is unknown or not a seller
    /// - `AlreadyBooked` if an appointment or confirmed lock occupies the slot
    /// - `AlreadyLocked` if another live hold exists
    pub async fn acquire(
        &self,
        identity: SlotIdentity,
        end_time: NaiveTime,
        buyer_id: &str,
    ) -> Result<LockGrant> {
        if buyer_id.is_empty() {
            return Err(BookingError::InvalidRequest("Buyer id cannot be empty".to_string()));
        }

        let seller = self
            .store
            .find_seller(&identity.seller_id)
            .await?
            .filter(|s| s.is_seller())
            .ok_or_else(|| BookingError::SellerNotFound(identity.seller_id.clone()))?;
        let (start, _end) = slot_bounds(&seller, identity.date, identity.start_time, end_time)?;

        let key = identity.cache_key();
        let now = self.clock.now();

        if let Some(existing) = self.cached_lock(&key).await {
            match existing.status {
                LockStatus::Confirmed => return Err(BookingError::AlreadyBooked(key)),
                LockStatus::Locked if existing.is_active_at(now) => {
                    return Err(BookingError::AlreadyLocked(key))
                }
                _ => {}
            }
        }

        if self
            .store
            .find_appointment_at(&identity.seller_id, start)
            .await?
            .is_some()
        {
            return Err(BookingError::AlreadyBooked(key));
        }

        let lock = SlotLock::new(&identity, end_time, buyer_id, now, self.settings.lock_duration);
        let ttl = self.settings.lock_duration.num_seconds().max(1) as u64;
        let won = self
            .cache
            .write()
            .await
            .set_if_absent(key.clone(), encode(&lock)?, Some(ttl))?;

        if !won {
            return match self.cached_lock(&key).await {
                Some(winner) if winner.status == LockStatus::Confirmed => {
                    Err(BookingError::AlreadyBooked(key))
                }
                _ => Err(BookingError::AlreadyLocked(key)),
            };
        }

        if let Err(e) = self.persist_new_lock(&identity, lock.clone()).await {
            self.drop_projection(&lock).await;
            return Err(e);
        }

        self.invalidate_availability(&identity.seller_id).await;
        info!(
            lock_id = %lock.id,
            buyer_id = %lock.buyer_id,
            "Locked {} until {}",
            key,
            lock.expires_at.to_rfc3339()
        );

        Ok(LockGrant {
            lock_id: lock.id,
            key,
            expires_at: lock.expires_at,
        })
    }

    // Writes the durable mirror of a lock that already won the cache.
    async fn persist_new_lock(&self, identity: &SlotIdentity, lock: SlotLock) -> Result<()> {
        let stale = self
            .store
            .cancel_stale_locks_for(identity, self.clock.now())
            .await?;
        if !stale.is_empty() {
            debug!("Cancelled {} stale durable locks for {}", stale.len(), identity);
        }

        match self.store.create_lock(lock).await {
            Ok(_) => Ok(()),
            Err(StoreError::UniqueViolation(_)) => {
                warn!("Durable lock exists for {} without a cache projection", identity);
                Err(BookingError::AlreadyLocked(identity.cache_key()))
            }
            Err(e) => Err(e.into()),
        }
    }

    // == Cancel ==
    /// Cancels a LOCKED hold by lock id.
    ///
    /// # Errors
    /// - `NotFound` if the lock does not exist
    /// - `Forbidden` if `buyer_id` does not own it
    /// - `InvalidState` if it is CONFIRMED or already CANCELLED
    pub async fn cancel(&self, lock_id: Uuid, buyer_id: &str) -> Result<SlotLock> {
        let lock = self
            .store
            .find_lock(lock_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("lock {}", lock_id)))?;

        self.release(lock, buyer_id).await
    }

    // == Unlock By Identity ==
    /// Same as [`cancel`](Self::cancel) but addressed by slot coordinates.
    pub async fn unlock(&self, identity: &SlotIdentity, buyer_id: &str) -> Result<SlotLock> {
        let key = identity.cache_key();
        let lock = match self.cached_lock(&key).await {
            Some(lock) => lock,
            None => self
                .store
                .find_active_lock(identity, self.clock.now())
                .await?
                .ok_or_else(|| BookingError::NotFound(format!("no lock on {}", key)))?,
        };

        // The projection may be stale; the durable row decides.
        let current = self
            .store
            .find_lock(lock.id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("lock {}", lock.id)))?;

        self.release(current, buyer_id).await
    }

    async fn release(&self, lock: SlotLock, buyer_id: &str) -> Result<SlotLock> {
        if !lock.is_owned_by(buyer_id) {
            return Err(BookingError::Forbidden(format!(
                "lock {} is not owned by {}",
                lock.id, buyer_id
            )));
        }

        match lock.status {
            LockStatus::Confirmed => {
                return Err(BookingError::InvalidState(format!(
                    "lock {} is confirmed; cancel the appointment instead",
                    lock.id
                )))
            }
            LockStatus::Cancelled => {
                return Err(BookingError::InvalidState(format!(
                    "lock {} is already cancelled",
                    lock.id
                )))
            }
            LockStatus::Locked => {}
        }

        let cancelled = match self
            .store
            .transition_lock(lock.id, LockStatus::Locked, LockStatus::Cancelled)
            .await?
        {
            Some(cancelled) => cancelled,
            None => {
                let status = self
                    .store
                    .find_lock(lock.id)
                    .await?
                    .map(|l| l.status.to_string())
                    .unwrap_or_else(|| "missing".to_string());
                return Err(BookingError::InvalidState(format!(
                    "lock {} changed to {} during cancel",
                    lock.id, status
                )));
            }
        };

        self.drop_projection(&cancelled).await;
        self.invalidate_availability(&cancelled.seller_id).await;
        info!(lock_id = %cancelled.id, "Cancelled lock on {}", cancelled.identity());

        Ok(cancelled)
    }

    // == Expire ==
    /// Moves a LOCKED hold to CANCELLED. A terminal lock is left as is.
    ///
    /// Returns the cancelled lock, or `None` if nothing changed.
    pub async fn expire(&self, lock_id: Uuid) -> Result<Option<SlotLock>> {
        let expired = self
            .store
            .transition_lock(lock_id, LockStatus::Locked, LockStatus::Cancelled)
            .await?;

        match &expired {
            Some(lock) => {
                self.drop_projection(lock).await;
                self.invalidate_availability(&lock.seller_id).await;
                info!(lock_id = %lock.id, "Expired lock on {}", lock.identity());
            }
            None => debug!(lock_id = %lock_id, "Expire skipped, lock already terminal"),
        }

        Ok(expired)
    }

    // == Status ==
    /// Reports whether `identity` is currently held and by whom.
    pub async fn status(&self, identity: &SlotIdentity) -> Result<LockStatusView> {
        let now = self.clock.now();

        if let Some(lock) = self.cached_lock(&identity.cache_key()).await {
            if lock.is_active_at(now) {
                return Ok(LockStatusView::held(&lock));
            }
        }

        Ok(self
            .store
            .find_active_lock(identity, now)
            .await?
            .map(|lock| LockStatusView::held(&lock))
            .unwrap_or_else(LockStatusView::free))
    }

    // == Sweep ==
    /// Cancels every durable LOCKED row whose expiry has passed.
    pub async fn sweep_expired(&self) -> Result<SweepReport> {
        let cancelled = self.store.cancel_expired_locks(self.clock.now()).await?;

        let mut sellers = HashSet::new();
        for lock in &cancelled {
            self.drop_projection(lock).await;
            sellers.insert(lock.seller_id.clone());
        }
        for seller_id in &sellers {
            self.invalidate_availability(seller_id).await;
        }

        Ok(SweepReport {
            cancelled: cancelled.len(),
        })
    }
}
