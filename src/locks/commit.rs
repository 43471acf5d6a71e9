//! Turning a held lock into a durable appointment, and undoing it.

use tracing::{info, warn};
use uuid::Uuid;

use super::{encode, slot_bounds, ConfirmedBooking, LockManager};
use crate::error::{BookingError, Result};
use crate::models::{Appointment, NewAppointment};
use crate::storage::StoreError;

impl LockManager {
    // == Confirm ==
    /// Confirms a LOCKED hold and creates its appointment in one transaction.
    ///
    /// A lock found past its expiry is cancelled durably before `Expired` is
    /// returned. On a uniqueness conflict the transaction rolls back and the
    /// lock stays LOCKED. Calendar and email jobs are queued only after commit.
    pub async fn confirm(
        &self,
        lock_id: Uuid,
        buyer_id: &str,
        title: &str,
    ) -> Result<ConfirmedBooking> {
        let title = title.trim();
        if title.is_empty() {
            return Err(BookingError::InvalidRequest("Title cannot be empty".to_string()));
        }

        let lock = self
            .store
            .find_lock(lock_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("lock {}", lock_id)))?;

        if !lock.is_owned_by(buyer_id) {
            return Err(BookingError::Forbidden(format!(
                "lock {} is not owned by {}",
                lock.id, buyer_id
            )));
        }
        if lock.status.is_terminal() {
            return Err(BookingError::InvalidState(format!(
                "lock {} is {}",
                lock.id, lock.status
            )));
        }

        let now = self.clock.now();
        if lock.is_expired_at(now) {
            self.expire(lock.id).await?;
            return Err(BookingError::Expired(format!(
                "lock {} lapsed at {}",
                lock.id,
                lock.expires_at.to_rfc3339()
            )));
        }

        let seller = self
            .store
            .find_seller(&lock.seller_id)
            .await?
            .ok_or_else(|| BookingError::SellerNotFound(lock.seller_id.clone()))?;
        let (start, end) = slot_bounds(&seller, lock.date, lock.start_time, lock.end_time)?;

        let new_appointment = NewAppointment {
            seller_id: lock.seller_id.clone(),
            buyer_id: lock.buyer_id.clone(),
            lock_id: Some(lock.id),
            start,
            end,
            title: title.to_string(),
        };

        let (confirmed, appointment) = match self
            .store
            .commit_confirmation(lock.id, new_appointment)
            .await
        {
            Ok(committed) => committed,
            Err(StoreError::UniqueViolation(what)) => {
                warn!(lock_id = %lock.id, "Confirm rolled back: {}", what);
                return Err(BookingError::Conflict(format!(
                    "{} is already booked",
                    lock.identity()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        // Past the commit point: cache and notification trouble is logged, not returned.
        let key = confirmed.identity().cache_key();
        match encode(&confirmed) {
            Ok(raw) => {
                let ttl = Some(self.settings.confirmed_ttl);
                let mut cache = self.cache.write().await;
                let refreshed = match cache.replace(&key, raw.clone(), ttl) {
                    Ok(true) => Ok(()),
                    // Projection already gone; recreate it
                    Ok(false) => cache.set(key.clone(), raw, ttl),
                    Err(e) => Err(e),
                };
                if let Err(e) = refreshed {
                    warn!("Could not refresh projection for {}: {}", key, e);
                }
            }
            Err(e) => warn!("Could not encode projection for {}: {}", key, e),
        }
        self.invalidate_availability(&confirmed.seller_id).await;
        self.notifications.enqueue_booking(&appointment);

        info!(
            lock_id = %confirmed.id,
            appointment_id = %appointment.id,
            "Confirmed {} for buyer {}",
            key,
            confirmed.buyer_id
        );

        Ok(ConfirmedBooking {
            appointment,
            lock: confirmed,
        })
    }

    // == Cancel Appointment ==
    /// Removes an appointment and frees its slot identity.
    ///
    /// Either the appointment's buyer or its seller may cancel.
    pub async fn cancel_appointment(&self, appointment_id: Uuid, user_id: &str) -> Result<Appointment> {
        let appointment = self
            .store
            .find_appointment(appointment_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("appointment {}", appointment_id)))?;

        if appointment.buyer_id != user_id && appointment.seller_id != user_id {
            return Err(BookingError::Forbidden(format!(
                "appointment {} does not belong to {}",
                appointment_id, user_id
            )));
        }

        let (appointment, lock) = self.store.cancel_appointment(appointment_id).await?;
        if let Some(lock) = &lock {
            self.drop_projection(lock).await;
        }
        self.invalidate_availability(&appointment.seller_id).await;

        info!(
            appointment_id = %appointment.id,
            "Cancelled appointment for seller {} at {}",
            appointment.seller_id,
            appointment.start.to_rfc3339()
        );
        Ok(appointment)
    }
}
