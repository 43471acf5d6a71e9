//! Availability Resolver
//!
//! Computes bookable slots for a seller on one date from recurring weekly
//! windows or a date override, minus appointments, external busy intervals
//! and live locks. Snapshots are memoized in the cache.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::SharedCache;
use crate::clock::SharedClock;
use crate::error::{BookingError, Result};
use crate::models::{LockStatus, Seller, SlotIdentity, TimeWindow, TIME_FORMAT};
use crate::storage::BookingStore;

/// Cache key of the snapshot for one seller and date.
pub fn snapshot_key(seller_id: &str, date: NaiveDate) -> String {
    format!("availability:{}:{}", seller_id, date)
}

/// Snapshot lifetime in seconds, cut short so a snapshot never outlives the
/// first hold it excludes. Never below one second.
fn snapshot_ttl(ceiling: u64, now: DateTime<Utc>, next_release: Option<DateTime<Utc>>) -> u64 {
    match next_release {
        Some(at) => {
            let millis = (at - now).num_milliseconds().max(0) as u64;
            millis.div_ceil(1000).clamp(1, ceiling.max(1))
        }
        None => ceiling,
    }
}

/// Pattern matching every snapshot of one seller.
pub fn snapshot_pattern(seller_id: &str) -> String {
    format!("availability:{}:*", seller_id)
}

// == Slot ==
/// A bookable half-open window `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_minutes: i64,
    /// Seller-local start, as used in lock requests
    pub start_time: String,
    /// Seller-local end, as used in lock requests
    pub end_time: String,
}

/// Half-open interval overlap.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && a_end > b_start
}

// == Busy Times ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Error, Debug, Clone)]
#[error("busy time lookup failed: {0}")]
pub struct BusyTimeError(pub String);

/// External calendar free/busy source.
#[async_trait]
pub trait BusyTimeProvider: Send + Sync {
    async fn busy_times(
        &self,
        seller_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> std::result::Result<Vec<BusyInterval>, BusyTimeError>;
}

/// Provider used when no external calendar is connected.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBusyTimes;

#[async_trait]
impl BusyTimeProvider for NoBusyTimes {
    async fn busy_times(
        &self,
        _seller_id: &str,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
    ) -> std::result::Result<Vec<BusyInterval>, BusyTimeError> {
        Ok(Vec::new())
    }
}

// Local candidate before conversion.
struct Candidate {
    local_start: NaiveDateTime,
    local_end: NaiveDateTime,
}

/// Cuts each window into back-to-back slots of `duration`, dropping remainders.
fn generate_candidates(date: NaiveDate, windows: &[TimeWindow], duration: Duration) -> Vec<Candidate> {
    let mut out = Vec::new();
    if duration <= Duration::zero() {
        return out;
    }

    for window in windows {
        let window_end = date.and_time(window.end);
        let mut cursor = date.and_time(window.start);
        while cursor + duration <= window_end {
            out.push(Candidate {
                local_start: cursor,
                local_end: cursor + duration,
            });
            cursor += duration;
        }
    }
    out.sort_by_key(|c| c.local_start);
    out.dedup_by_key(|c| c.local_start);
    out
}

// == Resolver ==
pub struct AvailabilityResolver {
    store: Arc<dyn BookingStore>,
    cache: SharedCache,
    clock: SharedClock,
    busy: Arc<dyn BusyTimeProvider>,
    snapshot_ttl: u64,
}

impl AvailabilityResolver {
    pub fn new(
        store: Arc<dyn BookingStore>,
        cache: SharedCache,
        clock: SharedClock,
        busy: Arc<dyn BusyTimeProvider>,
        snapshot_ttl: u64,
    ) -> Self {
        Self {
            store,
            cache,
            clock,
            busy,
            snapshot_ttl,
        }
    }

    /// Bookable slots for `seller_id` on `date`, in start order.
    pub async fn resolve(&self, seller_id: &str, date: NaiveDate) -> Result<Vec<AvailabilitySlot>> {
        let now = self.clock.now();
        let key = snapshot_key(seller_id, date);

        let cached = self.cache.write().await.get(&key);
        if let Some(raw) = cached {
            if let Ok(slots) = serde_json::from_str::<Vec<AvailabilitySlot>>(&raw) {
                debug!("Availability snapshot hit for {}", key);
                return Ok(slots.into_iter().filter(|s| s.start >= now).collect());
            }
        }

        let seller = self
            .store
            .find_seller(seller_id)
            .await?
            .filter(|s| s.is_seller())
            .ok_or_else(|| BookingError::SellerNotFound(seller_id.to_string()))?;

        let (slots, next_release) = self.compute(&seller, date).await?;
        let ttl = snapshot_ttl(self.snapshot_ttl, now, next_release);

        match serde_json::to_string(&slots) {
            Ok(raw) => {
                if let Err(e) = self.cache.write().await.set(key.clone(), raw, Some(ttl)) {
                    warn!("Could not cache availability for {}: {}", key, e);
                }
            }
            Err(e) => warn!("Could not encode availability for {}: {}", key, e),
        }

        Ok(slots.into_iter().filter(|s| s.start >= now).collect())
    }

    /// Free slots plus the earliest expiry among the LOCKED holds that were
    /// subtracted, if any.
    async fn compute(
        &self,
        seller: &Seller,
        date: NaiveDate,
    ) -> Result<(Vec<AvailabilitySlot>, Option<DateTime<Utc>>)> {
        let windows = match self.store.date_override(&seller.id, date).await? {
            Some(windows) => windows,
            None => self.store.weekly_availability(&seller.id, date.weekday()).await?,
        };

        let duration = Duration::minutes(seller.default_duration_minutes);
        let mut slots: Vec<(NaiveTime, AvailabilitySlot)> = generate_candidates(date, &windows, duration)
            .into_iter()
            .filter_map(|c| {
                let start = seller.timezone.from_local_datetime(&c.local_start).earliest()?;
                let end = seller.timezone.from_local_datetime(&c.local_end).earliest()?;
                let slot = AvailabilitySlot {
                    start: start.with_timezone(&Utc),
                    end: end.with_timezone(&Utc),
                    duration_minutes: seller.default_duration_minutes,
                    start_time: c.local_start.time().format(TIME_FORMAT).to_string(),
                    end_time: c.local_end.time().format(TIME_FORMAT).to_string(),
                };
                Some((c.local_start.time(), slot))
            })
            .collect();

        let (from, to) = match (slots.first(), slots.last()) {
            (Some((_, first)), Some((_, last))) => (first.start, last.end),
            _ => return Ok((Vec::new(), None)),
        };

        let appointments = self.store.appointments_between(&seller.id, from, to).await?;
        let busy = match self.busy.busy_times(&seller.id, from, to).await {
            Ok(busy) => busy,
            Err(e) => {
                warn!(seller_id = %seller.id, "Ignoring external busy times: {}", e);
                Vec::new()
            }
        };

        slots.retain(|(_, slot)| {
            !appointments
                .iter()
                .any(|a| overlaps(slot.start, slot.end, a.start, a.end))
                && !busy
                    .iter()
                    .any(|b| overlaps(slot.start, slot.end, b.start, b.end))
        });

        let now = self.clock.now();
        let mut free = Vec::with_capacity(slots.len());
        let mut next_release: Option<DateTime<Utc>> = None;
        for (start_time, slot) in slots {
            let identity = SlotIdentity::new(seller.id.clone(), date, start_time);
            match self.store.find_active_lock(&identity, now).await? {
                None => free.push(slot),
                Some(lock) if lock.status == LockStatus::Locked => {
                    next_release = Some(next_release.map_or(lock.expires_at, |t| t.min(lock.expires_at)));
                }
                Some(_) => {}
            }
        }

        Ok((free, next_release))
    }
}
