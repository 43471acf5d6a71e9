//! Shared fixtures for unit tests.

use std::sync::Arc;

use chrono::{DateTime, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use tokio::sync::{mpsc, RwLock};

use crate::api::AppState;
use crate::availability::{AvailabilityResolver, NoBusyTimes};
use crate::cache::{CacheStore, SharedCache};
use crate::clock::ManualClock;
use crate::locks::{LockManager, LockSettings};
use crate::models::{parse_time, Role, Seller, SlotIdentity, TimeWindow};
use crate::notify::{NotificationJob, NotificationQueue};
use crate::storage::MemoryStore;

pub(crate) const SELLER: &str = "seller1";
pub(crate) const NOT_A_SELLER: &str = "buyer-account";

/// 2025-09-16 (a Tuesday) 08:00 UTC.
pub(crate) fn start_of_test() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 16, 8, 0, 0).unwrap()
}

pub(crate) fn t(raw: &str) -> NaiveTime {
    parse_time(raw).unwrap()
}

pub(crate) fn slot(start: &str) -> SlotIdentity {
    SlotIdentity::parse(SELLER, "2025-09-16", start).unwrap()
}

pub(crate) struct Harness {
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryStore>,
    pub cache: SharedCache,
    pub manager: Arc<LockManager>,
    pub jobs: mpsc::UnboundedReceiver<NotificationJob>,
}

impl Harness {
    pub async fn new() -> Self {
        let clock = Arc::new(ManualClock::new(start_of_test()));
        let store = Arc::new(MemoryStore::new(clock.clone()));
        store.add_seller(Seller::new(SELLER, Tz::UTC, 30)).await;
        store
            .add_seller(Seller {
                role: Role::Buyer,
                ..Seller::new(NOT_A_SELLER, Tz::UTC, 30)
            })
            .await;
        store
            .set_weekly_availability(SELLER, Weekday::Tue, vec![TimeWindow::new(t("09:00"), t("17:00"))])
            .await;

        let cache: SharedCache = Arc::new(RwLock::new(CacheStore::new(clock.clone(), 60)));
        let (queue, jobs) = NotificationQueue::channel();
        let manager = Arc::new(LockManager::new(
            store.clone(),
            cache.clone(),
            clock.clone(),
            queue,
            LockSettings::default(),
        ));

        Self {
            clock,
            store,
            cache,
            manager,
            jobs,
        }
    }

    /// HTTP state over the same store, cache and clock.
    pub fn state(&self) -> AppState {
        let resolver = Arc::new(AvailabilityResolver::new(
            self.store.clone(),
            self.cache.clone(),
            self.clock.clone(),
            Arc::new(NoBusyTimes),
            60,
        ));
        AppState::new(self.manager.clone(), resolver, self.cache.clone(), self.clock.clone())
    }
}
