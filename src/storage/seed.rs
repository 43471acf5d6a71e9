//! Seed data loaded into the store at startup.
//!
//! ```json
//! {
//!   "sellers": [{
//!     "seller": {"id": "seller1", "role": "seller", "timezone": "Europe/Zurich", "default_duration_minutes": 30},
//!     "weekly": [{"weekday": "Tue", "windows": [{"start": "09:00:00", "end": "12:00:00"}]}],
//!     "overrides": [{"date": "2025-12-25", "windows": []}]
//!   }]
//! }
//! ```

use chrono::{NaiveDate, Weekday};
use serde::Deserialize;

use crate::models::{Seller, TimeWindow};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub sellers: Vec<SeedSeller>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedSeller {
    pub seller: Seller,
    #[serde(default)]
    pub weekly: Vec<WeeklyRule>,
    #[serde(default)]
    pub overrides: Vec<DateOverride>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeeklyRule {
    pub weekday: Weekday,
    pub windows: Vec<TimeWindow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DateOverride {
    pub date: NaiveDate,
    pub windows: Vec<TimeWindow>,
}

impl SeedData {
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}
