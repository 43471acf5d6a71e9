//! Seller, role and schedule models

use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

// == Role ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Buyer,
    Seller,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buyer" => Ok(Role::Buyer),
            "seller" => Ok(Role::Seller),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Buyer => f.write_str("buyer"),
            Role::Seller => f.write_str("seller"),
        }
    }
}

// == Seller ==
/// A user that may be booked. Only `Role::Seller` users accept locks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seller {
    pub id: String,
    pub role: Role,
    /// Zone in which the seller's local slot times are interpreted
    pub timezone: Tz,
    /// Length of one generated availability slot
    pub default_duration_minutes: i64,
}

impl Seller {
    pub fn new(id: impl Into<String>, timezone: Tz, default_duration_minutes: i64) -> Self {
        Self {
            id: id.into(),
            role: Role::Seller,
            timezone,
            default_duration_minutes,
        }
    }

    pub fn is_seller(&self) -> bool {
        self.role == Role::Seller
    }
}

// == Time Window ==
/// Local `[start, end)` working window within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }
}
