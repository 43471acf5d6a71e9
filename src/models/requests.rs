//! Request DTOs for the slot lock API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;

use super::slot::{parse_date, parse_time, SlotIdentity};
use crate::error::{BookingError, Result};

/// Request body for acquiring a lock (POST /locks)
///
/// Dates are `YYYY-MM-DD`, times `HH:MM`, both in the seller's timezone.
#[derive(Debug, Clone, Deserialize)]
pub struct AcquireLockRequest {
    pub seller_id: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
}

impl AcquireLockRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.seller_id.trim().is_empty() {
            return Some("Seller id cannot be empty".to_string());
        }
        if self.seller_id.contains(':') {
            return Some("Seller id cannot contain ':'".to_string());
        }
        None
    }

    /// Parses the slot coordinates and end time.
    pub fn parse(&self) -> Result<(SlotIdentity, NaiveTime)> {
        if let Some(msg) = self.validate() {
            return Err(BookingError::InvalidRequest(msg));
        }
        let identity = SlotIdentity::parse(&self.seller_id, &self.date, &self.start_time)?;
        let end_time = parse_time(&self.end_time)?;
        Ok((identity, end_time))
    }
}

/// Request body for confirming a lock (POST /locks/:lock_id/confirm)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmLockRequest {
    pub title: String,
}

impl ConfirmLockRequest {
    pub fn validate(&self) -> Option<String> {
        if self.title.trim().is_empty() {
            return Some("Title cannot be empty".to_string());
        }
        if self.title.len() > 200 {
            return Some("Title exceeds maximum length of 200 characters".to_string());
        }
        None
    }
}

/// Query string for GET /sellers/:seller_id/availability
#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityQuery {
    pub date: String,
}

impl AvailabilityQuery {
    pub fn parse_date(&self) -> Result<NaiveDate> {
        parse_date(&self.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_request_deserialize() {
        let json = r#"{"seller_id": "seller1", "date": "2025-09-16", "start_time": "10:00", "end_time": "10:30"}"#;
        let req: AcquireLockRequest = serde_json::from_str(json).unwrap();
        let (identity, end) = req.parse().unwrap();
        assert_eq!(identity.cache_key(), "slot:seller1:2025-09-16:10:00");
        assert_eq!(end, NaiveTime::from_hms_opt(10, 30, 0).unwrap());
    }

    #[test]
    fn test_acquire_request_rejects_bad_input() {
        let mut req = AcquireLockRequest {
            seller_id: "".to_string(),
            date: "2025-09-16".to_string(),
            start_time: "10:00".to_string(),
            end_time: "10:30".to_string(),
        };
        assert!(req.validate().is_some());

        req.seller_id = "a:b".to_string();
        assert!(matches!(req.parse(), Err(BookingError::InvalidRequest(_))));

        req.seller_id = "seller1".to_string();
        req.date = "16/09/2025".to_string();
        assert!(matches!(req.parse(), Err(BookingError::InvalidRequest(_))));
    }

    #[test]
    fn test_confirm_request_validate() {
        let ok = ConfirmLockRequest {
            title: "Consult".to_string(),
        };
        assert!(ok.validate().is_none());

        let blank = ConfirmLockRequest {
            title: "  ".to_string(),
        };
        assert!(blank.validate().is_some());
    }

    #[test]
    fn test_availability_query() {
        let q = AvailabilityQuery {
            date: "2025-09-16".to_string(),
        };
        assert_eq!(q.parse_date().unwrap(), NaiveDate::from_ymd_opt(2025, 9, 16).unwrap());
    }
}
