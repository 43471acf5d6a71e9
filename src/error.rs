//! Error types for the slot lock service
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::storage::StoreError;

// == Booking Error Enum ==
/// Unified error type for lock, confirmation and availability operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// Lock, appointment or other record absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Seller does not exist or is not a seller
    #[error("Seller not found: {0}")]
    SellerNotFound(String),

    /// Caller does not own the lock
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Operation not valid for the lock's current status
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Another buyer holds the slot
    #[error("Slot already locked: {0}")]
    AlreadyLocked(String),

    /// An appointment already occupies the slot
    #[error("Slot already booked: {0}")]
    AlreadyBooked(String),

    /// Lock lapsed before confirmation
    #[error("Lock expired: {0}")]
    Expired(String),

    /// Uniqueness violation at commit time
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Malformed input
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No session
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BookingError {
    /// Stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::NotFound(_) => "NOT_FOUND",
            BookingError::SellerNotFound(_) => "SELLER_NOT_FOUND",
            BookingError::Forbidden(_) => "FORBIDDEN",
            BookingError::InvalidState(_) => "INVALID_STATE",
            BookingError::AlreadyLocked(_) => "ALREADY_LOCKED",
            BookingError::AlreadyBooked(_) => "ALREADY_BOOKED",
            BookingError::Expired(_) => "EXPIRED",
            BookingError::Conflict(_) => "CONFLICT",
            BookingError::InvalidRequest(_) => "INVALID_REQUEST",
            BookingError::Unauthorized(_) => "UNAUTHORIZED",
            BookingError::Internal(_) => "INTERNAL",
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            BookingError::NotFound(_) | BookingError::SellerNotFound(_) => StatusCode::NOT_FOUND,
            BookingError::Forbidden(_) => StatusCode::FORBIDDEN,
            BookingError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            BookingError::InvalidState(_)
            | BookingError::AlreadyLocked(_)
            | BookingError::AlreadyBooked(_)
            | BookingError::Conflict(_) => StatusCode::CONFLICT,
            BookingError::Expired(_) => StatusCode::GONE,
            BookingError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            BookingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// == Store Error Conversion ==
impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => BookingError::NotFound(what),
            StoreError::UniqueViolation(what) => BookingError::Conflict(what),
            StoreError::ConditionFailed(what) => BookingError::InvalidState(what),
            StoreError::Backend(msg) => BookingError::Internal(msg),
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the slot lock service.
pub type Result<T> = std::result::Result<T, BookingError>;
