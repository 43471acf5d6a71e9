//! Domain models and the request/response DTOs of the HTTP API.

mod appointment;
mod seller;
mod slot;

pub mod requests;
pub mod responses;

pub use appointment::{Appointment, NewAppointment};
pub use seller::{Role, Seller, TimeWindow};
pub use slot::{
    parse_date, parse_time, LockStatus, SlotIdentity, SlotLock, DATE_FORMAT, TIME_FORMAT,
};

// Re-export commonly used types
pub use requests::{AcquireLockRequest, AvailabilityQuery, ConfirmLockRequest};
pub use responses::{
    AppointmentCancelledResponse, AvailabilityResponse, ConfirmResponse, HealthResponse,
    LockResponse, ReleaseResponse, StatsResponse,
};
