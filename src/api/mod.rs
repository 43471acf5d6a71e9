//! API Module
//!
//! HTTP handlers and routing for the slot lock REST API.
//!
//! Callers identify themselves with the `x-user-id` and `x-user-role`
//! headers; see [`CurrentUser`].

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
