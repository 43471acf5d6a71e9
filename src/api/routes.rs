//! API Routes
//!
//! Configures the Axum router with all slot lock endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    acquire_lock_handler, availability_handler, cancel_appointment_handler, cancel_lock_handler,
    confirm_lock_handler, health_handler, lock_status_handler, stats_handler, unlock_handler,
    AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `POST /locks` - Acquire a lock on a slot
/// - `DELETE /locks/:lock_id` - Cancel a held lock
/// - `POST /locks/:lock_id/confirm` - Turn a lock into an appointment
/// - `GET /slots/:seller_id/:date/:start_time` - Lock status of a slot
/// - `DELETE /slots/:seller_id/:date/:start_time` - Unlock by slot coordinates
/// - `GET /sellers/:seller_id/availability?date=` - Bookable slots for a day
/// - `DELETE /appointments/:appointment_id` - Cancel an appointment
/// - `GET /stats` - Cache statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/locks", post(acquire_lock_handler))
        .route("/locks/:lock_id", delete(cancel_lock_handler))
        .route("/locks/:lock_id/confirm", post(confirm_lock_handler))
        .route(
            "/slots/:seller_id/:date/:start_time",
            get(lock_status_handler).delete(unlock_handler),
        )
        .route("/sellers/:seller_id/availability", get(availability_handler))
        .route(
            "/appointments/:appointment_id",
            delete(cancel_appointment_handler),
        )
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
