//! API Handlers
//!
//! HTTP request handlers for each slot lock endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    Json,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::availability::{AvailabilityResolver, NoBusyTimes};
use crate::cache::{CacheStore, SharedCache};
use crate::clock::SharedClock;
use crate::config::{CacheCategory, Config};
use crate::error::{BookingError, Result};
use crate::locks::{LockManager, LockSettings, LockStatusView};
use crate::models::{
    AcquireLockRequest, AppointmentCancelledResponse, AvailabilityQuery, AvailabilityResponse,
    ConfirmLockRequest, ConfirmResponse, HealthResponse, LockResponse, ReleaseResponse, Role,
    SlotIdentity, StatsResponse,
};
use crate::notify::NotificationQueue;
use crate::storage::BookingStore;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<LockManager>,
    pub resolver: Arc<AvailabilityResolver>,
    /// Shared with the manager and resolver; exposed for stats and cleanup
    pub cache: SharedCache,
    pub clock: SharedClock,
}

impl AppState {
    pub fn new(
        manager: Arc<LockManager>,
        resolver: Arc<AvailabilityResolver>,
        cache: SharedCache,
        clock: SharedClock,
    ) -> Self {
        Self {
            manager,
            resolver,
            cache,
            clock,
        }
    }

    /// Wires the cache, lock manager and availability resolver over `store`.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn BookingStore>,
        clock: SharedClock,
        notifications: NotificationQueue,
    ) -> Self {
        let cache: SharedCache = Arc::new(RwLock::new(CacheStore::new(
            clock.clone(),
            config.cache_ttl(CacheCategory::General),
        )));
        let manager = Arc::new(LockManager::new(
            store.clone(),
            cache.clone(),
            clock.clone(),
            notifications,
            LockSettings::from_config(config),
        ));
        let resolver = Arc::new(AvailabilityResolver::new(
            store,
            cache.clone(),
            clock.clone(),
            Arc::new(NoBusyTimes),
            config.cache_ttl(CacheCategory::General),
        ));

        Self::new(manager, resolver, cache, clock)
    }
}

// == Session ==
/// Caller identity taken from the `x-user-id` and `x-user-role` headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    pub role: Role,
}

impl CurrentUser {
    fn require_buyer(&self) -> Result<()> {
        if self.role != Role::Buyer {
            return Err(BookingError::Forbidden(format!(
                "{} is a {}, only buyers can hold slots",
                self.id, self.role
            )));
        }
        Ok(())
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = BookingError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        let id = header(parts, USER_ID_HEADER).ok_or_else(|| {
            BookingError::Unauthorized(format!("missing {} header", USER_ID_HEADER))
        })?;
        let role = header(parts, USER_ROLE_HEADER)
            .ok_or_else(|| {
                BookingError::Unauthorized(format!("missing {} header", USER_ROLE_HEADER))
            })?
            .parse::<Role>()
            .map_err(BookingError::Unauthorized)?;

        Ok(Self {
            id: id.to_string(),
            role,
        })
    }
}

fn parse_id(raw: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|_| BookingError::InvalidRequest(format!("'{}' is not a valid {} id", raw, what)))
}

/// Handler for POST /locks
pub async fn acquire_lock_handler(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<AcquireLockRequest>,
) -> Result<(StatusCode, Json<LockResponse>)> {
    user.require_buyer()?;
    let (identity, end_time) = req.parse()?;

    let grant = state.manager.acquire(identity, end_time, &user.id).await?;

    Ok((StatusCode::CREATED, Json(grant.into())))
}

/// Handler for DELETE /locks/:lock_id
pub async fn cancel_lock_handler(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(lock_id): Path<String>,
) -> Result<Json<ReleaseResponse>> {
    let lock_id = parse_id(&lock_id, "lock")?;
    let lock = state.manager.cancel(lock_id, &user.id).await?;

    Ok(Json(lock.into()))
}

/// Handler for POST /locks/:lock_id/confirm
pub async fn confirm_lock_handler(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(lock_id): Path<String>,
    Json(req): Json<ConfirmLockRequest>,
) -> Result<(StatusCode, Json<ConfirmResponse>)> {
    user.require_buyer()?;
    if let Some(msg) = req.validate() {
        return Err(BookingError::InvalidRequest(msg));
    }
    let lock_id = parse_id(&lock_id, "lock")?;

    let booking = state.manager.confirm(lock_id, &user.id, &req.title).await?;

    Ok((StatusCode::CREATED, Json(booking.into())))
}

/// Handler for GET /slots/:seller_id/:date/:start_time
pub async fn lock_status_handler(
    State(state): State<AppState>,
    Path((seller_id, date, start_time)): Path<(String, String, String)>,
) -> Result<Json<LockStatusView>> {
    let identity = SlotIdentity::parse(&seller_id, &date, &start_time)?;
    Ok(Json(state.manager.status(&identity).await?))
}

/// Handler for DELETE /slots/:seller_id/:date/:start_time
pub async fn unlock_handler(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((seller_id, date, start_time)): Path<(String, String, String)>,
) -> Result<Json<ReleaseResponse>> {
    let identity = SlotIdentity::parse(&seller_id, &date, &start_time)?;
    let lock = state.manager.unlock(&identity, &user.id).await?;

    Ok(Json(lock.into()))
}

/// Handler for GET /sellers/:seller_id/availability?date=YYYY-MM-DD
pub async fn availability_handler(
    State(state): State<AppState>,
    Path(seller_id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>> {
    let date = query.parse_date()?;
    let slots = state.resolver.resolve(&seller_id, date).await?;

    Ok(Json(AvailabilityResponse {
        seller_id,
        date,
        slots,
    }))
}

/// Handler for DELETE /appointments/:appointment_id
pub async fn cancel_appointment_handler(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(appointment_id): Path<String>,
) -> Result<Json<AppointmentCancelledResponse>> {
    let appointment_id = parse_id(&appointment_id, "appointment")?;
    let appointment = state
        .manager
        .cancel_appointment(appointment_id, &user.id)
        .await?;

    Ok(Json(appointment.into()))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache = state.cache.read().await;
    Json(cache.stats().into())
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.clock.now()))
}
