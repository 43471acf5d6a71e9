//! Integration Tests for API Endpoints
//!
//! Drives full request/response cycles through the router with a manual clock.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde_json::Value;
use slot_lock::{
    api::create_router,
    clock::ManualClock,
    models::{parse_time, Role, Seller, TimeWindow},
    notify::{NotificationJob, NotificationQueue},
    storage::MemoryStore,
    AppState, Config,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tower::ServiceExt;

// == Helper Functions ==

const ACQUIRE_10: &str =
    r#"{"seller_id":"seller1","date":"2025-09-16","start_time":"10:00","end_time":"10:30"}"#;

struct TestApp {
    router: Router,
    clock: Arc<ManualClock>,
    _jobs: UnboundedReceiver<NotificationJob>,
}

async fn create_test_app() -> TestApp {
    // Tuesday 2025-09-16, 08:00 UTC
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 9, 16, 8, 0, 0).unwrap(),
    ));
    let store = Arc::new(MemoryStore::new(clock.clone()));
    store.add_seller(Seller::new("seller1", Tz::UTC, 30)).await;
    store
        .add_seller(Seller {
            role: Role::Buyer,
            ..Seller::new("buyer-account", Tz::UTC, 30)
        })
        .await;
    store
        .set_weekly_availability(
            "seller1",
            Weekday::Tue,
            vec![TimeWindow::new(
                parse_time("09:00").unwrap(),
                parse_time("17:00").unwrap(),
            )],
        )
        .await;

    let (queue, jobs) = NotificationQueue::channel();
    let state = AppState::from_config(&Config::default(), store, clock.clone(), queue);

    TestApp {
        router: create_router(state),
        clock,
        _jobs: jobs,
    }
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn request(method: &str, uri: &str, user: Option<(&str, &str)>, body: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, role)) = user {
        builder = builder.header("x-user-id", id).header("x-user-role", role);
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &TestApp, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

async fn acquire(app: &TestApp, buyer: &str) -> (StatusCode, Value) {
    send(
        app,
        request("POST", "/locks", Some((buyer, "buyer")), Some(ACQUIRE_10)),
    )
    .await
}

// == Booking Flow ==

#[tokio::test]
async fn test_lock_confirm_flow() {
    let app = create_test_app().await;

    let (status, lock) = acquire(&app, "buyer-a").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(lock["key"], "slot:seller1:2025-09-16:10:00");
    assert_eq!(lock["expires_at"], "2025-09-16T08:05:00Z");
    let lock_id = lock["lock_id"].as_str().unwrap().to_string();

    let (status, err) = acquire(&app, "buyer-b").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "ALREADY_LOCKED");

    let (status, booked) = send(
        &app,
        request(
            "POST",
            &format!("/locks/{}/confirm", lock_id),
            Some(("buyer-a", "buyer")),
            Some(r#"{"title":"Consult"}"#),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(booked["status"], "CONFIRMED");
    assert_eq!(booked["appointment"]["start"], "2025-09-16T10:00:00Z");
    assert_eq!(booked["appointment"]["duration_minutes"], 30);

    let (status, err) = acquire(&app, "buyer-b").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "ALREADY_BOOKED");

    let (status, view) = send(
        &app,
        request("GET", "/slots/seller1/2025-09-16/10:00", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["is_locked"], true);
    assert_eq!(view["status"], "CONFIRMED");
    assert_eq!(view["owner_id"], "buyer-a");
}

#[tokio::test]
async fn test_confirm_after_expiry_returns_gone() {
    let app = create_test_app().await;

    let (_, lock) = acquire(&app, "buyer-a").await;
    let lock_id = lock["lock_id"].as_str().unwrap().to_string();

    app.clock.advance(chrono::Duration::minutes(6));

    let (status, err) = send(
        &app,
        request(
            "POST",
            &format!("/locks/{}/confirm", lock_id),
            Some(("buyer-a", "buyer")),
            Some(r#"{"title":"Consult"}"#),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(err["code"], "EXPIRED");

    let (_, view) = send(
        &app,
        request("GET", "/slots/seller1/2025-09-16/10:00", None, None),
    )
    .await;
    assert_eq!(view["is_locked"], false);

    let (status, _) = acquire(&app, "buyer-b").await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_cancel_and_relock() {
    let app = create_test_app().await;

    let (_, lock) = acquire(&app, "buyer-a").await;
    let uri = format!("/locks/{}", lock["lock_id"].as_str().unwrap());

    let (status, err) = send(&app, request("DELETE", &uri, Some(("buyer-b", "buyer")), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["code"], "FORBIDDEN");

    let (status, released) =
        send(&app, request("DELETE", &uri, Some(("buyer-a", "buyer")), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(released["status"], "CANCELLED");

    let (status, _) = acquire(&app, "buyer-b").await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_unlock_by_identity() {
    let app = create_test_app().await;
    acquire(&app, "buyer-a").await;

    let (status, released) = send(
        &app,
        request(
            "DELETE",
            "/slots/seller1/2025-09-16/10:00",
            Some(("buyer-a", "buyer")),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(released["status"], "CANCELLED");

    let (status, _) = send(
        &app,
        request(
            "DELETE",
            "/slots/seller1/2025-09-16/10:00",
            Some(("buyer-a", "buyer")),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_appointment_cancellation_reopens_slot() {
    let app = create_test_app().await;

    let (_, lock) = acquire(&app, "buyer-a").await;
    let (_, booked) = send(
        &app,
        request(
            "POST",
            &format!("/locks/{}/confirm", lock["lock_id"].as_str().unwrap()),
            Some(("buyer-a", "buyer")),
            Some(r#"{"title":"Consult"}"#),
        ),
    )
    .await;
    let uri = format!(
        "/appointments/{}",
        booked["appointment"]["id"].as_str().unwrap()
    );

    let (status, _) = send(&app, request("DELETE", &uri, Some(("seller1", "seller")), None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = acquire(&app, "buyer-b").await;
    assert_eq!(status, StatusCode::CREATED);
}

// == Session and Validation ==

#[tokio::test]
async fn test_missing_session_is_unauthorized() {
    let app = create_test_app().await;

    let (status, err) = send(&app, request("POST", "/locks", None, Some(ACQUIRE_10))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(err["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_seller_cannot_hold_slots() {
    let app = create_test_app().await;

    let (status, _) = send(
        &app,
        request("POST", "/locks", Some(("seller1", "seller")), Some(ACQUIRE_10)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_lock_on_non_seller_is_not_found() {
    let app = create_test_app().await;

    let (status, err) = send(
        &app,
        request(
            "POST",
            "/locks",
            Some(("buyer-a", "buyer")),
            Some(r#"{"seller_id":"buyer-account","date":"2025-09-16","start_time":"10:00","end_time":"10:30"}"#),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["code"], "SELLER_NOT_FOUND");
}

#[tokio::test]
async fn test_malformed_time_is_bad_request() {
    let app = create_test_app().await;

    let (status, err) = send(
        &app,
        request(
            "POST",
            "/locks",
            Some(("buyer-a", "buyer")),
            Some(r#"{"seller_id":"seller1","date":"2025-09-16","start_time":"10am","end_time":"10:30"}"#),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_slot_times_have_minute_precision() {
    let app = create_test_app().await;
    let (status, _) = acquire(&app, "buyer-a").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, err) = send(
        &app,
        request(
            "POST",
            "/locks",
            Some(("buyer-b", "buyer")),
            Some(r#"{"seller_id":"seller1","date":"2025-09-16","start_time":"10:00:30","end_time":"10:30"}"#),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "INVALID_REQUEST");

    let (status, err) = send(
        &app,
        request("GET", "/slots/seller1/2025-09-16/10:00:30", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "INVALID_REQUEST");

    let (status, _) = send(
        &app,
        request(
            "DELETE",
            "/slots/seller1/2025-09-16/10:00:30",
            Some(("buyer-a", "buyer")),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Zero seconds name the same slot as the plain HH:MM form.
    let (status, view) = send(
        &app,
        request("GET", "/slots/seller1/2025-09-16/10:00:00", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["is_locked"], true);
    assert_eq!(view["owner_id"], "buyer-a");

    let (status, released) = send(
        &app,
        request(
            "DELETE",
            "/slots/seller1/2025-09-16/10:00:00",
            Some(("buyer-a", "buyer")),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(released["status"], "CANCELLED");
}

// == Availability ==

#[tokio::test]
async fn test_availability_excludes_held_slots() {
    let app = create_test_app().await;
    let uri = "/sellers/seller1/availability?date=2025-09-16";

    let (status, body) = send(&app, request("GET", uri, None, None)).await;
    assert_eq!(status, StatusCode::OK);
    let slots = body["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 16);
    assert_eq!(slots[0]["start_time"], "09:00");

    acquire(&app, "buyer-a").await;

    let (_, body) = send(&app, request("GET", uri, None, None)).await;
    let slots = body["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 15);
    assert!(slots.iter().all(|s| s["start_time"] != "10:00"));
}

#[tokio::test]
async fn test_availability_unknown_seller() {
    let app = create_test_app().await;

    let (status, _) = send(
        &app,
        request("GET", "/sellers/ghost/availability?date=2025-09-16", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// == Concurrency ==

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_acquires_single_winner() {
    let app = create_test_app().await;

    let tasks: Vec<_> = (0..20)
        .map(|i| {
            let router = app.router.clone();
            tokio::spawn(async move {
                let buyer = format!("buyer-{}", i);
                router
                    .oneshot(request(
                        "POST",
                        "/locks",
                        Some((buyer.as_str(), "buyer")),
                        Some(ACQUIRE_10),
                    ))
                    .await
                    .unwrap()
                    .status()
            })
        })
        .collect();

    let mut created = 0;
    let mut conflicts = 0;
    for task in tasks {
        match task.await.unwrap() {
            StatusCode::CREATED => created += 1,
            StatusCode::CONFLICT => conflicts += 1,
            other => panic!("unexpected status {}", other),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(conflicts, 19);
}

// == Health / Stats ==

#[tokio::test]
async fn test_health_and_stats() {
    let app = create_test_app().await;

    let (status, health) = send(&app, request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");

    let (status, stats) = send(&app, request("GET", "/stats", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(stats.get("hit_rate").is_some());
    assert!(stats.get("total_entries").is_some());
}
