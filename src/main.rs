//! Slot Lock - booking slot reservation server
//!
//! Serves the lock/confirm API and runs the cache reaper, the expiry sweeper
//! and the notification worker alongside it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slot_lock::api::{create_router, AppState};
use slot_lock::clock::{SharedClock, SystemClock};
use slot_lock::config::Config;
use slot_lock::notify::{spawn_notification_worker, LoggingNotifier, NotificationQueue};
use slot_lock::storage::{MemoryStore, SeedData};
use slot_lock::tasks::{spawn_cleanup_task, spawn_sweeper_task};

/// Backoff unit between notification retries.
const NOTIFICATION_BACKOFF: Duration = Duration::from_secs(1);

/// How long shutdown waits for queued notifications to drain.
const NOTIFICATION_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Main entry point for the slot lock server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the store, apply the optional seed file
/// 4. Start the notification worker, cache cleanup and expiry sweeper
/// 5. Serve the router until SIGINT/SIGTERM
/// 6. Stop the sweeper and cleanup task, drain notifications
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slot_lock=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Slot Lock Server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: lock_duration={}m, sweeper_interval={}s, port={}, cleanup_interval={}s",
        config.lock_duration_minutes,
        config.sweeper_interval,
        config.server_port,
        config.cache_cleanup_interval
    );

    let clock: SharedClock = Arc::new(SystemClock);
    let store = Arc::new(MemoryStore::new(clock.clone()));

    if let Some(path) = &config.seed_file {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read seed file {}", path.display()))?;
        let seed = SeedData::from_json(&raw)
            .with_context(|| format!("Failed to parse seed file {}", path.display()))?;
        let sellers = store.apply_seed(seed).await;
        info!("Seeded {} sellers from {}", sellers, path.display());
    } else {
        warn!("No SEED_FILE set, starting with an empty store");
    }

    let (notifications, jobs) = NotificationQueue::channel();
    let notification_handle = spawn_notification_worker(
        jobs,
        Arc::new(LoggingNotifier),
        config.notification_max_attempts,
        NOTIFICATION_BACKOFF,
    );

    let state = AppState::from_config(&config, store, clock, notifications);

    let cleanup_handle = spawn_cleanup_task(state.cache.clone(), config.cache_cleanup_interval);
    let sweeper = spawn_sweeper_task(state.manager.clone(), config.sweeper_interval);
    info!("Background tasks started");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    sweeper.shutdown().await;
    cleanup_handle.abort();
    warn!("Cleanup task aborted");

    // The worker exits once the last queue handle (held by the manager) is gone.
    if tokio::time::timeout(NOTIFICATION_DRAIN_TIMEOUT, notification_handle)
        .await
        .is_err()
    {
        warn!("Notification worker did not drain in time");
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
