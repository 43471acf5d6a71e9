//! Post-commit Notifications
//!
//! Calendar and email side effects run off a message channel after a booking
//! commits. Their outcome never feeds back into the appointment.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::models::Appointment;

// == Jobs ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationJob {
    CalendarEvent(Appointment),
    ConfirmationEmail(Appointment),
}

impl NotificationJob {
    fn kind(&self) -> &'static str {
        match self {
            NotificationJob::CalendarEvent(_) => "calendar_event",
            NotificationJob::ConfirmationEmail(_) => "confirmation_email",
        }
    }

    fn appointment(&self) -> &Appointment {
        match self {
            NotificationJob::CalendarEvent(a) | NotificationJob::ConfirmationEmail(a) => a,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

// == Notifier ==
/// External calendar/email integration.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn create_calendar_event(&self, appointment: &Appointment) -> Result<(), NotifyError>;

    async fn send_confirmation_email(&self, appointment: &Appointment) -> Result<(), NotifyError>;
}

/// Notifier that only logs. Stands in until real integrations are wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn create_calendar_event(&self, appointment: &Appointment) -> Result<(), NotifyError> {
        info!(
            appointment_id = %appointment.id,
            seller_id = %appointment.seller_id,
            "calendar event requested for {}",
            appointment.start.to_rfc3339()
        );
        Ok(())
    }

    async fn send_confirmation_email(&self, appointment: &Appointment) -> Result<(), NotifyError> {
        info!(
            appointment_id = %appointment.id,
            buyer_id = %appointment.buyer_id,
            "confirmation email requested"
        );
        Ok(())
    }
}

// == Queue ==
/// Sending half of the notification channel.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    tx: mpsc::UnboundedSender<NotificationJob>,
}

impl NotificationQueue {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<NotificationJob>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queues the calendar event and confirmation email for a new booking.
    ///
    /// Returns false if the worker is gone; the booking itself is unaffected.
    pub fn enqueue_booking(&self, appointment: &Appointment) -> bool {
        let jobs = [
            NotificationJob::CalendarEvent(appointment.clone()),
            NotificationJob::ConfirmationEmail(appointment.clone()),
        ];
        let mut delivered = true;
        for job in jobs {
            if self.tx.send(job).is_err() {
                delivered = false;
            }
        }
        if !delivered {
            warn!(appointment_id = %appointment.id, "notification queue closed, side effects dropped");
        }
        delivered
    }
}

// == Worker ==
/// Spawns the worker draining the notification channel.
///
/// Each job is tried up to `max_attempts` times, sleeping `backoff * attempt`
/// between tries. The task ends once every queue handle is dropped.
pub fn spawn_notification_worker(
    mut rx: mpsc::UnboundedReceiver<NotificationJob>,
    notifier: Arc<dyn Notifier>,
    max_attempts: u32,
    backoff: Duration,
) -> JoinHandle<()> {
    let max_attempts = max_attempts.max(1);

    tokio::spawn(async move {
        info!("Starting notification worker (max {} attempts)", max_attempts);

        while let Some(job) = rx.recv().await {
            run_job(notifier.as_ref(), &job, max_attempts, backoff).await;
        }

        debug!("Notification queue closed, worker exiting");
    })
}

async fn run_job(notifier: &dyn Notifier, job: &NotificationJob, max_attempts: u32, backoff: Duration) -> bool {
    for attempt in 1..=max_attempts {
        let result = match job {
            NotificationJob::CalendarEvent(a) => notifier.create_calendar_event(a).await,
            NotificationJob::ConfirmationEmail(a) => notifier.send_confirmation_email(a).await,
        };

        match result {
            Ok(()) => {
                debug!(kind = job.kind(), attempt, "notification delivered");
                return true;
            }
            Err(e) if attempt < max_attempts => {
                warn!(kind = job.kind(), attempt, "notification attempt failed: {}", e);
                tokio::time::sleep(backoff * attempt).await;
            }
            Err(e) => {
                warn!(
                    kind = job.kind(),
                    appointment_id = %job.appointment().id,
                    "notification abandoned after {} attempts: {}",
                    max_attempts,
                    e
                );
            }
        }
    }
    false
}
