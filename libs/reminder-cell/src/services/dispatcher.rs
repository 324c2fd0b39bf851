// libs/reminder-cell/src/services/dispatcher.rs
//
// Imminent-session reminders. Each sweep recomputes phases for every
// tracked session and sends at most one reminder per appointment: the
// transition is claimed on the session before any notification goes out,
// so repeated sweeps, crashes mid-send, or overlapping ticks never double
// a reminder. A session first seen past its window has the transition
// consumed without sending; a late reminder is worse than none.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use session_cell::{phase, SessionPhase, SessionStore};
use shared_clients::{AppointmentDirectory, AppointmentRecord, Notifier};
use shared_config::AppConfig;

use crate::models::{templates, ReminderError, SweepSummary};

pub struct ReminderDispatcher {
    config: Arc<AppConfig>,
    store: SessionStore,
    directory: Arc<dyn AppointmentDirectory>,
    notifier: Arc<dyn Notifier>,
}

impl ReminderDispatcher {
    pub fn new(
        config: Arc<AppConfig>,
        store: SessionStore,
        directory: Arc<dyn AppointmentDirectory>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            store,
            directory,
            notifier,
        }
    }

    /// One pass over every tracked session. `now` is explicit so sweeps
    /// are testable without waiting for wall-clock windows.
    #[instrument(skip(self))]
    pub async fn poll_once(&self, now: DateTime<Utc>) -> SweepSummary {
        let mut summary = SweepSummary::default();

        for appointment_id in self.store.appointment_ids().await {
            let record = match self.directory.get_appointment(appointment_id).await {
                Ok(record) => record,
                Err(e) => {
                    warn!("Skipping reminder check for {}: {}", appointment_id, e);
                    continue;
                }
            };

            let handle = match self.store.get(appointment_id).await {
                Some(handle) => handle,
                // Torn down between listing and locking.
                None => continue,
            };

            let mut session = handle.lock().await;
            summary.examined += 1;

            let duration = record
                .duration_minutes
                .unwrap_or(self.config.default_duration_minutes);
            let current_phase = match phase::effective(
                &session,
                record.start_time,
                Some(duration),
                now,
                self.config.imminent_window_minutes,
            ) {
                Ok(current_phase) => current_phase,
                Err(e) => {
                    warn!("Phase evaluation failed for {}: {}", appointment_id, e);
                    continue;
                }
            };

            if session.last_reminder_phase.is_some() {
                continue;
            }

            match current_phase {
                SessionPhase::Imminent => {
                    // Claim before sending. A delivery failure loses this
                    // reminder rather than risking a duplicate later.
                    session.last_reminder_phase = Some(SessionPhase::Imminent);
                    drop(session);

                    if let Err(e) = self.notify_participants(&record).await {
                        warn!("Reminder for {} partially failed: {}", appointment_id, e);
                    }
                    summary.reminded += 1;
                }
                SessionPhase::Active | SessionPhase::Ended => {
                    session.last_reminder_phase = Some(SessionPhase::Imminent);
                    debug!(
                        "Reminder window for {} already passed, consuming without sending",
                        appointment_id
                    );
                    summary.expired += 1;
                }
                SessionPhase::Upcoming => {}
            }
        }

        summary
    }

    /// Operator-triggered resend. Bypasses the claim entirely: the
    /// reminder goes out whether or not a sweep already sent one.
    #[instrument(skip(self))]
    pub async fn resend(&self, appointment_id: Uuid) -> Result<(), ReminderError> {
        let record = self.directory.get_appointment(appointment_id).await?;

        info!("Operator resend of reminder for appointment {}", appointment_id);
        self.notify_participants(&record).await
    }

    /// Notify both participants. Delivery to one is still attempted when
    /// the other fails; the first failure is reported.
    async fn notify_participants(&self, record: &AppointmentRecord) -> Result<(), ReminderError> {
        let data = json!({
            "appointment_id": record.id,
            "start_time": record.start_time,
            "patient_name": record.patient_name,
            "provider_name": record.provider_name,
        });

        let mut first_failure = None;
        for user_id in [record.patient_id, record.provider_id] {
            if let Err(e) = self
                .notifier
                .notify(user_id, templates::SESSION_IMMINENT, data.clone())
                .await
            {
                warn!("Reminder notification to {} failed: {}", user_id, e);
                if first_failure.is_none() {
                    first_failure = Some(e);
                }
            }
        }

        match first_failure {
            None => Ok(()),
            Some(e) => Err(ReminderError::Delivery {
                message: e.to_string(),
            }),
        }
    }
}

impl Clone for ReminderDispatcher {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            store: self.store.clone(),
            directory: Arc::clone(&self.directory),
            notifier: Arc::clone(&self.notifier),
        }
    }
}

// ==============================================================================
// BACKGROUND SCHEDULER
// ==============================================================================

/// Interval loop that drives the dispatcher, with a shared shutdown flag
/// in the background-worker style.
pub struct ReminderScheduler {
    dispatcher: Arc<ReminderDispatcher>,
    interval_seconds: u64,
    is_shutdown: Arc<RwLock<bool>>,
}

impl ReminderScheduler {
    pub fn new(dispatcher: Arc<ReminderDispatcher>, interval_seconds: u64) -> Self {
        Self {
            dispatcher,
            interval_seconds: interval_seconds.max(1),
            is_shutdown: Arc::new(RwLock::new(false)),
        }
    }

    pub fn shutdown_flag(&self) -> Arc<RwLock<bool>> {
        Arc::clone(&self.is_shutdown)
    }

    pub async fn run(&self) {
        info!(
            "Starting reminder scheduler (every {}s)",
            self.interval_seconds
        );
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(self.interval_seconds));

        loop {
            interval.tick().await;

            if *self.is_shutdown.read().await {
                info!("Reminder scheduler shutting down");
                break;
            }

            let summary = self.dispatcher.poll_once(Utc::now()).await;
            if summary.reminded > 0 || summary.expired > 0 {
                debug!(
                    "Reminder sweep: examined {}, reminded {}, expired {}",
                    summary.examined, summary.reminded, summary.expired
                );
            }
        }
    }

    pub async fn shutdown(&self) {
        *self.is_shutdown.write().await = true;
    }
}
