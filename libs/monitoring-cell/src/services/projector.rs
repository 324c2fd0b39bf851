// libs/monitoring-cell/src/services/projector.rs
//
// Read-only projection of the session store for the admin dashboard.
// Phases are recomputed from appointment times on every query; nothing
// here mutates a session.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{instrument, warn};
use uuid::Uuid;

use session_cell::{phase, SessionPhase, SessionStore};
use shared_clients::{AppointmentDirectory, AppointmentRecord};
use shared_config::AppConfig;

use crate::models::{CompletionLabel, Dashboard, DashboardCounts, DashboardEntry, MonitoringError};

pub struct DashboardProjector {
    config: Arc<AppConfig>,
    store: SessionStore,
    directory: Arc<dyn AppointmentDirectory>,
}

impl DashboardProjector {
    pub fn new(
        config: Arc<AppConfig>,
        store: SessionStore,
        directory: Arc<dyn AppointmentDirectory>,
    ) -> Self {
        Self {
            config,
            store,
            directory,
        }
    }

    /// Bucket every tracked session by its phase at `now`, optionally
    /// filtered by a case-insensitive substring over participant names
    /// and the appointment reason.
    #[instrument(skip(self))]
    pub async fn project(
        &self,
        now: DateTime<Utc>,
        filter: Option<&str>,
    ) -> Result<Dashboard, MonitoringError> {
        let records: HashMap<Uuid, AppointmentRecord> = self
            .directory
            .list_appointments()
            .await?
            .into_iter()
            .map(|record| (record.id, record))
            .collect();

        let needle = filter
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);

        let mut active = Vec::new();
        let mut upcoming = Vec::new();
        let mut past = Vec::new();

        for session in self.store.snapshot().await {
            let record = match records.get(&session.appointment_id) {
                Some(record) => record,
                None => {
                    warn!(
                        "Session {} has no appointment record, skipping",
                        session.appointment_id
                    );
                    continue;
                }
            };

            if let Some(needle) = &needle {
                if !Self::matches(record, needle) {
                    continue;
                }
            }

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
                    warn!("Phase evaluation failed for {}: {}", session.appointment_id, e);
                    continue;
                }
            };

            let entry = DashboardEntry {
                appointment_id: session.appointment_id,
                patient_name: record.patient_name.clone(),
                provider_name: record.provider_name.clone(),
                reason: record.reason.clone(),
                start_time: record.start_time,
                phase: current_phase,
                patient_joined: session.patient.joined,
                provider_joined: session.provider.joined,
                meeting_link: session.meeting_link.clone(),
                completion: (current_phase == SessionPhase::Ended).then(|| {
                    CompletionLabel::derive(
                        session.provider.ever_joined(),
                        session.patient.ever_joined(),
                    )
                }),
            };

            match current_phase {
                SessionPhase::Active => active.push(entry),
                SessionPhase::Upcoming | SessionPhase::Imminent => upcoming.push(entry),
                SessionPhase::Ended => past.push(entry),
            }
        }

        // Soonest first for what is ahead, most recent first for history.
        active.sort_by_key(|entry| entry.start_time);
        upcoming.sort_by_key(|entry| entry.start_time);
        past.sort_by(|a, b| b.start_time.cmp(&a.start_time));

        let counts = DashboardCounts {
            active: active.len(),
            upcoming: upcoming.len(),
            past: past.len(),
            total: active.len() + upcoming.len() + past.len(),
        };

        Ok(Dashboard {
            active,
            upcoming,
            past,
            counts,
            generated_at: Utc::now(),
        })
    }

    fn matches(record: &AppointmentRecord, needle: &str) -> bool {
        record.patient_name.to_lowercase().contains(needle)
            || record.provider_name.to_lowercase().contains(needle)
            || record
                .reason
                .as_deref()
                .map(|reason| reason.to_lowercase().contains(needle))
                .unwrap_or(false)
    }
}

impl Clone for DashboardProjector {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            store: self.store.clone(),
            directory: Arc::clone(&self.directory),
        }
    }
}
