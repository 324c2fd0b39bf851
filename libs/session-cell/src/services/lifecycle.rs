// libs/session-cell/src/services/lifecycle.rs
//
// Consultation lifecycle controller. Reacts to appointment workflow changes,
// issues meeting links, and records joins, leaves and explicit ends. All
// mutations of one session go through its store handle, so concurrent
// requests for the same appointment are serialized.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_clients::{AppointmentDirectory, AppointmentRecord, AppointmentWorkflowStatus, MeetingRoomProvider};
use shared_config::AppConfig;

use crate::models::{
    LinkOutcome, ParticipantRole, Session, SessionError, SessionEvent, SessionEventSink,
    SessionPhase, SessionStatus, StatusChangeOutcome,
};
use crate::services::phase;
use crate::services::store::{SessionHandle, SessionStore};

pub struct SessionLifecycleService {
    config: Arc<AppConfig>,
    store: SessionStore,
    directory: Arc<dyn AppointmentDirectory>,
    rooms: Arc<dyn MeetingRoomProvider>,
    events: Arc<dyn SessionEventSink>,
}

impl SessionLifecycleService {
    pub fn new(
        config: Arc<AppConfig>,
        store: SessionStore,
        directory: Arc<dyn AppointmentDirectory>,
        rooms: Arc<dyn MeetingRoomProvider>,
        events: Arc<dyn SessionEventSink>,
    ) -> Self {
        Self {
            config,
            store,
            directory,
            rooms,
            events,
        }
    }

    // ==========================================================================
    // WORKFLOW INTEGRATION
    // ==========================================================================

    /// React to an appointment workflow change. Approval opens a session;
    /// any other status tears the session down without a room event
    /// (explicit `end_session` is the only early-end event path).
    #[instrument(skip(self))]
    pub async fn handle_status_change(
        &self,
        appointment_id: Uuid,
        new_status: AppointmentWorkflowStatus,
    ) -> Result<StatusChangeOutcome, SessionError> {
        match new_status {
            AppointmentWorkflowStatus::Approved => {
                let (_, created) = self.store.get_or_create(appointment_id).await;
                if created {
                    info!("Session opened for approved appointment {}", appointment_id);
                    Ok(StatusChangeOutcome::SessionCreated)
                } else {
                    debug!("Session already present for appointment {}", appointment_id);
                    Ok(StatusChangeOutcome::SessionAlreadyPresent)
                }
            }
            other => {
                if self.store.remove(appointment_id).await {
                    info!(
                        "Session torn down for appointment {} after status change to {}",
                        appointment_id, other
                    );
                    Ok(StatusChangeOutcome::SessionRemoved)
                } else {
                    Ok(StatusChangeOutcome::NoSession)
                }
            }
        }
    }

    // ==========================================================================
    // MEETING LINKS
    // ==========================================================================

    /// Return the meeting link, provisioning one on first request. A repeat
    /// call returns the stored link unchanged with `newly_created = false`
    /// and does not touch the attempt counter.
    #[instrument(skip(self))]
    pub async fn ensure_link(&self, appointment_id: Uuid) -> Result<LinkOutcome, SessionError> {
        let record = self.approved_record_for_link(appointment_id).await?;
        let handle = self.handle_for(appointment_id, &record).await?;
        let mut session = handle.lock().await;

        let now = Utc::now();
        let current = self.phase_of(&session, &record, now)?;
        if current == SessionPhase::Ended {
            return Err(SessionError::LinkGeneration {
                message: format!(
                    "session for appointment {} has ended, no link will be issued",
                    appointment_id
                ),
            });
        }

        if let Some(url) = &session.meeting_link {
            debug!("Reusing existing meeting link for appointment {}", appointment_id);
            return Ok(LinkOutcome {
                url: url.clone(),
                newly_created: false,
            });
        }

        let url = self.generate_link(&mut session, appointment_id).await?;
        Ok(LinkOutcome {
            url,
            newly_created: true,
        })
    }

    /// Replace the meeting link unconditionally, same gates as [`Self::ensure_link`].
    #[instrument(skip(self))]
    pub async fn regenerate_link(&self, appointment_id: Uuid) -> Result<LinkOutcome, SessionError> {
        let record = self.approved_record_for_link(appointment_id).await?;
        let handle = self.handle_for(appointment_id, &record).await?;
        let mut session = handle.lock().await;

        let now = Utc::now();
        let current = self.phase_of(&session, &record, now)?;
        if current == SessionPhase::Ended {
            return Err(SessionError::LinkGeneration {
                message: format!(
                    "session for appointment {} has ended, no link will be issued",
                    appointment_id
                ),
            });
        }

        session.meeting_link = None;
        let url = self.generate_link(&mut session, appointment_id).await?;
        info!("Meeting link regenerated for appointment {}", appointment_id);
        Ok(LinkOutcome {
            url,
            newly_created: true,
        })
    }

    // ==========================================================================
    // PARTICIPATION
    // ==========================================================================

    /// Record one participant entering the consultation. Allowed in the
    /// imminent window and while active; a repeat join is a success without
    /// a second room event.
    #[instrument(skip(self))]
    pub async fn record_join(
        &self,
        appointment_id: Uuid,
        role: ParticipantRole,
    ) -> Result<SessionStatus, SessionError> {
        let record = self.record_for(appointment_id).await?;
        let handle = self.handle_for(appointment_id, &record).await?;
        let mut session = handle.lock().await;

        let now = Utc::now();
        let current = self.phase_of(&session, &record, now)?;
        match current {
            SessionPhase::Upcoming => {
                return Err(SessionError::InvalidPhase {
                    phase: current,
                    message: format!(
                        "session opens {} minutes before the scheduled start and is not yet open",
                        self.config.imminent_window_minutes
                    ),
                });
            }
            SessionPhase::Ended => {
                return Err(SessionError::InvalidPhase {
                    phase: current,
                    message: "session has ended and can no longer be joined".to_string(),
                });
            }
            SessionPhase::Imminent | SessionPhase::Active => {}
        }

        let first_join = !session.join_state(role).joined;
        if first_join {
            let state = session.join_state_mut(role);
            state.joined = true;
            if state.joined_at.is_none() {
                state.joined_at = Some(now);
            }
        }
        session.last_activity_at = now;

        let status = SessionStatus::from_session(&session, current);
        drop(session);

        if first_join {
            info!("{} joined session for appointment {}", role, appointment_id);
            self.events
                .publish(SessionEvent::SessionJoined {
                    appointment_id,
                    role,
                })
                .await;
        } else {
            debug!("{} re-joined session for appointment {}", role, appointment_id);
        }

        Ok(status)
    }

    /// Record one participant leaving. Clears the live flag only; the
    /// first-join timestamp stays for the completion label.
    #[instrument(skip(self))]
    pub async fn record_leave(
        &self,
        appointment_id: Uuid,
        role: ParticipantRole,
    ) -> Result<SessionStatus, SessionError> {
        let record = self.record_for(appointment_id).await?;
        let handle = self.existing_handle(appointment_id).await?;
        let mut session = handle.lock().await;

        let now = Utc::now();
        session.join_state_mut(role).joined = false;
        session.last_activity_at = now;
        debug!("{} left session for appointment {}", role, appointment_id);

        let current = self.phase_of(&session, &record, now)?;
        Ok(SessionStatus::from_session(&session, current))
    }

    /// End the consultation for everyone. The end is sticky: the phase is
    /// `ended` from here on regardless of the clock. Repeat calls succeed
    /// without emitting a second room event.
    #[instrument(skip(self))]
    pub async fn end_session(
        &self,
        appointment_id: Uuid,
        initiator: ParticipantRole,
    ) -> Result<SessionStatus, SessionError> {
        let handle = self.existing_handle(appointment_id).await?;
        let mut session = handle.lock().await;

        if session.ended_explicitly {
            debug!("Session for appointment {} was already ended", appointment_id);
            return Ok(SessionStatus::from_session(&session, SessionPhase::Ended));
        }

        let now = Utc::now();
        session.ended_explicitly = true;
        session.ended_at = Some(now);
        session.ended_by = Some(initiator);
        session.last_activity_at = now;

        let status = SessionStatus::from_session(&session, SessionPhase::Ended);
        drop(session);

        info!("Session for appointment {} ended by {}", appointment_id, initiator);
        self.events
            .publish(SessionEvent::SessionEnded {
                appointment_id,
                ended_by: initiator,
                ended_at: now,
            })
            .await;

        Ok(status)
    }

    /// Current state of one session with the phase freshly computed.
    pub async fn session_status(&self, appointment_id: Uuid) -> Result<SessionStatus, SessionError> {
        let record = self.record_for(appointment_id).await?;
        let handle = self.existing_handle(appointment_id).await?;
        let session = handle.lock().await;

        let current = self.phase_of(&session, &record, Utc::now())?;
        Ok(SessionStatus::from_session(&session, current))
    }

    // ==========================================================================
    // HELPERS
    // ==========================================================================

    async fn record_for(&self, appointment_id: Uuid) -> Result<AppointmentRecord, SessionError> {
        Ok(self.directory.get_appointment(appointment_id).await?)
    }

    async fn approved_record_for_link(
        &self,
        appointment_id: Uuid,
    ) -> Result<AppointmentRecord, SessionError> {
        let record = self.record_for(appointment_id).await?;
        if record.status != AppointmentWorkflowStatus::Approved {
            return Err(SessionError::LinkGeneration {
                message: format!(
                    "appointment {} is {}, links are only issued for approved appointments",
                    appointment_id, record.status
                ),
            });
        }
        Ok(record)
    }

    /// Existing session handle, or a fresh one when the appointment is
    /// approved and the workflow webhook has not reached us yet.
    async fn handle_for(
        &self,
        appointment_id: Uuid,
        record: &AppointmentRecord,
    ) -> Result<SessionHandle, SessionError> {
        if let Some(handle) = self.store.get(appointment_id).await {
            return Ok(handle);
        }
        if record.status == AppointmentWorkflowStatus::Approved {
            let (handle, created) = self.store.get_or_create(appointment_id).await;
            if created {
                debug!(
                    "Session for approved appointment {} created on first touch",
                    appointment_id
                );
            }
            return Ok(handle);
        }
        Err(SessionError::NotFound(format!(
            "no session for appointment {}",
            appointment_id
        )))
    }

    async fn existing_handle(&self, appointment_id: Uuid) -> Result<SessionHandle, SessionError> {
        self.store.get(appointment_id).await.ok_or_else(|| {
            SessionError::NotFound(format!("no session for appointment {}", appointment_id))
        })
    }

    fn phase_of(
        &self,
        session: &Session,
        record: &AppointmentRecord,
        now: DateTime<Utc>,
    ) -> Result<SessionPhase, SessionError> {
        let duration = record
            .duration_minutes
            .unwrap_or(self.config.default_duration_minutes);
        phase::effective(
            session,
            record.start_time,
            Some(duration),
            now,
            self.config.imminent_window_minutes,
        )
    }

    /// Call the room provider with a per-attempt timeout and bounded,
    /// jittered retries. Every attempt that reaches the provider counts,
    /// whether or not it succeeds.
    async fn generate_link(
        &self,
        session: &mut Session,
        appointment_id: Uuid,
    ) -> Result<String, SessionError> {
        let max_attempts = self.config.link_max_attempts.max(1);
        let mut last_error = String::from("no attempt made");

        for attempt in 1..=max_attempts {
            session.link_generation_attempts += 1;

            let call = self.rooms.create_room(appointment_id);
            match timeout(StdDuration::from_secs(self.config.link_timeout_seconds), call).await {
                Ok(Ok(url)) => {
                    session.meeting_link = Some(url.clone());
                    session.last_activity_at = Utc::now();
                    info!(
                        "Provisioned meeting link for appointment {} on attempt {}",
                        appointment_id, attempt
                    );
                    return Ok(url);
                }
                Ok(Err(e)) => {
                    warn!(
                        "Meeting room provisioning failed for appointment {} (attempt {}/{}): {}",
                        appointment_id, attempt, max_attempts, e
                    );
                    last_error = e.to_string();
                }
                Err(_) => {
                    warn!(
                        "Meeting room provisioning timed out for appointment {} (attempt {}/{})",
                        appointment_id, attempt, max_attempts
                    );
                    last_error = format!("timed out after {}s", self.config.link_timeout_seconds);
                }
            }

            if attempt < max_attempts {
                let base = self.config.link_retry_backoff_ms * attempt as u64;
                let jitter = rand::thread_rng().gen_range(0..=self.config.link_retry_backoff_ms / 2);
                sleep(StdDuration::from_millis(base + jitter)).await;
            }
        }

        Err(SessionError::LinkGeneration {
            message: format!("gave up after {} attempts: {}", max_attempts, last_error),
        })
    }
}
