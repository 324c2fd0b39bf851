// libs/session-cell/src/models.rs
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_clients::AppointmentWorkflowStatus;

// ==============================================================================
// PHASES AND ROLES
// ==============================================================================

/// Where a consultation stands relative to its appointment slot. Never
/// stored; recomputed from the appointment timing on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Upcoming,
    Imminent,
    Active,
    Ended,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionPhase::Upcoming => "upcoming",
            SessionPhase::Imminent => "imminent",
            SessionPhase::Active => "active",
            SessionPhase::Ended => "ended",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    Patient,
    Provider,
}

impl fmt::Display for ParticipantRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParticipantRole::Patient => write!(f, "patient"),
            ParticipantRole::Provider => write!(f, "provider"),
        }
    }
}

// ==============================================================================
// SESSION STATE
// ==============================================================================

/// Join bookkeeping for one role. `joined_at` records the first join and is
/// kept through leaves; the completion label on the dashboard needs to know
/// whether a participant was ever present, not whether they are now.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JoinState {
    pub joined: bool,
    pub joined_at: Option<DateTime<Utc>>,
}

impl JoinState {
    pub fn ever_joined(&self) -> bool {
        self.joined_at.is_some()
    }
}

/// Mutable consultation state for one approved appointment. Timing lives on
/// the appointment record; everything phase-related is derived, so the only
/// phase-adjacent field here is the sticky explicit-end marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub appointment_id: Uuid,
    pub meeting_link: Option<String>,
    pub patient: JoinState,
    pub provider: JoinState,
    pub link_generation_attempts: u32,
    pub ended_explicitly: bool,
    pub ended_at: Option<DateTime<Utc>>,
    pub ended_by: Option<ParticipantRole>,
    pub last_reminder_phase: Option<SessionPhase>,
    pub last_activity_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(appointment_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            appointment_id,
            meeting_link: None,
            patient: JoinState::default(),
            provider: JoinState::default(),
            link_generation_attempts: 0,
            ended_explicitly: false,
            ended_at: None,
            ended_by: None,
            last_reminder_phase: None,
            last_activity_at: now,
            created_at: now,
        }
    }

    pub fn join_state(&self, role: ParticipantRole) -> &JoinState {
        match role {
            ParticipantRole::Patient => &self.patient,
            ParticipantRole::Provider => &self.provider,
        }
    }

    pub fn join_state_mut(&mut self, role: ParticipantRole) -> &mut JoinState {
        match role {
            ParticipantRole::Patient => &mut self.patient,
            ParticipantRole::Provider => &mut self.provider,
        }
    }
}

// ==============================================================================
// REQUEST / RESPONSE TYPES
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct JoinSessionRequest {
    pub role: ParticipantRole,
}

#[derive(Debug, Deserialize)]
pub struct LeaveSessionRequest {
    pub role: ParticipantRole,
}

#[derive(Debug, Deserialize)]
pub struct EndSessionRequest {
    pub initiator: ParticipantRole,
}

#[derive(Debug, Deserialize)]
pub struct StatusChangeRequest {
    pub status: AppointmentWorkflowStatus,
}

/// Result of ensuring a meeting link. `newly_created` lets callers tell a
/// fresh provisioning from a satisfied repeat request.
#[derive(Debug, Clone, Serialize)]
pub struct LinkOutcome {
    pub url: String,
    pub newly_created: bool,
}

/// What the status webhook did with the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusChangeOutcome {
    SessionCreated,
    SessionAlreadyPresent,
    SessionRemoved,
    NoSession,
}

/// Point-in-time view of one session, phase freshly computed.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub appointment_id: Uuid,
    pub phase: SessionPhase,
    pub meeting_link: Option<String>,
    pub patient_joined: bool,
    pub patient_joined_at: Option<DateTime<Utc>>,
    pub provider_joined: bool,
    pub provider_joined_at: Option<DateTime<Utc>>,
    pub link_generation_attempts: u32,
    pub ended_explicitly: bool,
}

impl SessionStatus {
    pub fn from_session(session: &Session, phase: SessionPhase) -> Self {
        Self {
            appointment_id: session.appointment_id,
            phase,
            meeting_link: session.meeting_link.clone(),
            patient_joined: session.patient.joined,
            patient_joined_at: session.patient.joined_at,
            provider_joined: session.provider.joined,
            provider_joined_at: session.provider.joined_at,
            link_generation_attempts: session.link_generation_attempts,
            ended_explicitly: session.ended_explicitly,
        }
    }
}

// ==============================================================================
// SESSION EVENTS
// ==============================================================================

/// Room-scoped events the lifecycle controller hands to the realtime layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    SessionJoined {
        appointment_id: Uuid,
        role: ParticipantRole,
    },
    SessionEnded {
        appointment_id: Uuid,
        ended_by: ParticipantRole,
        ended_at: DateTime<Utc>,
    },
}

impl SessionEvent {
    pub fn appointment_id(&self) -> Uuid {
        match self {
            SessionEvent::SessionJoined { appointment_id, .. } => *appointment_id,
            SessionEvent::SessionEnded { appointment_id, .. } => *appointment_id,
        }
    }
}

/// Outbound seam to the realtime layer. The controller publishes; whoever
/// owns the live connections decides who hears about it. Delivery is
/// best-effort and must never fail the lifecycle operation.
#[async_trait]
pub trait SessionEventSink: Send + Sync {
    async fn publish(&self, event: SessionEvent);
}

/// Sink that drops every event, for wiring without a realtime layer.
pub struct NullEventSink;

#[async_trait]
impl SessionEventSink for NullEventSink {
    async fn publish(&self, _event: SessionEvent) {}
}

// ==============================================================================
// ERROR HANDLING
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("{message}")]
    InvalidPhase {
        phase: SessionPhase,
        message: String,
    },

    #[error("Meeting link generation failed: {message}")]
    LinkGeneration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<shared_clients::ClientError> for SessionError {
    fn from(err: shared_clients::ClientError) -> Self {
        match err {
            shared_clients::ClientError::NotFound(what) => SessionError::NotFound(what),
            other => SessionError::Internal {
                message: other.to_string(),
            },
        }
    }
}
