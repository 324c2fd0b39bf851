// libs/session-cell/src/lib.rs
//! # Session Cell
//!
//! Owns the video-consultation lifecycle: a session exists per approved
//! appointment, its phase (`upcoming -> imminent -> active -> ended`) is
//! derived from the appointment slot on every read, and participants join,
//! leave and end it through the lifecycle controller.
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------+
//! |                     Session Cell                       |
//! +--------------------------------------------------------+
//! |  handlers.rs     |  HTTP endpoint handlers             |
//! |  router.rs       |  Route definitions                  |
//! |  models.rs       |  Session state, events, errors      |
//! |  services/       |  Business logic layer               |
//! |    phase.rs      |  Pure phase arithmetic              |
//! |    store.rs      |  Per-appointment session registry   |
//! |    lifecycle.rs  |  Links, joins, ends, status webhook |
//! +--------------------------------------------------------+
//! ```
//!
//! The cell reads appointment timing through the `AppointmentDirectory`
//! collaborator and provisions meeting rooms through `MeetingRoomProvider`.
//! Room-scoped events (`session_joined`, `session_ended`) leave through the
//! `SessionEventSink` seam; the presence cell implements it.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

// Re-export commonly used types
pub use models::{
    JoinState, LinkOutcome, NullEventSink, ParticipantRole, Session, SessionError, SessionEvent,
    SessionEventSink, SessionPhase, SessionStatus, StatusChangeOutcome,
};

pub use services::{phase, SessionHandle, SessionLifecycleService, SessionStore};

pub use router::session_routes;
