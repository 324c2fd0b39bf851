// libs/presence-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use session_cell::ParticipantRole;
use shared_clients::ChatMessage;

// ==============================================================================
// ROOMS
// ==============================================================================

/// Scope for targeted fan-out. Membership is per-connection and dies with
/// the connection; clients re-join rooms after reconnecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RoomKey {
    Appointment(Uuid),
    Chat(Uuid),
}

// ==============================================================================
// WIRE EVENTS
// ==============================================================================

/// Frames a client may send over the socket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    Heartbeat,
    JoinRoom {
        room: RoomKey,
    },
    LeaveRoom {
        room: RoomKey,
    },
    Chat {
        chat_id: Uuid,
        receiver_id: Uuid,
        body: String,
        /// Client-side reference for reconciling the optimistic entry.
        client_ref: String,
    },
    Typing {
        chat_id: Uuid,
    },
    MarkRead {
        chat_id: Uuid,
    },
}

/// Reconciliation state the sender applies to its optimistic entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    Pending,
    Confirmed,
    Failed,
}

/// Frames the server pushes to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    PresenceUpdate {
        online: Vec<Uuid>,
    },
    MessageReceived {
        message: ChatMessage,
    },
    MessageAck {
        client_ref: String,
        state: DeliveryState,
        message_id: Option<Uuid>,
        reason: Option<String>,
    },
    Typing {
        chat_id: Uuid,
        user_id: Uuid,
        expires_in_ms: u64,
    },
    SessionJoined {
        appointment_id: Uuid,
        role: ParticipantRole,
    },
    SessionEnded {
        appointment_id: Uuid,
        ended_by: ParticipantRole,
        ended_at: DateTime<Utc>,
    },
    Error {
        code: String,
        message: String,
    },
}

// ==============================================================================
// HTTP REQUEST TYPES
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ChatListQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct MarkReadRequest {
    pub reader_id: Uuid,
}

// ==============================================================================
// ERROR HANDLING
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PresenceError {
    #[error("No live connection for user {user_id}")]
    ConnectionLost { user_id: Uuid },

    #[error("Persistence failed: {message}")]
    Persistence { message: String },

    #[error("Not found: {0}")]
    NotFound(String),
}
