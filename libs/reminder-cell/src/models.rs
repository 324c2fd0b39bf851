// libs/reminder-cell/src/models.rs

use serde::Serialize;
use thiserror::Error;

use shared_clients::ClientError;

/// Template names the notification service renders.
pub mod templates {
    pub const SESSION_IMMINENT: &str = "session_imminent";
}

/// What one pass over the session store did.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SweepSummary {
    /// Sessions whose phase was evaluated.
    pub examined: usize,
    /// Sessions that got their imminent reminder on this pass.
    pub reminded: usize,
    /// Sessions first seen past the window; their reminder was consumed
    /// without sending.
    pub expired: usize,
}

#[derive(Debug, Error)]
pub enum ReminderError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Reminder delivery failed: {message}")]
    Delivery { message: String },

    #[error("Appointment lookup failed: {message}")]
    Directory { message: String },
}

impl From<ClientError> for ReminderError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::NotFound(resource) => ReminderError::NotFound(resource),
            other => ReminderError::Directory {
                message: other.to_string(),
            },
        }
    }
}
