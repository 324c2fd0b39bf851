// =====================================================================================
// MONITORING CELL MODELS
// =====================================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use session_cell::SessionPhase;
use shared_clients::ClientError;

/// How an ended consultation actually went, derived once from the
/// ever-joined flags of both participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionLabel {
    Completed,
    ProviderOnly,
    PatientOnly,
    NoShow,
}

impl CompletionLabel {
    pub fn derive(provider_ever_joined: bool, patient_ever_joined: bool) -> Self {
        match (provider_ever_joined, patient_ever_joined) {
            (true, true) => CompletionLabel::Completed,
            (true, false) => CompletionLabel::ProviderOnly,
            (false, true) => CompletionLabel::PatientOnly,
            (false, false) => CompletionLabel::NoShow,
        }
    }
}

/// One session as the admin dashboard shows it.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardEntry {
    pub appointment_id: Uuid,
    pub patient_name: String,
    pub provider_name: String,
    pub reason: Option<String>,
    pub start_time: DateTime<Utc>,
    pub phase: SessionPhase,
    pub patient_joined: bool,
    pub provider_joined: bool,
    pub meeting_link: Option<String>,
    /// Present only for ended sessions.
    pub completion: Option<CompletionLabel>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DashboardCounts {
    pub active: usize,
    pub upcoming: usize,
    pub past: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub active: Vec<DashboardEntry>,
    pub upcoming: Vec<DashboardEntry>,
    pub past: Vec<DashboardEntry>,
    pub counts: DashboardCounts,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    /// Case-insensitive substring over participant names and reason.
    pub q: Option<String>,
}

#[derive(Debug, Error)]
pub enum MonitoringError {
    #[error("Appointment lookup failed: {message}")]
    Directory { message: String },
}

impl From<ClientError> for MonitoringError {
    fn from(e: ClientError) -> Self {
        MonitoringError::Directory {
            message: e.to_string(),
        }
    }
}
