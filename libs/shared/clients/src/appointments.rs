use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::error::ClientError;

const SERVICE: &str = "Appointment directory";

// ==============================================================================
// RECORDS
// ==============================================================================

/// Workflow status of an appointment as tracked by the booking subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentWorkflowStatus {
    Pending,
    Approved,
    Completed,
    Rejected,
    Cancelled,
}

impl fmt::Display for AppointmentWorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AppointmentWorkflowStatus::Pending => "pending",
            AppointmentWorkflowStatus::Approved => "approved",
            AppointmentWorkflowStatus::Completed => "completed",
            AppointmentWorkflowStatus::Rejected => "rejected",
            AppointmentWorkflowStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// Read-only view of an appointment owned by the booking subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub provider_id: Uuid,
    pub patient_name: String,
    pub provider_name: String,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: Option<i64>,
    pub status: AppointmentWorkflowStatus,
    pub reason: Option<String>,
}

// ==============================================================================
// DIRECTORY INTERFACE
// ==============================================================================

#[async_trait]
pub trait AppointmentDirectory: Send + Sync {
    async fn get_appointment(&self, appointment_id: Uuid) -> Result<AppointmentRecord, ClientError>;

    async fn list_appointments(&self) -> Result<Vec<AppointmentRecord>, ClientError>;
}

// ==============================================================================
// REST CLIENT
// ==============================================================================

#[derive(Debug)]
pub struct RestAppointmentDirectory {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestAppointmentDirectory {
    pub fn new(config: &AppConfig) -> Result<Self, ClientError> {
        if !config.is_appointment_api_configured() {
            return Err(ClientError::NotConfigured { service: SERVICE });
        }

        Ok(Self {
            client: Client::new(),
            base_url: config.appointment_api_url.clone(),
            api_key: config.appointment_api_key.clone(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, ClientError> {
        debug!("Fetching {}", url);

        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if status.as_u16() == 404 {
            return Err(ClientError::NotFound(format!("appointment at {}", url)));
        }

        if !status.is_success() {
            error!("Appointment directory error: {} - {}", status, response_text);
            return Err(ClientError::Api {
                service: SERVICE,
                message: format!("HTTP {}: {}", status, response_text),
            });
        }

        serde_json::from_str(&response_text).map_err(|e| ClientError::Malformed {
            service: SERVICE,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl AppointmentDirectory for RestAppointmentDirectory {
    async fn get_appointment(&self, appointment_id: Uuid) -> Result<AppointmentRecord, ClientError> {
        let url = format!("{}/appointments/{}", self.base_url, appointment_id);
        self.get_json(&url).await
    }

    async fn list_appointments(&self) -> Result<Vec<AppointmentRecord>, ClientError> {
        let url = format!("{}/appointments", self.base_url);
        self.get_json(&url).await
    }
}

// ==============================================================================
// IN-MEMORY DIRECTORY
// ==============================================================================

/// Directory backed by a map, for tests and local runs without a booking
/// subsystem. Records are inserted and mutated directly by the harness.
#[derive(Default)]
pub struct InMemoryAppointmentDirectory {
    records: Arc<RwLock<HashMap<Uuid, AppointmentRecord>>>,
}

impl InMemoryAppointmentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, record: AppointmentRecord) {
        self.records.write().await.insert(record.id, record);
    }

    pub async fn set_status(&self, appointment_id: Uuid, status: AppointmentWorkflowStatus) {
        if let Some(record) = self.records.write().await.get_mut(&appointment_id) {
            record.status = status;
        }
    }
}

#[async_trait]
impl AppointmentDirectory for InMemoryAppointmentDirectory {
    async fn get_appointment(&self, appointment_id: Uuid) -> Result<AppointmentRecord, ClientError> {
        self.records
            .read()
            .await
            .get(&appointment_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("appointment {}", appointment_id)))
    }

    async fn list_appointments(&self) -> Result<Vec<AppointmentRecord>, ClientError> {
        let mut records: Vec<AppointmentRecord> =
            self.records.read().await.values().cloned().collect();
        records.sort_by_key(|r| r.start_time);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_record(id: Uuid) -> AppointmentRecord {
        AppointmentRecord {
            id,
            patient_id: Uuid::new_v4(),
            provider_id: Uuid::new_v4(),
            patient_name: "Ana Silva".to_string(),
            provider_name: "Dr. Mendes".to_string(),
            start_time: Utc.with_ymd_and_hms(2025, 6, 10, 14, 0, 0).unwrap(),
            duration_minutes: Some(30),
            status: AppointmentWorkflowStatus::Approved,
            reason: Some("follow-up".to_string()),
        }
    }

    fn rest_config(base_url: &str) -> AppConfig {
        AppConfig {
            appointment_api_url: base_url.to_string(),
            appointment_api_key: "test-key".to_string(),
            ..AppConfig::default()
        }
    }

    #[tokio::test]
    async fn rest_directory_fetches_and_parses_a_record() {
        let server = MockServer::start().await;
        let record = test_record(Uuid::new_v4());

        Mock::given(method("GET"))
            .and(path(format!("/appointments/{}", record.id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(&record))
            .mount(&server)
            .await;

        let directory = RestAppointmentDirectory::new(&rest_config(&server.uri())).unwrap();
        let fetched = directory.get_appointment(record.id).await.unwrap();

        assert_eq!(fetched.id, record.id);
        assert_eq!(fetched.status, AppointmentWorkflowStatus::Approved);
        assert_eq!(fetched.patient_name, "Ana Silva");
    }

    #[tokio::test]
    async fn rest_directory_maps_404_to_not_found() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();

        Mock::given(method("GET"))
            .and(path(format!("/appointments/{}", id)))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let directory = RestAppointmentDirectory::new(&rest_config(&server.uri())).unwrap();
        let result = directory.get_appointment(id).await;

        assert_matches!(result, Err(ClientError::NotFound(_)));
    }

    #[tokio::test]
    async fn rest_directory_surfaces_server_errors() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/appointments"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "boom"})))
            .mount(&server)
            .await;

        let directory = RestAppointmentDirectory::new(&rest_config(&server.uri())).unwrap();
        let result = directory.list_appointments().await;

        assert_matches!(result, Err(ClientError::Api { .. }));
    }

    #[test]
    fn rest_directory_requires_configuration() {
        let config = AppConfig {
            appointment_api_url: String::new(),
            ..AppConfig::default()
        };

        let result = RestAppointmentDirectory::new(&config);
        assert_matches!(result, Err(ClientError::NotConfigured { .. }));
    }

    #[tokio::test]
    async fn in_memory_directory_round_trips_and_lists_in_start_order() {
        let directory = InMemoryAppointmentDirectory::new();

        let mut early = test_record(Uuid::new_v4());
        early.start_time = Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap();
        let mut late = test_record(Uuid::new_v4());
        late.start_time = Utc.with_ymd_and_hms(2025, 6, 10, 16, 0, 0).unwrap();

        directory.insert(late.clone()).await;
        directory.insert(early.clone()).await;

        let listed = directory.list_appointments().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, early.id, "list should be ordered by start time");

        directory
            .set_status(early.id, AppointmentWorkflowStatus::Cancelled)
            .await;
        let fetched = directory.get_appointment(early.id).await.unwrap();
        assert_eq!(fetched.status, AppointmentWorkflowStatus::Cancelled);
    }

    #[tokio::test]
    async fn in_memory_directory_reports_missing_records() {
        let directory = InMemoryAppointmentDirectory::new();
        let result = directory.get_appointment(Uuid::new_v4()).await;
        assert_matches!(result, Err(ClientError::NotFound(_)));
    }

    #[test]
    fn workflow_status_serializes_snake_case() {
        let status = serde_json::to_string(&AppointmentWorkflowStatus::Approved).unwrap();
        assert_eq!(status, "\"approved\"");
        let parsed: AppointmentWorkflowStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(parsed, AppointmentWorkflowStatus::Cancelled);
    }
}
