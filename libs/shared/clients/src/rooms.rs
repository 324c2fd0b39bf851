use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::error::ClientError;

const SERVICE: &str = "Meeting room provider";

/// Provisions meeting rooms for consultations. Implementations return an
/// opaque join URL; the core never inspects or parses it.
#[async_trait]
pub trait MeetingRoomProvider: Send + Sync {
    async fn create_room(&self, appointment_id: Uuid) -> Result<String, ClientError>;
}

// ==============================================================================
// REST CLIENT
// ==============================================================================

#[derive(Debug, Serialize)]
struct CreateRoomRequest {
    reference: Uuid,
}

#[derive(Debug, Deserialize)]
struct CreateRoomResponse {
    url: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug)]
pub struct RestMeetingRoomProvider {
    client: Client,
    base_url: String,
    api_token: String,
}

impl RestMeetingRoomProvider {
    pub fn new(config: &AppConfig) -> Result<Self, ClientError> {
        if !config.is_room_service_configured() {
            return Err(ClientError::NotConfigured { service: SERVICE });
        }

        Ok(Self {
            client: Client::new(),
            base_url: config.room_service_url.clone(),
            api_token: config.room_service_token.clone(),
        })
    }

    /// Probe the provider with a minimal request.
    pub async fn health_check(&self) -> Result<bool, ClientError> {
        debug!("Performing room provider health check");

        let url = format!("{}/rooms", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .send()
            .await?;

        let is_healthy = response.status().is_success() || response.status() == 404;
        if !is_healthy {
            warn!("Room provider health check failed: {}", response.status());
        }

        Ok(is_healthy)
    }
}

#[async_trait]
impl MeetingRoomProvider for RestMeetingRoomProvider {
    async fn create_room(&self, appointment_id: Uuid) -> Result<String, ClientError> {
        info!("Requesting meeting room for appointment {}", appointment_id);

        let url = format!("{}/rooms/new", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .header("Content-Type", "application/json")
            .json(&CreateRoomRequest {
                reference: appointment_id,
            })
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            error!("Room creation failed: {} - {}", status, response_text);
            return Err(ClientError::Api {
                service: SERVICE,
                message: format!("HTTP {}: {}", status, response_text),
            });
        }

        let room: CreateRoomResponse =
            serde_json::from_str(&response_text).map_err(|e| ClientError::Malformed {
                service: SERVICE,
                message: e.to_string(),
            })?;

        if let Some(description) = room.error_description {
            error!("Room provider rejected the request: {}", description);
            return Err(ClientError::Api {
                service: SERVICE,
                message: description,
            });
        }

        debug!("Provisioned room for appointment {}", appointment_id);
        Ok(room.url)
    }
}

// ==============================================================================
// LOCAL PROVIDER
// ==============================================================================

/// Provider that mints URLs locally, for tests and runs without a real
/// room service.
#[derive(Default)]
pub struct LocalMeetingRoomProvider {
    created: AtomicU64,
}

impl LocalMeetingRoomProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rooms_created(&self) -> u64 {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MeetingRoomProvider for LocalMeetingRoomProvider {
    async fn create_room(&self, appointment_id: Uuid) -> Result<String, ClientError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(format!(
            "https://rooms.local/join/{}-{}",
            appointment_id,
            Uuid::new_v4()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use wiremock::matchers::{body_json_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn rest_config(base_url: &str) -> AppConfig {
        AppConfig {
            room_service_url: base_url.to_string(),
            room_service_token: "room-token".to_string(),
            ..AppConfig::default()
        }
    }

    #[tokio::test]
    async fn rest_provider_returns_the_room_url() {
        let server = MockServer::start().await;
        let appointment_id = Uuid::new_v4();

        Mock::given(method("POST"))
            .and(path("/rooms/new"))
            .and(header("Authorization", "Bearer room-token"))
            .and(body_json_string(
                json!({"reference": appointment_id}).to_string(),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "url": "https://rooms.example/join/abc123"
            })))
            .mount(&server)
            .await;

        let provider = RestMeetingRoomProvider::new(&rest_config(&server.uri())).unwrap();
        let url = provider.create_room(appointment_id).await.unwrap();

        assert_eq!(url, "https://rooms.example/join/abc123");
    }

    #[tokio::test]
    async fn rest_provider_surfaces_embedded_errors() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rooms/new"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "url": "",
                "error_description": "capacity exhausted"
            })))
            .mount(&server)
            .await;

        let provider = RestMeetingRoomProvider::new(&rest_config(&server.uri())).unwrap();
        let result = provider.create_room(Uuid::new_v4()).await;

        assert_matches!(result, Err(ClientError::Api { message, .. }) => {
            assert_eq!(message, "capacity exhausted");
        });
    }

    #[tokio::test]
    async fn rest_provider_surfaces_http_failures() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rooms/new"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let provider = RestMeetingRoomProvider::new(&rest_config(&server.uri())).unwrap();
        let result = provider.create_room(Uuid::new_v4()).await;

        assert_matches!(result, Err(ClientError::Api { .. }));
    }

    #[test]
    fn rest_provider_requires_configuration() {
        let config = AppConfig {
            room_service_url: String::new(),
            ..AppConfig::default()
        };

        assert_matches!(
            RestMeetingRoomProvider::new(&config),
            Err(ClientError::NotConfigured { .. })
        );
    }

    #[tokio::test]
    async fn local_provider_mints_distinct_urls() {
        let provider = LocalMeetingRoomProvider::new();
        let appointment_id = Uuid::new_v4();

        let first = provider.create_room(appointment_id).await.unwrap();
        let second = provider.create_room(appointment_id).await.unwrap();

        assert_ne!(first, second, "each provisioning call should mint a fresh URL");
        assert_eq!(provider.rooms_created(), 2);
    }
}
