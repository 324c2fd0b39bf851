use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, error};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::error::ClientError;

const SERVICE: &str = "Notification sender";

/// Sends a templated notification to one user. Channel selection (push,
/// email, SMS) is the sender's concern, not ours.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: Uuid, template: &str, data: Value) -> Result<(), ClientError>;
}

// ==============================================================================
// REST CLIENT
// ==============================================================================

pub struct RestNotifier {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestNotifier {
    pub fn new(config: &AppConfig) -> Result<Self, ClientError> {
        if !config.is_notifier_configured() {
            return Err(ClientError::NotConfigured { service: SERVICE });
        }

        Ok(Self {
            client: Client::new(),
            base_url: config.notify_api_url.clone(),
            api_key: config.notify_api_key.clone(),
        })
    }
}

#[async_trait]
impl Notifier for RestNotifier {
    async fn notify(&self, user_id: Uuid, template: &str, data: Value) -> Result<(), ClientError> {
        debug!("Sending '{}' notification to {}", template, user_id);

        let url = format!("{}/notifications", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&json!({
                "user_id": user_id,
                "template": template,
                "data": data,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await?;
            error!("Notification send failed: {} - {}", status, text);
            return Err(ClientError::Api {
                service: SERVICE,
                message: format!("HTTP {}: {}", status, text),
            });
        }

        Ok(())
    }
}

// ==============================================================================
// RECORDING NOTIFIER
// ==============================================================================

#[derive(Debug, Clone)]
pub struct SentNotification {
    pub user_id: Uuid,
    pub template: String,
    pub data: Value,
    pub sent_at: DateTime<Utc>,
}

/// Notifier that records instead of sending, for tests and local runs.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<SentNotification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_to(&self, user_id: Uuid) -> Vec<SentNotification> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, user_id: Uuid, template: &str, data: Value) -> Result<(), ClientError> {
        self.sent.lock().await.push(SentNotification {
            user_id,
            template: template.to_string(),
            data,
            sent_at: Utc::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn rest_notifier_posts_the_payload() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/notifications"))
            .and(header("Authorization", "Bearer notify-key"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let config = AppConfig {
            notify_api_url: server.uri(),
            notify_api_key: "notify-key".to_string(),
            ..AppConfig::default()
        };
        let notifier = RestNotifier::new(&config).unwrap();

        notifier
            .notify(Uuid::new_v4(), "session_ready", json!({"minutes": 10}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rest_notifier_surfaces_failures() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/notifications"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let config = AppConfig {
            notify_api_url: server.uri(),
            notify_api_key: "notify-key".to_string(),
            ..AppConfig::default()
        };
        let notifier = RestNotifier::new(&config).unwrap();

        let result = notifier.notify(Uuid::new_v4(), "session_ready", json!({})).await;
        assert_matches!(result, Err(ClientError::Api { .. }));
    }

    #[tokio::test]
    async fn recording_notifier_captures_sends_in_order() {
        let notifier = RecordingNotifier::new();
        let user = Uuid::new_v4();

        notifier.notify(user, "first", json!({})).await.unwrap();
        notifier.notify(user, "second", json!({})).await.unwrap();
        notifier.notify(Uuid::new_v4(), "other", json!({})).await.unwrap();

        let to_user = notifier.sent_to(user).await;
        assert_eq!(to_user.len(), 2);
        assert_eq!(to_user[0].template, "first");
        assert_eq!(to_user[1].template, "second");
        assert_eq!(notifier.sent().await.len(), 3);
    }
}
