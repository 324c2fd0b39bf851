use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, error};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::error::ClientError;

const SERVICE: &str = "Chat archive";

// ==============================================================================
// RECORDS
// ==============================================================================

/// A conversation between two users, summarised for inbox listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: Uuid,
    pub participant_ids: [Uuid; 2],
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    /// Unread message count per participant.
    pub unread_counts: HashMap<Uuid, u32>,
}

impl Chat {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.participant_ids.contains(&user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub sent_at: DateTime<Utc>,
    pub read: bool,
}

// ==============================================================================
// STORE INTERFACE
// ==============================================================================

/// Durable archive for chat traffic. Message delivery to live sockets is
/// handled elsewhere; this store is the system of record.
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn save_message(&self, message: &ChatMessage) -> Result<(), ClientError>;

    /// Messages of one chat in the order they were saved.
    async fn list_messages(&self, chat_id: Uuid) -> Result<Vec<ChatMessage>, ClientError>;

    /// All chats the user participates in, most recently active first.
    async fn list_chats(&self, user_id: Uuid) -> Result<Vec<Chat>, ClientError>;

    /// Mark every message addressed to `reader_id` in the chat as read.
    /// Returns how many messages changed state.
    async fn mark_read(&self, chat_id: Uuid, reader_id: Uuid) -> Result<u32, ClientError>;
}

// ==============================================================================
// REST CLIENT
// ==============================================================================

pub struct RestChatStore {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct MarkReadResponse {
    marked: u32,
}

impl RestChatStore {
    pub fn new(config: &AppConfig) -> Result<Self, ClientError> {
        if !config.is_chat_api_configured() {
            return Err(ClientError::NotConfigured { service: SERVICE });
        }

        Ok(Self {
            client: Client::new(),
            base_url: config.chat_api_url.clone(),
        })
    }

    async fn check(&self, response: reqwest::Response) -> Result<String, ClientError> {
        let status = response.status();
        let text = response.text().await?;

        if status.as_u16() == 404 {
            return Err(ClientError::NotFound(text));
        }
        if !status.is_success() {
            error!("Chat archive error: {} - {}", status, text);
            return Err(ClientError::Api {
                service: SERVICE,
                message: format!("HTTP {}: {}", status, text),
            });
        }
        Ok(text)
    }

    fn parse<T: serde::de::DeserializeOwned>(&self, text: &str) -> Result<T, ClientError> {
        serde_json::from_str(text).map_err(|e| ClientError::Malformed {
            service: SERVICE,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl ChatStore for RestChatStore {
    async fn save_message(&self, message: &ChatMessage) -> Result<(), ClientError> {
        debug!("Persisting message {} to chat {}", message.id, message.chat_id);

        let url = format!("{}/messages", self.base_url);
        let response = self.client.post(&url).json(message).send().await?;
        self.check(response).await?;
        Ok(())
    }

    async fn list_messages(&self, chat_id: Uuid) -> Result<Vec<ChatMessage>, ClientError> {
        let url = format!("{}/chats/{}/messages", self.base_url, chat_id);
        let response = self.client.get(&url).send().await?;
        let text = self.check(response).await?;
        self.parse(&text)
    }

    async fn list_chats(&self, user_id: Uuid) -> Result<Vec<Chat>, ClientError> {
        let url = format!("{}/chats?user_id={}", self.base_url, user_id);
        let response = self.client.get(&url).send().await?;
        let text = self.check(response).await?;
        self.parse(&text)
    }

    async fn mark_read(&self, chat_id: Uuid, reader_id: Uuid) -> Result<u32, ClientError> {
        let url = format!("{}/chats/{}/read", self.base_url, chat_id);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "reader_id": reader_id }))
            .send()
            .await?;
        let text = self.check(response).await?;
        let marked: MarkReadResponse = self.parse(&text)?;
        Ok(marked.marked)
    }
}

// ==============================================================================
// IN-MEMORY STORE
// ==============================================================================

#[derive(Default)]
struct ChatState {
    chats: HashMap<Uuid, Chat>,
    messages: HashMap<Uuid, Vec<ChatMessage>>,
}

/// Archive backed by maps, for tests and local runs. Preserves save order
/// per chat and maintains the same unread bookkeeping the real archive does.
#[derive(Default)]
pub struct InMemoryChatStore {
    state: Arc<RwLock<ChatState>>,
}

impl InMemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages saved across all chats.
    pub async fn message_count(&self) -> usize {
        self.state.read().await.messages.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl ChatStore for InMemoryChatStore {
    async fn save_message(&self, message: &ChatMessage) -> Result<(), ClientError> {
        let mut state = self.state.write().await;

        let chat = state.chats.entry(message.chat_id).or_insert_with(|| Chat {
            id: message.chat_id,
            participant_ids: [message.sender_id, message.receiver_id],
            last_message: None,
            last_message_at: None,
            unread_counts: HashMap::new(),
        });
        chat.last_message = Some(message.content.clone());
        chat.last_message_at = Some(message.sent_at);
        *chat.unread_counts.entry(message.receiver_id).or_insert(0) += 1;

        state
            .messages
            .entry(message.chat_id)
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn list_messages(&self, chat_id: Uuid) -> Result<Vec<ChatMessage>, ClientError> {
        Ok(self
            .state
            .read()
            .await
            .messages
            .get(&chat_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_chats(&self, user_id: Uuid) -> Result<Vec<Chat>, ClientError> {
        let mut chats: Vec<Chat> = self
            .state
            .read()
            .await
            .chats
            .values()
            .filter(|chat| chat.involves(user_id))
            .cloned()
            .collect();
        chats.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
        Ok(chats)
    }

    async fn mark_read(&self, chat_id: Uuid, reader_id: Uuid) -> Result<u32, ClientError> {
        let mut state = self.state.write().await;

        let mut marked = 0;
        if let Some(messages) = state.messages.get_mut(&chat_id) {
            for message in messages.iter_mut() {
                if message.receiver_id == reader_id && !message.read {
                    message.read = true;
                    marked += 1;
                }
            }
        }
        if let Some(chat) = state.chats.get_mut(&chat_id) {
            chat.unread_counts.insert(reader_id, 0);
        }
        Ok(marked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn message(chat_id: Uuid, sender_id: Uuid, receiver_id: Uuid, content: &str) -> ChatMessage {
        ChatMessage {
            id: Uuid::new_v4(),
            chat_id,
            sender_id,
            receiver_id,
            content: content.to_string(),
            sent_at: Utc::now(),
            read: false,
        }
    }

    #[tokio::test]
    async fn in_memory_store_preserves_save_order() {
        let store = InMemoryChatStore::new();
        let chat_id = Uuid::new_v4();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        for content in ["first", "second", "third"] {
            store.save_message(&message(chat_id, a, b, content)).await.unwrap();
        }

        let messages = store.list_messages(chat_id).await.unwrap();
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn in_memory_store_tracks_unread_counts_per_participant() {
        let store = InMemoryChatStore::new();
        let chat_id = Uuid::new_v4();
        let (patient, provider) = (Uuid::new_v4(), Uuid::new_v4());

        store
            .save_message(&message(chat_id, patient, provider, "hello"))
            .await
            .unwrap();
        store
            .save_message(&message(chat_id, patient, provider, "are you there?"))
            .await
            .unwrap();
        store
            .save_message(&message(chat_id, provider, patient, "yes"))
            .await
            .unwrap();

        let chats = store.list_chats(provider).await.unwrap();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].unread_counts.get(&provider), Some(&2));
        assert_eq!(chats[0].unread_counts.get(&patient), Some(&1));
        assert_eq!(chats[0].last_message.as_deref(), Some("yes"));

        let marked = store.mark_read(chat_id, provider).await.unwrap();
        assert_eq!(marked, 2);

        let chats = store.list_chats(provider).await.unwrap();
        assert_eq!(chats[0].unread_counts.get(&provider), Some(&0));

        // Marking again is a no-op.
        let marked = store.mark_read(chat_id, provider).await.unwrap();
        assert_eq!(marked, 0);
    }

    #[tokio::test]
    async fn in_memory_store_lists_chats_for_participants_only() {
        let store = InMemoryChatStore::new();
        let (a, b, stranger) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        store
            .save_message(&message(Uuid::new_v4(), a, b, "hi"))
            .await
            .unwrap();

        assert_eq!(store.list_chats(a).await.unwrap().len(), 1);
        assert_eq!(store.list_chats(stranger).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn rest_store_saves_and_lists_messages() {
        let server = MockServer::start().await;
        let chat_id = Uuid::new_v4();
        let saved = message(chat_id, Uuid::new_v4(), Uuid::new_v4(), "persisted");

        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/chats/{}/messages", chat_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(vec![saved.clone()]))
            .mount(&server)
            .await;

        let config = AppConfig {
            chat_api_url: server.uri(),
            ..AppConfig::default()
        };
        let store = RestChatStore::new(&config).unwrap();

        store.save_message(&saved).await.unwrap();
        let listed = store.list_messages(chat_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].content, "persisted");
    }

    #[tokio::test]
    async fn rest_store_queries_chats_by_user() {
        let server = MockServer::start().await;
        let user_id = Uuid::new_v4();

        Mock::given(method("GET"))
            .and(path("/chats"))
            .and(query_param("user_id", user_id.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<Chat>::new()))
            .mount(&server)
            .await;

        let config = AppConfig {
            chat_api_url: server.uri(),
            ..AppConfig::default()
        };
        let store = RestChatStore::new(&config).unwrap();

        let chats = store.list_chats(user_id).await.unwrap();
        assert!(chats.is_empty());
    }

    #[tokio::test]
    async fn rest_store_surfaces_persistence_failures() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = AppConfig {
            chat_api_url: server.uri(),
            ..AppConfig::default()
        };
        let store = RestChatStore::new(&config).unwrap();

        let result = store
            .save_message(&message(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), "x"))
            .await;
        assert_matches!(result, Err(ClientError::Api { .. }));
    }
}
