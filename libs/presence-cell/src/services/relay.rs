// libs/presence-cell/src/services/relay.rs
//
// Chat relay between live connections. Messages are persisted before any
// live delivery is attempted, so a receiver that is offline or drops
// mid-send still finds the message in history. The sender always gets a
// message_ack resolving its optimistic entry.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, instrument};
use uuid::Uuid;

use shared_clients::{Chat, ChatMessage, ChatStore, ClientError};

use crate::models::{DeliveryState, PresenceError, RoomKey, ServerEvent};
use crate::services::registry::PresenceRegistry;

/// How long a typing indicator stays valid on the receiving client.
pub const TYPING_EXPIRY_MS: u64 = 3_000;

#[derive(Clone)]
pub struct MessageRelay {
    registry: PresenceRegistry,
    chat_store: Arc<dyn ChatStore>,
}

impl MessageRelay {
    pub fn new(registry: PresenceRegistry, chat_store: Arc<dyn ChatStore>) -> Self {
        Self {
            registry,
            chat_store,
        }
    }

    /// Persist the message, then deliver it to the receiver's live
    /// connection if there is one. Returns the acknowledgment for the
    /// sender; `client_ref` ties it back to the sender's optimistic entry.
    #[instrument(skip(self, body))]
    pub async fn relay_chat(
        &self,
        sender_id: Uuid,
        chat_id: Uuid,
        receiver_id: Uuid,
        body: String,
        client_ref: String,
    ) -> ServerEvent {
        let message = ChatMessage {
            id: Uuid::new_v4(),
            chat_id,
            sender_id,
            receiver_id,
            content: body,
            sent_at: Utc::now(),
            read: false,
        };

        match self.chat_store.save_message(&message).await {
            Ok(()) => {
                // Live delivery is best effort; the store is the source of
                // truth and the receiver catches up from history.
                if let Err(e) = self
                    .registry
                    .send_to_user(
                        receiver_id,
                        ServerEvent::MessageReceived {
                            message: message.clone(),
                        },
                    )
                    .await
                {
                    debug!("Receiver {} not reachable live: {}", receiver_id, e);
                }

                ServerEvent::MessageAck {
                    client_ref,
                    state: DeliveryState::Confirmed,
                    message_id: Some(message.id),
                    reason: None,
                }
            }
            Err(e) => {
                error!("Failed to persist chat message for {}: {}", chat_id, e);
                ServerEvent::MessageAck {
                    client_ref,
                    state: DeliveryState::Failed,
                    message_id: None,
                    reason: Some(e.to_string()),
                }
            }
        }
    }

    /// Fan a typing indicator out to the chat room, skipping the typist.
    /// Never persisted; receivers let it lapse after `expires_in_ms`.
    pub async fn relay_typing(&self, sender_id: Uuid, chat_id: Uuid) {
        self.registry
            .broadcast_to_room_except(
                RoomKey::Chat(chat_id),
                sender_id,
                ServerEvent::Typing {
                    chat_id,
                    user_id: sender_id,
                    expires_in_ms: TYPING_EXPIRY_MS,
                },
            )
            .await;
    }

    #[instrument(skip(self))]
    pub async fn mark_read(&self, chat_id: Uuid, reader_id: Uuid) -> Result<u32, PresenceError> {
        self.chat_store
            .mark_read(chat_id, reader_id)
            .await
            .map_err(store_error)
    }

    pub async fn list_chats(&self, user_id: Uuid) -> Result<Vec<Chat>, PresenceError> {
        self.chat_store.list_chats(user_id).await.map_err(store_error)
    }

    pub async fn list_messages(&self, chat_id: Uuid) -> Result<Vec<ChatMessage>, PresenceError> {
        self.chat_store
            .list_messages(chat_id)
            .await
            .map_err(store_error)
    }
}

fn store_error(e: ClientError) -> PresenceError {
    match e {
        ClientError::NotFound(resource) => PresenceError::NotFound(resource),
        other => PresenceError::Persistence {
            message: other.to_string(),
        },
    }
}
