// libs/presence-cell/src/services/socket.rs
//
// Per-connection socket driver. Splits the upgraded socket into a send
// task draining the registry's outbound queue and an inbound loop that
// parses client events and dispatches them. The connection is closed out
// of the registry on any exit path.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shared_clients::ChatStore;

use crate::models::{ClientEvent, ServerEvent};
use crate::services::registry::PresenceRegistry;
use crate::services::relay::MessageRelay;

#[derive(Clone)]
pub struct PresenceGateway {
    registry: PresenceRegistry,
    relay: MessageRelay,
}

impl PresenceGateway {
    pub fn new(registry: PresenceRegistry, chat_store: Arc<dyn ChatStore>) -> Self {
        let relay = MessageRelay::new(registry.clone(), chat_store);
        Self { registry, relay }
    }

    pub fn registry(&self) -> &PresenceRegistry {
        &self.registry
    }

    pub fn relay(&self) -> &MessageRelay {
        &self.relay
    }

    /// Drive one connection until the client goes away.
    pub async fn run_connection(&self, socket: WebSocket, user_id: Uuid) {
        let (connection_id, mut outbound) = self.registry.connect(user_id).await;
        info!("Connection {} opened for user {}", connection_id, user_id);

        let (mut ws_tx, mut ws_rx) = socket.split();

        // Forward queued server events to the wire. Ends when the queue
        // closes (connection swept or superseded) or the socket rejects a
        // frame.
        let send_task = tokio::spawn(async move {
            while let Some(event) = outbound.recv().await {
                match serde_json::to_string(&event) {
                    Ok(json) => {
                        if ws_tx.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => error!("Failed to serialize server event: {}", e),
                }
            }
        });

        while let Some(Ok(frame)) = ws_rx.next().await {
            match frame {
                Message::Text(text) => {
                    let raw: &str = &text;
                    match serde_json::from_str::<ClientEvent>(raw) {
                        Ok(event) => self.dispatch(connection_id, user_id, event).await,
                        Err(e) => {
                            warn!("Unparseable event from user {}: {}", user_id, e);
                            let _ = self
                                .registry
                                .send_to_connection(
                                    connection_id,
                                    ServerEvent::Error {
                                        code: "parse_error".to_string(),
                                        message: format!("unrecognized client event: {}", e),
                                    },
                                )
                                .await;
                        }
                    }
                }
                Message::Close(_) => break,
                _ => {} // Ignore binary; ping/pong handled by the protocol layer
            }
        }

        self.registry.disconnect(connection_id).await;
        send_task.abort();
        info!("Connection {} closed for user {}", connection_id, user_id);
    }

    async fn dispatch(&self, connection_id: Uuid, user_id: Uuid, event: ClientEvent) {
        match event {
            ClientEvent::Heartbeat => self.registry.heartbeat(connection_id).await,
            ClientEvent::JoinRoom { room } => {
                self.registry.join_room(connection_id, room).await;
            }
            ClientEvent::LeaveRoom { room } => {
                self.registry.leave_room(connection_id, room).await;
            }
            ClientEvent::Chat {
                chat_id,
                receiver_id,
                body,
                client_ref,
            } => {
                let ack = self
                    .relay
                    .relay_chat(user_id, chat_id, receiver_id, body, client_ref)
                    .await;
                if let Err(e) = self.registry.send_to_connection(connection_id, ack).await {
                    debug!("Ack for connection {} undeliverable: {}", connection_id, e);
                }
            }
            ClientEvent::Typing { chat_id } => self.relay.relay_typing(user_id, chat_id).await,
            ClientEvent::MarkRead { chat_id } => {
                if let Err(e) = self.relay.mark_read(chat_id, user_id).await {
                    warn!("Read receipt failed for chat {}: {}", chat_id, e);
                }
            }
        }
    }
}
