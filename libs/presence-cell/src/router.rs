// libs/presence-cell/src/router.rs

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers::{
    list_chat_messages, list_chats, mark_chat_read, presence_health_check, presence_ws_handler,
};
use crate::services::PresenceGateway;

/// Presence and chat routes. Mounted at the application root so clients
/// reach the socket at /ws and chat history under /chats.
pub fn presence_routes(gateway: Arc<PresenceGateway>) -> Router {
    Router::new()
        .route("/ws", get(presence_ws_handler))
        .route("/chats", get(list_chats))
        .route("/chats/{chat_id}/messages", get(list_chat_messages))
        .route("/chats/{chat_id}/read", post(mark_chat_read))
        .route("/presence/health", get(presence_health_check))
        .with_state(gateway)
}
