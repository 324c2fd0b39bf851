// libs/presence-cell/src/handlers.rs

use axum::{
    extract::{Path, Query, State, WebSocketUpgrade},
    response::Response,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{ChatListQuery, MarkReadRequest, PresenceError, WsQuery};
use crate::services::PresenceGateway;

fn presence_error(e: PresenceError) -> AppError {
    match e {
        PresenceError::NotFound(resource) => AppError::NotFound(resource),
        PresenceError::Persistence { message } => AppError::ExternalService(message),
        PresenceError::ConnectionLost { user_id } => {
            AppError::Internal(format!("Connection lost for user {}", user_id))
        }
    }
}

/// Upgrade to the presence/chat event stream for the given user.
pub async fn presence_ws_handler(
    ws: WebSocketUpgrade,
    State(gateway): State<Arc<PresenceGateway>>,
    Query(query): Query<WsQuery>,
) -> Response {
    info!("WebSocket upgrade requested by user {}", query.user_id);
    ws.on_upgrade(move |socket| async move {
        gateway.run_connection(socket, query.user_id).await;
    })
}

#[axum::debug_handler]
pub async fn list_chats(
    State(gateway): State<Arc<PresenceGateway>>,
    Query(query): Query<ChatListQuery>,
) -> Result<Json<Value>, AppError> {
    let chats = gateway
        .relay()
        .list_chats(query.user_id)
        .await
        .map_err(presence_error)?;

    Ok(Json(json!({
        "chats": chats,
        "total": chats.len()
    })))
}

#[axum::debug_handler]
pub async fn list_chat_messages(
    State(gateway): State<Arc<PresenceGateway>>,
    Path(chat_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let messages = gateway
        .relay()
        .list_messages(chat_id)
        .await
        .map_err(presence_error)?;

    Ok(Json(json!({
        "messages": messages,
        "total": messages.len()
    })))
}

#[axum::debug_handler]
pub async fn mark_chat_read(
    State(gateway): State<Arc<PresenceGateway>>,
    Path(chat_id): Path<Uuid>,
    Json(payload): Json<MarkReadRequest>,
) -> Result<Json<Value>, AppError> {
    let marked = gateway
        .relay()
        .mark_read(chat_id, payload.reader_id)
        .await
        .map_err(presence_error)?;

    Ok(Json(json!({
        "success": true,
        "marked": marked
    })))
}

#[axum::debug_handler]
pub async fn presence_health_check(
    State(gateway): State<Arc<PresenceGateway>>,
) -> Result<Json<Value>, AppError> {
    let online = gateway.registry().online_users().await;

    Ok(Json(json!({
        "status": "healthy",
        "cell": "presence-cell",
        "online_users": online.len()
    })))
}
