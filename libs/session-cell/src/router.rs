// libs/session-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::*;
use crate::services::SessionLifecycleService;

/// Creates the session lifecycle routes, mounted under `/sessions` by the API
pub fn session_routes(service: Arc<SessionLifecycleService>) -> Router {
    Router::new()
        .route("/health", get(session_health_check))
        .route("/{appointment_id}", get(get_session_status))
        .route("/{appointment_id}/join", post(join_session))
        .route("/{appointment_id}/leave", post(leave_session))
        .route("/{appointment_id}/end", post(end_session))
        .route("/{appointment_id}/link", post(ensure_meeting_link))
        .route("/{appointment_id}/link/regenerate", post(regenerate_meeting_link))
        .route("/{appointment_id}/status", post(appointment_status_changed))
        .with_state(service)
}
