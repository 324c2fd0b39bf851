// libs/session-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{
    EndSessionRequest, JoinSessionRequest, LeaveSessionRequest, SessionError, StatusChangeRequest,
};
use crate::services::SessionLifecycleService;

fn phase_error(err: SessionError) -> AppError {
    match err {
        SessionError::NotFound(what) => AppError::NotFound(what),
        SessionError::Validation { message } => AppError::ValidationError(message),
        SessionError::InvalidPhase { message, .. } => AppError::InvalidPhase(message),
        SessionError::LinkGeneration { message } => AppError::ExternalService(message),
        SessionError::Internal { message } => AppError::Internal(message),
    }
}

/// Current session status for an appointment
#[axum::debug_handler]
pub async fn get_session_status(
    State(service): State<Arc<SessionLifecycleService>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let status = service
        .session_status(appointment_id)
        .await
        .map_err(phase_error)?;

    Ok(Json(json!(status)))
}

/// Record a participant joining the consultation
#[axum::debug_handler]
pub async fn join_session(
    State(service): State<Arc<SessionLifecycleService>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<JoinSessionRequest>,
) -> Result<Json<Value>, AppError> {
    let status = service
        .record_join(appointment_id, request.role)
        .await
        .map_err(phase_error)?;

    Ok(Json(json!({
        "success": true,
        "session": status
    })))
}

/// Record a participant leaving the consultation
#[axum::debug_handler]
pub async fn leave_session(
    State(service): State<Arc<SessionLifecycleService>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<LeaveSessionRequest>,
) -> Result<Json<Value>, AppError> {
    let status = service
        .record_leave(appointment_id, request.role)
        .await
        .map_err(phase_error)?;

    Ok(Json(json!({
        "success": true,
        "session": status
    })))
}

/// End the consultation for all participants
#[axum::debug_handler]
pub async fn end_session(
    State(service): State<Arc<SessionLifecycleService>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<EndSessionRequest>,
) -> Result<Json<Value>, AppError> {
    let status = service
        .end_session(appointment_id, request.initiator)
        .await
        .map_err(|e| match e {
            SessionError::NotFound(what) => AppError::NotFound(what),
            other => AppError::Internal(other.to_string()),
        })?;

    Ok(Json(json!({
        "success": true,
        "session": status
    })))
}

/// Return the meeting link, provisioning one if needed
#[axum::debug_handler]
pub async fn ensure_meeting_link(
    State(service): State<Arc<SessionLifecycleService>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let outcome = service
        .ensure_link(appointment_id)
        .await
        .map_err(phase_error)?;

    Ok(Json(json!({
        "url": outcome.url,
        "newly_created": outcome.newly_created
    })))
}

/// Replace the meeting link with a freshly provisioned one
#[axum::debug_handler]
pub async fn regenerate_meeting_link(
    State(service): State<Arc<SessionLifecycleService>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let outcome = service
        .regenerate_link(appointment_id)
        .await
        .map_err(phase_error)?;

    Ok(Json(json!({
        "url": outcome.url,
        "newly_created": outcome.newly_created
    })))
}

/// Webhook for appointment workflow changes from the booking subsystem
#[axum::debug_handler]
pub async fn appointment_status_changed(
    State(service): State<Arc<SessionLifecycleService>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<StatusChangeRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = service
        .handle_status_change(appointment_id, request.status)
        .await
        .map_err(phase_error)?;

    Ok(Json(json!({
        "success": true,
        "outcome": outcome
    })))
}

/// Health check endpoint for the session cell
#[axum::debug_handler]
pub async fn session_health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "cell": "session-cell"
    }))
}
