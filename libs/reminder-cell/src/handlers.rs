// libs/reminder-cell/src/handlers.rs

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::ReminderError;
use crate::services::ReminderDispatcher;

fn reminder_error(e: ReminderError) -> AppError {
    match e {
        ReminderError::NotFound(resource) => AppError::NotFound(resource),
        ReminderError::Delivery { message } => AppError::ExternalService(message),
        ReminderError::Directory { message } => AppError::ExternalService(message),
    }
}

#[axum::debug_handler]
pub async fn resend_reminder(
    State(dispatcher): State<Arc<ReminderDispatcher>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    dispatcher
        .resend(appointment_id)
        .await
        .map_err(reminder_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment_id": appointment_id
    })))
}

#[axum::debug_handler]
pub async fn reminder_health_check() -> Result<Json<Value>, AppError> {
    Ok(Json(json!({
        "status": "healthy",
        "cell": "reminder-cell"
    })))
}
