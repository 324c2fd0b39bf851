// libs/reminder-cell/src/router.rs

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers::{reminder_health_check, resend_reminder};
use crate::services::ReminderDispatcher;

/// Reminder routes, nested under /reminders by the api crate.
pub fn reminder_routes(dispatcher: Arc<ReminderDispatcher>) -> Router {
    Router::new()
        .route("/health", get(reminder_health_check))
        .route("/{appointment_id}/resend", post(resend_reminder))
        .with_state(dispatcher)
}
