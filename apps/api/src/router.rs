use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use monitoring_cell::{monitoring_routes, DashboardProjector};
use presence_cell::{presence_routes, PresenceGateway};
use reminder_cell::{reminder_routes, ReminderDispatcher};
use session_cell::{session_routes, SessionLifecycleService};

pub fn create_router(
    sessions: Arc<SessionLifecycleService>,
    gateway: Arc<PresenceGateway>,
    reminders: Arc<ReminderDispatcher>,
    projector: Arc<DashboardProjector>,
) -> Router {
    Router::new()
        .route("/", get(|| async { "Telecare Session API is running!" }))
        .nest("/sessions", session_routes(sessions))
        .nest("/reminders", reminder_routes(reminders))
        .nest("/dashboard", monitoring_routes(projector))
        // Socket and chat endpoints live at the root
        .merge(presence_routes(gateway))
}
