// libs/monitoring-cell/src/router.rs

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::handlers::{get_dashboard, monitoring_health_check};
use crate::services::DashboardProjector;

/// Dashboard routes, nested under /dashboard by the api crate.
pub fn monitoring_routes(projector: Arc<DashboardProjector>) -> Router {
    Router::new()
        .route("/", get(get_dashboard))
        .route("/health", get(monitoring_health_check))
        .with_state(projector)
}
