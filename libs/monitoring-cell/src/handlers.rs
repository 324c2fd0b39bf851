// libs/monitoring-cell/src/handlers.rs

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;

use shared_models::error::AppError;

use crate::models::{DashboardQuery, MonitoringError};
use crate::services::DashboardProjector;

fn monitoring_error(e: MonitoringError) -> AppError {
    match e {
        MonitoringError::Directory { message } => AppError::ExternalService(message),
    }
}

#[axum::debug_handler]
pub async fn get_dashboard(
    State(projector): State<Arc<DashboardProjector>>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<Value>, AppError> {
    let dashboard = projector
        .project(Utc::now(), query.q.as_deref())
        .await
        .map_err(monitoring_error)?;

    Ok(Json(json!(dashboard)))
}

#[axum::debug_handler]
pub async fn monitoring_health_check() -> Result<Json<Value>, AppError> {
    Ok(Json(json!({
        "status": "healthy",
        "cell": "monitoring-cell"
    })))
}
