// =====================================================================================
// MONITORING CELL - ADMIN DASHBOARD PROJECTION
// =====================================================================================
//
// Read-only view over the live session store for clinic staff:
// - Buckets every tracked session into active / upcoming / past by its
//   computed phase at query time
// - Case-insensitive name and reason filtering
// - Completion labels for ended sessions derived from who ever joined
//
// =====================================================================================

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

// Re-export commonly used types
pub use models::{
    CompletionLabel, Dashboard, DashboardCounts, DashboardEntry, DashboardQuery, MonitoringError,
};

pub use services::DashboardProjector;

pub use router::monitoring_routes;
