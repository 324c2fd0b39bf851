// libs/monitoring-cell/src/services/mod.rs

pub mod projector;

pub use projector::DashboardProjector;
