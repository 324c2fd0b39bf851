// libs/session-cell/src/services/mod.rs

pub mod lifecycle;
pub mod phase;
pub mod store;

pub use lifecycle::SessionLifecycleService;
pub use store::{SessionHandle, SessionStore};
