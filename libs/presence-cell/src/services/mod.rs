// libs/presence-cell/src/services/mod.rs

pub mod bridge;
pub mod registry;
pub mod relay;
pub mod socket;

pub use bridge::RoomEventBridge;
pub use registry::{PresenceRegistry, PresenceSweeper};
pub use relay::MessageRelay;
pub use socket::PresenceGateway;
