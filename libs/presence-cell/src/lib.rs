// libs/presence-cell/src/lib.rs

//! # Presence Cell
//!
//! Real-time presence and chat gateway for consultation sessions.
//! Holds one live WebSocket connection per user, tracks room membership
//! for appointment and chat rooms, relays chat messages through the
//! persistent store, and fans session lifecycle events out to the
//! appointment room.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Presence Cell                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  WebSocket Endpoint (/ws?user_id=)                          │
//! │  ├── PresenceGateway (socket driver, event dispatch)        │
//! │  ├── PresenceRegistry (connections, rooms, online set)      │
//! │  │   └── PresenceSweeper (grace + heartbeat expiry)         │
//! │  ├── MessageRelay (persist-then-deliver chat, typing)       │
//! │  └── RoomEventBridge (session events -> appointment rooms)  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  HTTP Endpoints                                             │
//! │  ├── GET  /chats?user_id=                                   │
//! │  ├── GET  /chats/{chat_id}/messages                         │
//! │  ├── POST /chats/{chat_id}/read                             │
//! │  └── GET  /presence/health                                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

// Re-export commonly used types
pub use models::{
    ClientEvent, DeliveryState, PresenceError, RoomKey, ServerEvent, WsQuery,
};

pub use services::{
    MessageRelay, PresenceGateway, PresenceRegistry, PresenceSweeper, RoomEventBridge,
};

pub use router::presence_routes;
