//! Shared Clients
//!
//! Typed interfaces to the collaborator services the consultation core
//! depends on: the appointment directory, the meeting room provider, the
//! chat archive and the notification sender. Each interface ships with a
//! REST implementation for deployed environments and an in-memory
//! implementation for tests and local runs.

pub mod appointments;
pub mod chat;
pub mod error;
pub mod notify;
pub mod rooms;

pub use appointments::{
    AppointmentDirectory, AppointmentRecord, AppointmentWorkflowStatus, InMemoryAppointmentDirectory,
    RestAppointmentDirectory,
};
pub use chat::{Chat, ChatMessage, ChatStore, InMemoryChatStore, RestChatStore};
pub use error::ClientError;
pub use notify::{Notifier, RecordingNotifier, RestNotifier, SentNotification};
pub use rooms::{LocalMeetingRoomProvider, MeetingRoomProvider, RestMeetingRoomProvider};
