// libs/presence-cell/src/services/bridge.rs
//
// Event sink adapter that fans session lifecycle events out to the live
// connections watching the appointment room. This is the only path from
// the lifecycle controller into the gateway; nothing flows back.

use async_trait::async_trait;
use tracing::debug;

use session_cell::models::{SessionEvent, SessionEventSink};

use crate::models::{RoomKey, ServerEvent};
use crate::services::registry::PresenceRegistry;

#[derive(Clone)]
pub struct RoomEventBridge {
    registry: PresenceRegistry,
}

impl RoomEventBridge {
    pub fn new(registry: PresenceRegistry) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl SessionEventSink for RoomEventBridge {
    async fn publish(&self, event: SessionEvent) {
        let appointment_id = event.appointment_id();
        let server_event = match event {
            SessionEvent::SessionJoined {
                appointment_id,
                role,
            } => ServerEvent::SessionJoined {
                appointment_id,
                role,
            },
            SessionEvent::SessionEnded {
                appointment_id,
                ended_by,
                ended_at,
            } => ServerEvent::SessionEnded {
                appointment_id,
                ended_by,
                ended_at,
            },
        };

        debug!("Relaying session event to appointment room {}", appointment_id);
        self.registry
            .broadcast_to_room(RoomKey::Appointment(appointment_id), server_event)
            .await;
    }
}
