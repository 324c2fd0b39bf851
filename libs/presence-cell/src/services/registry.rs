// libs/presence-cell/src/services/registry.rs
//
// Live-connection registry. One connection per user: a fresh connect
// supersedes the previous handle, whose outbound channel closes and takes
// the old socket loop down with it. Entries survive a short grace window
// after disconnect so a reconnect does not flap the presence set.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::models::{PresenceError, RoomKey, ServerEvent};

const OUTBOUND_BUFFER: usize = 256;

pub type EventSender = mpsc::Sender<ServerEvent>;
pub type EventReceiver = mpsc::Receiver<ServerEvent>;

struct ConnectionHandle {
    user_id: Uuid,
    sender: EventSender,
    last_seen_at: DateTime<Utc>,
    disconnected_at: Option<DateTime<Utc>>,
    rooms: HashSet<RoomKey>,
}

#[derive(Default)]
struct RegistryState {
    connections: HashMap<Uuid, ConnectionHandle>,
    by_user: HashMap<Uuid, Uuid>,
}

pub struct PresenceRegistry {
    state: Arc<RwLock<RegistryState>>,
    /// No heartbeat for this long means the link is dead.
    stale_after: ChronoDuration,
    /// How long a closed connection may linger before the user goes offline.
    grace: ChronoDuration,
}

impl PresenceRegistry {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(RegistryState::default())),
            stale_after: ChronoDuration::seconds(2 * config.heartbeat_interval_seconds as i64),
            grace: ChronoDuration::seconds(config.presence_grace_seconds as i64),
        }
    }

    // ==========================================================================
    // CONNECTION LIFECYCLE
    // ==========================================================================

    /// Register a connection for the user and hand back its outbound queue.
    /// An existing connection for the same user is superseded.
    pub async fn connect(&self, user_id: Uuid) -> (Uuid, EventReceiver) {
        let connection_id = Uuid::new_v4();
        let (sender, receiver) = mpsc::channel(OUTBOUND_BUFFER);

        {
            let mut state = self.state.write().await;

            if let Some(old_id) = state.by_user.insert(user_id, connection_id) {
                if state.connections.remove(&old_id).is_some() {
                    info!(
                        "Connection {} for user {} superseded by {}",
                        old_id, user_id, connection_id
                    );
                }
            }

            state.connections.insert(
                connection_id,
                ConnectionHandle {
                    user_id,
                    sender,
                    last_seen_at: Utc::now(),
                    disconnected_at: None,
                    rooms: HashSet::new(),
                },
            );
        }

        debug!("User {} connected as {}", user_id, connection_id);
        self.broadcast_presence().await;
        (connection_id, receiver)
    }

    /// Mark the connection closed. The entry stays until the grace window
    /// elapses; room membership dies immediately.
    pub async fn disconnect(&self, connection_id: Uuid) {
        let mut state = self.state.write().await;
        if let Some(handle) = state.connections.get_mut(&connection_id) {
            handle.disconnected_at = Some(Utc::now());
            handle.rooms.clear();
            debug!(
                "Connection {} for user {} closed, grace window started",
                connection_id, handle.user_id
            );
        }
    }

    /// Record liveness for the connection.
    pub async fn heartbeat(&self, connection_id: Uuid) {
        let mut state = self.state.write().await;
        if let Some(handle) = state.connections.get_mut(&connection_id) {
            handle.last_seen_at = Utc::now();
        }
    }

    // ==========================================================================
    // ROOMS
    // ==========================================================================

    pub async fn join_room(&self, connection_id: Uuid, room: RoomKey) -> bool {
        let mut state = self.state.write().await;
        match state.connections.get_mut(&connection_id) {
            Some(handle) => {
                handle.rooms.insert(room);
                debug!("Connection {} joined room {:?}", connection_id, room);
                true
            }
            None => {
                warn!("Room join for unknown connection {}", connection_id);
                false
            }
        }
    }

    pub async fn leave_room(&self, connection_id: Uuid, room: RoomKey) {
        let mut state = self.state.write().await;
        if let Some(handle) = state.connections.get_mut(&connection_id) {
            handle.rooms.remove(&room);
            debug!("Connection {} left room {:?}", connection_id, room);
        }
    }

    // ==========================================================================
    // QUERIES
    // ==========================================================================

    /// Users currently considered online, including those inside the
    /// disconnect grace window.
    pub async fn online_users(&self) -> Vec<Uuid> {
        let state = self.state.read().await;
        let mut online: Vec<Uuid> = state.by_user.keys().copied().collect();
        online.sort();
        online
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.state.read().await.by_user.contains_key(&user_id)
    }

    pub async fn connection_count(&self) -> usize {
        self.state.read().await.connections.len()
    }

    // ==========================================================================
    // DELIVERY
    // ==========================================================================

    pub async fn send_to_user(&self, user_id: Uuid, event: ServerEvent) -> Result<(), PresenceError> {
        let sender = {
            let state = self.state.read().await;
            state
                .by_user
                .get(&user_id)
                .and_then(|id| state.connections.get(id))
                .map(|handle| handle.sender.clone())
        };

        match sender {
            Some(sender) => sender
                .send(event)
                .await
                .map_err(|_| PresenceError::ConnectionLost { user_id }),
            None => Err(PresenceError::ConnectionLost { user_id }),
        }
    }

    pub async fn send_to_connection(
        &self,
        connection_id: Uuid,
        event: ServerEvent,
    ) -> Result<(), PresenceError> {
        let entry = {
            let state = self.state.read().await;
            state
                .connections
                .get(&connection_id)
                .map(|handle| (handle.user_id, handle.sender.clone()))
        };

        match entry {
            Some((user_id, sender)) => sender
                .send(event)
                .await
                .map_err(|_| PresenceError::ConnectionLost { user_id }),
            None => Err(PresenceError::NotFound(format!(
                "connection {}",
                connection_id
            ))),
        }
    }

    /// Deliver to every live connection, dropping sends that fail.
    pub async fn broadcast(&self, event: ServerEvent) {
        let senders: Vec<EventSender> = {
            let state = self.state.read().await;
            state
                .connections
                .values()
                .map(|handle| handle.sender.clone())
                .collect()
        };

        for sender in senders {
            if sender.send(event.clone()).await.is_err() {
                debug!("Dropped broadcast to a closed connection");
            }
        }
    }

    /// Deliver to every connection that joined the room.
    pub async fn broadcast_to_room(&self, room: RoomKey, event: ServerEvent) {
        self.room_fanout(room, None, event).await;
    }

    /// Room delivery that skips one user, for echoes of their own action.
    pub async fn broadcast_to_room_except(
        &self,
        room: RoomKey,
        excluded_user: Uuid,
        event: ServerEvent,
    ) {
        self.room_fanout(room, Some(excluded_user), event).await;
    }

    async fn room_fanout(&self, room: RoomKey, excluded_user: Option<Uuid>, event: ServerEvent) {
        let senders: Vec<EventSender> = {
            let state = self.state.read().await;
            state
                .connections
                .values()
                .filter(|handle| handle.rooms.contains(&room))
                .filter(|handle| excluded_user != Some(handle.user_id))
                .map(|handle| handle.sender.clone())
                .collect()
        };

        for sender in senders {
            if sender.send(event.clone()).await.is_err() {
                debug!("Dropped room event to a closed connection");
            }
        }
    }

    /// Push the current online set to everyone.
    pub async fn broadcast_presence(&self) {
        let online = self.online_users().await;
        self.broadcast(ServerEvent::PresenceUpdate { online }).await;
    }

    // ==========================================================================
    // SWEEPING
    // ==========================================================================

    /// Remove entries whose grace window elapsed without a reconnect and
    /// entries whose heartbeat went stale. Rebroadcasts presence after any
    /// removal. `now` is explicit so sweeps are testable.
    pub async fn sweep(&self, now: DateTime<Utc>) -> usize {
        let removed = {
            let mut state = self.state.write().await;

            let expired: Vec<Uuid> = state
                .connections
                .iter()
                .filter(|(_, handle)| {
                    let grace_elapsed = handle
                        .disconnected_at
                        .map(|at| now - at >= self.grace)
                        .unwrap_or(false);
                    let heartbeat_stale = now - handle.last_seen_at >= self.stale_after;
                    grace_elapsed || heartbeat_stale
                })
                .map(|(id, _)| *id)
                .collect();

            for connection_id in &expired {
                if let Some(handle) = state.connections.remove(connection_id) {
                    // Only unmap the user if this was still their current
                    // connection; a reconnect may have replaced it already.
                    if state.by_user.get(&handle.user_id) == Some(connection_id) {
                        state.by_user.remove(&handle.user_id);
                    }
                    info!(
                        "Swept connection {} for user {}",
                        connection_id, handle.user_id
                    );
                }
            }

            expired.len()
        };

        if removed > 0 {
            self.broadcast_presence().await;
        }
        removed
    }
}

impl Clone for PresenceRegistry {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            stale_after: self.stale_after,
            grace: self.grace,
        }
    }
}

// ==============================================================================
// BACKGROUND SWEEPER
// ==============================================================================

/// Periodic sweep task in the background-worker style: an interval loop
/// with a shared shutdown flag, spawned once at startup.
pub struct PresenceSweeper {
    registry: PresenceRegistry,
    interval_seconds: u64,
    is_shutdown: Arc<RwLock<bool>>,
}

impl PresenceSweeper {
    pub fn new(registry: PresenceRegistry, interval_seconds: u64) -> Self {
        Self {
            registry,
            interval_seconds: interval_seconds.max(1),
            is_shutdown: Arc::new(RwLock::new(false)),
        }
    }

    pub fn shutdown_flag(&self) -> Arc<RwLock<bool>> {
        Arc::clone(&self.is_shutdown)
    }

    pub async fn run(&self) {
        info!(
            "Starting presence sweeper (every {}s)",
            self.interval_seconds
        );
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(self.interval_seconds));

        loop {
            interval.tick().await;

            if *self.is_shutdown.read().await {
                info!("Presence sweeper shutting down");
                break;
            }

            let removed = self.registry.sweep(Utc::now()).await;
            if removed > 0 {
                debug!("Presence sweep removed {} connections", removed);
            }
        }
    }

    pub async fn shutdown(&self) {
        *self.is_shutdown.write().await = true;
    }
}
