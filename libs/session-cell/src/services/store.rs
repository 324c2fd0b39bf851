// libs/session-cell/src/services/store.rs
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::models::Session;

/// Shared handle to one session. Controller operations lock exactly one of
/// these, which serializes all mutations per appointment.
pub type SessionHandle = Arc<Mutex<Session>>;

/// In-memory registry of live sessions, keyed by appointment id.
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionHandle>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get(&self, appointment_id: Uuid) -> Option<SessionHandle> {
        self.sessions.read().await.get(&appointment_id).cloned()
    }

    /// Fetch the session, creating it if absent. Returns the handle and
    /// whether this call created it.
    pub async fn get_or_create(&self, appointment_id: Uuid) -> (SessionHandle, bool) {
        {
            let sessions = self.sessions.read().await;
            if let Some(handle) = sessions.get(&appointment_id) {
                return (handle.clone(), false);
            }
        }

        let mut sessions = self.sessions.write().await;
        // Somebody may have created it between the two locks.
        if let Some(handle) = sessions.get(&appointment_id) {
            return (handle.clone(), false);
        }

        let handle: SessionHandle = Arc::new(Mutex::new(Session::new(appointment_id)));
        sessions.insert(appointment_id, handle.clone());
        debug!("Created session for appointment {}", appointment_id);
        (handle, true)
    }

    /// Drop the session. Holders of existing handles keep a detached copy;
    /// the store simply stops handing it out.
    pub async fn remove(&self, appointment_id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&appointment_id).is_some();
        if removed {
            debug!("Removed session for appointment {}", appointment_id);
        }
        removed
    }

    pub async fn appointment_ids(&self) -> Vec<Uuid> {
        self.sessions.read().await.keys().copied().collect()
    }

    /// Clone of every stored session, for read-only projections and sweeps.
    pub async fn snapshot(&self) -> Vec<Session> {
        let handles: Vec<SessionHandle> = {
            let sessions = self.sessions.read().await;
            sessions.values().cloned().collect()
        };

        let mut snapshot = Vec::with_capacity(handles.len());
        for handle in handles {
            snapshot.push(handle.lock().await.clone());
        }
        snapshot
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SessionStore {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_or_create_is_idempotent_per_appointment() {
        let store = SessionStore::new();
        let appointment_id = Uuid::new_v4();

        let (first, created) = store.get_or_create(appointment_id).await;
        assert!(created);
        let (second, created_again) = store.get_or_create(appointment_id).await;
        assert!(!created_again);

        assert!(Arc::ptr_eq(&first, &second), "same appointment must share one handle");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn remove_forgets_the_session() {
        let store = SessionStore::new();
        let appointment_id = Uuid::new_v4();

        store.get_or_create(appointment_id).await;
        assert!(store.remove(appointment_id).await);
        assert!(!store.remove(appointment_id).await, "second remove finds nothing");
        assert!(store.get(appointment_id).await.is_none());
    }

    #[tokio::test]
    async fn snapshot_reflects_mutations_made_through_handles() {
        let store = SessionStore::new();
        let appointment_id = Uuid::new_v4();

        let (handle, _) = store.get_or_create(appointment_id).await;
        handle.lock().await.link_generation_attempts = 2;

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].appointment_id, appointment_id);
        assert_eq!(snapshot[0].link_generation_attempts, 2);
    }

    #[tokio::test]
    async fn clones_share_the_same_sessions() {
        let store = SessionStore::new();
        let clone = store.clone();
        let appointment_id = Uuid::new_v4();

        store.get_or_create(appointment_id).await;
        assert!(clone.get(appointment_id).await.is_some());
    }
}
