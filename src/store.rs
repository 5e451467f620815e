//! Process-local session storage.
//!
//! Sessions live until removed; there is no expiry.

use crate::models::{Session, Variant};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: Session) {
        self.sessions
            .write()
            .await
            .insert(session.session_id, session);
    }

    /// Snapshot of the session; the menu itself stays shared.
    pub async fn get(&self, session_id: &Uuid) -> Option<Session> {
        self.sessions.read().await.get(session_id).cloned()
    }

    pub async fn remove(&self, session_id: &Uuid) -> Option<Session> {
        self.sessions.write().await.remove(session_id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Replaces the slot matching `variant.id` when the status move is
    /// forward. Returns whether the write was applied.
    pub async fn update_variant(&self, session_id: &Uuid, variant: Variant) -> bool {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(session_id) else {
            warn!("Dropping variant {} update for unknown session {}", variant.id, session_id);
            return false;
        };
        let Some(slot) = session.variants.iter_mut().find(|v| v.id == variant.id) else {
            warn!("Session {} has no variant slot {}", session_id, variant.id);
            return false;
        };

        if !slot.status.can_transition_to(variant.status) {
            warn!(
                "Ignoring variant {} transition {:?} -> {:?} in session {}",
                variant.id, slot.status, variant.status, session_id
            );
            return false;
        }

        *slot = variant;
        true
    }
}
