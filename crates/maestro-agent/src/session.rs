//! In-memory session store.
//!
//! A session is an ordered, append-only list of turns keyed by an opaque
//! string id. Slots are created on demand and removed only by explicit
//! eviction. Each slot's turn list sits behind an async mutex; the engine
//! takes it with `try_lock` so a second concurrent run on the same session
//! is rejected instead of queued.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use maestro_types::Turn;

use crate::error::{AgentError, Result};

/// One session's turn list.
pub struct SessionSlot {
    turns: Arc<Mutex<Vec<Turn>>>,
}

impl SessionSlot {
    fn new() -> Self {
        Self {
            turns: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// A lease on one session for the duration of a run.
///
/// Holds the slot's mutex, so no other run can touch the session until
/// the lease drops.
#[derive(Debug)]
pub struct SessionLease {
    id: String,
    guard: OwnedMutexGuard<Vec<Turn>>,
}

impl SessionLease {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Turns recorded so far, oldest first.
    pub fn turns(&self) -> &[Turn] {
        &self.guard
    }

    pub fn push(&mut self, turn: Turn) {
        self.guard.push(turn);
    }

    /// Remove the most recent turn. Used to roll back a user turn when
    /// the backend fails mid-run.
    pub fn pop(&mut self) -> Option<Turn> {
        self.guard.pop()
    }

    pub fn len(&self) -> usize {
        self.guard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard.is_empty()
    }
}

/// Store of all sessions, keyed by id.
#[derive(Default)]
pub struct SessionStore {
    slots: RwLock<HashMap<String, Arc<SessionSlot>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a session for a run.
    ///
    /// With `None` a fresh uuid-v4 id is generated. An existing id resumes
    /// that session; an unknown id creates it. Returns `SessionBusy` when
    /// another run currently holds the slot.
    pub async fn lease(&self, session_id: Option<String>) -> Result<SessionLease> {
        let id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());

        let slot = {
            let mut slots = self.slots.write().await;
            Arc::clone(
                slots
                    .entry(id.clone())
                    .or_insert_with(|| Arc::new(SessionSlot::new())),
            )
        };

        let guard = Arc::clone(&slot.turns)
            .try_lock_owned()
            .map_err(|_| AgentError::SessionBusy(id.clone()))?;

        Ok(SessionLease { id, guard })
    }

    /// Read back a session's turns without leasing it.
    pub async fn history(&self, session_id: &str) -> Result<Vec<Turn>> {
        let slot = {
            let slots = self.slots.read().await;
            slots
                .get(session_id)
                .cloned()
                .ok_or_else(|| AgentError::SessionNotFound(session_id.to_string()))?
        };
        let turns = slot.turns.lock().await;
        Ok(turns.clone())
    }

    /// Evict a session. Returns `SessionNotFound` for unknown ids.
    pub async fn remove(&self, session_id: &str) -> Result<()> {
        let removed = self.slots.write().await.remove(session_id);
        if removed.is_none() {
            return Err(AgentError::SessionNotFound(session_id.to_string()));
        }
        tracing::debug!(session_id = %session_id, "evicted session");
        Ok(())
    }

    /// Ids of all live sessions, sorted.
    pub async fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.slots.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }
}
