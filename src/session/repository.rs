//! Session and queue persistence interface
//!
//! The coordinator reads and writes through [`SessionRepository`]; the engine
//! never sees it. [`InMemorySessionRepository`] backs tests and the CLI.

use crate::error::{MatchmakingError, Result};
use crate::session::instance::Session;
use crate::team::{FingerprintPair, SessionHistory};
use crate::types::{Player, PlayerId, SessionId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Narrow store interface for queues, sessions and reshuffle history
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Players waiting in `queue`, in join order
    async fn players_in_queue(&self, queue: &str) -> Result<Vec<Player>>;

    /// Drop the given players from `queue`
    async fn remove_from_queue(&self, queue: &str, player_ids: &[PlayerId]) -> Result<()>;

    async fn insert_session(&self, session: Session) -> Result<()>;

    async fn get_session(&self, session_id: SessionId) -> Result<Option<Session>>;

    async fn update_session(&self, session: Session) -> Result<()>;

    /// History for a session; empty when none was recorded
    async fn session_history(&self, session_id: SessionId) -> Result<SessionHistory>;

    /// Record a produced split and the counter that produced it
    async fn append_history(
        &self,
        session_id: SessionId,
        pair: FingerprintPair,
        reshuffle_count: u32,
    ) -> Result<()>;

    /// Put back a history read earlier, undoing appends made since
    async fn restore_history(&self, session_id: SessionId, history: SessionHistory) -> Result<()>;

    /// Forget a session's history once it is finished or cancelled
    async fn discard_history(&self, session_id: SessionId) -> Result<()>;
}

#[derive(Debug, Default)]
struct RepositoryState {
    queues: HashMap<String, Vec<Player>>,
    sessions: HashMap<SessionId, Session>,
    histories: HashMap<SessionId, SessionHistory>,
}

/// In-memory repository
#[derive(Debug, Default)]
pub struct InMemorySessionRepository {
    state: RwLock<RepositoryState>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_lock(&self) -> Result<RwLockReadGuard<'_, RepositoryState>> {
        self.state.read().map_err(|_| {
            MatchmakingError::InternalError {
                message: "Failed to acquire repository read lock".to_string(),
            }
            .into()
        })
    }

    fn write_lock(&self) -> Result<RwLockWriteGuard<'_, RepositoryState>> {
        self.state.write().map_err(|_| {
            MatchmakingError::InternalError {
                message: "Failed to acquire repository write lock".to_string(),
            }
            .into()
        })
    }

    /// Add a player to the back of `queue`; returns false if already queued
    pub fn enqueue(&self, queue: &str, player: Player) -> Result<bool> {
        let mut state = self.write_lock()?;
        let waiting = state.queues.entry(queue.to_string()).or_default();

        if waiting.iter().any(|p| p.id == player.id) {
            return Ok(false);
        }
        waiting.push(player);
        Ok(true)
    }

    /// Number of players waiting in `queue`
    pub fn queue_len(&self, queue: &str) -> Result<usize> {
        Ok(self.read_lock()?.queues.get(queue).map_or(0, Vec::len))
    }

    /// Number of sessions with a recorded history
    pub fn tracked_histories(&self) -> Result<usize> {
        Ok(self.read_lock()?.histories.len())
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn players_in_queue(&self, queue: &str) -> Result<Vec<Player>> {
        Ok(self
            .read_lock()?
            .queues
            .get(queue)
            .cloned()
            .unwrap_or_default())
    }

    async fn remove_from_queue(&self, queue: &str, player_ids: &[PlayerId]) -> Result<()> {
        if let Some(waiting) = self.write_lock()?.queues.get_mut(queue) {
            waiting.retain(|p| !player_ids.contains(&p.id));
        }
        Ok(())
    }

    async fn insert_session(&self, session: Session) -> Result<()> {
        self.write_lock()?.sessions.insert(session.id(), session);
        Ok(())
    }

    async fn get_session(&self, session_id: SessionId) -> Result<Option<Session>> {
        Ok(self.read_lock()?.sessions.get(&session_id).cloned())
    }

    async fn update_session(&self, session: Session) -> Result<()> {
        let mut state = self.write_lock()?;
        if !state.sessions.contains_key(&session.id()) {
            return Err(MatchmakingError::SessionNotFound {
                session_id: session.id(),
            }
            .into());
        }
        state.sessions.insert(session.id(), session);
        Ok(())
    }

    async fn session_history(&self, session_id: SessionId) -> Result<SessionHistory> {
        Ok(self
            .read_lock()?
            .histories
            .get(&session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append_history(
        &self,
        session_id: SessionId,
        pair: FingerprintPair,
        reshuffle_count: u32,
    ) -> Result<()> {
        self.write_lock()?
            .histories
            .entry(session_id)
            .or_default()
            .record(pair, reshuffle_count);
        Ok(())
    }

    async fn restore_history(&self, session_id: SessionId, history: SessionHistory) -> Result<()> {
        let mut state = self.write_lock()?;
        if history.is_empty() {
            state.histories.remove(&session_id);
        } else {
            state.histories.insert(session_id, history);
        }
        Ok(())
    }

    async fn discard_history(&self, session_id: SessionId) -> Result<()> {
        self.write_lock()?.histories.remove(&session_id);
        Ok(())
    }
}
