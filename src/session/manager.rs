//! Session coordinator
//!
//! Drives the session lifecycle over the repository and rating store, calling
//! the engine for every formation and rating update. Each operation holds its
//! session's lock across the read-compute-write cycle; distinct sessions never
//! contend. Claiming players additionally holds the queue's lock, so two
//! sessions on one queue never draw the same players.

use crate::error::{MatchmakingError, Result};
use crate::metrics::MetricsCollector;
use crate::rating::{RatingEntry, RatingStorage};
use crate::session::instance::{Session, SessionStatus};
use crate::session::repository::SessionRepository;
use crate::team::{MatchmakingEngine, SessionHistory, TeamFormation};
use crate::types::{Outcome, Player, PlayerId, RatingUpdate, SessionId, TeamSide, TeamsAnnounced};
use rand::Rng;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

/// Async locks keyed by session id or queue name
struct LockTable<K> {
    locks: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K> Default for LockTable<K> {
    fn default() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone> LockTable<K> {
    async fn acquire(&self, key: &K) -> Result<OwnedMutexGuard<()>> {
        let lock = {
            let mut locks = self.locks.lock().map_err(|_| MatchmakingError::InternalError {
                message: "Failed to acquire lock table".to_string(),
            })?;
            locks.entry(key.clone()).or_default().clone()
        };

        Ok(lock.lock_owned().await)
    }

    /// Drop the entry for `key` once no task holds or awaits it
    fn release(&self, key: &K) {
        if let Ok(mut locks) = self.locks.lock() {
            if locks.get(key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
                locks.remove(key);
            }
        }
    }
}

/// Caller-side coordinator for matchmaking sessions
#[derive(Clone)]
pub struct SessionManager {
    engine: Arc<MatchmakingEngine>,
    repository: Arc<dyn SessionRepository>,
    rating_storage: Arc<dyn RatingStorage>,
    metrics_collector: Arc<MetricsCollector>,
    max_reshuffles: u32,
    session_locks: Arc<LockTable<SessionId>>,
    queue_locks: Arc<LockTable<String>>,
}

impl SessionManager {
    pub fn new(
        engine: Arc<MatchmakingEngine>,
        repository: Arc<dyn SessionRepository>,
        rating_storage: Arc<dyn RatingStorage>,
        metrics_collector: Arc<MetricsCollector>,
        max_reshuffles: u32,
    ) -> Self {
        Self {
            engine,
            repository,
            rating_storage,
            metrics_collector,
            max_reshuffles,
            session_locks: Arc::default(),
            queue_locks: Arc::default(),
        }
    }

    pub fn engine(&self) -> &MatchmakingEngine {
        &self.engine
    }

    pub fn max_reshuffles(&self) -> u32 {
        self.max_reshuffles
    }

    /// Acquire the exclusive scope for one session
    async fn lock_session(&self, session_id: SessionId) -> Result<OwnedMutexGuard<()>> {
        self.session_locks.acquire(&session_id).await
    }

    async fn load_session(&self, session_id: SessionId) -> Result<Session> {
        self.repository
            .get_session(session_id)
            .await?
            .ok_or_else(|| MatchmakingError::SessionNotFound { session_id }.into())
    }

    fn require_transition(session: &Session, next: SessionStatus) -> Result<()> {
        if !session.status().can_transition_to(next) {
            return Err(MatchmakingError::InvalidTransition {
                from: session.status(),
                to: next,
            }
            .into());
        }
        Ok(())
    }

    /// Record a formation failure and hand back the propagated error
    fn formation_failed(&self, session_id: SessionId, error: MatchmakingError) -> anyhow::Error {
        warn!(
            "Team formation failed - session: {}, reason: {}",
            session_id, error
        );
        self.metrics_collector.record_formation_failure(&error);
        error.into()
    }

    /// Replace each player's rating with the stored belief, when one exists
    fn refresh_ratings(&self, players: Vec<Player>) -> Result<Vec<Player>> {
        let ids: Vec<PlayerId> = players.iter().map(|p| p.id.clone()).collect();
        let stored = self.rating_storage.get_ratings(&ids)?;

        Ok(players
            .into_iter()
            .map(|mut player| {
                if let Some(entry) = stored.get(&player.id) {
                    player.rating = entry.rating;
                }
                player
            })
            .collect())
    }

    /// Open a session on `queue`
    pub async fn open_session(&self, queue: &str) -> Result<SessionId> {
        let mut session = Session::new(queue);
        session.transition(SessionStatus::Filling)?;
        let session_id = session.id();

        self.repository.insert_session(session).await?;
        self.metrics_collector.record_session_opened();

        info!("Opened session {} on queue '{}'", session_id, queue);
        Ok(session_id)
    }

    pub async fn get_session(&self, session_id: SessionId) -> Result<Session> {
        self.load_session(session_id).await
    }

    /// Pull a full pool from the queue and form the first split
    ///
    /// Players leave the queue only once the split is persisted.
    pub async fn form_teams<R: Rng + ?Sized>(
        &self,
        session_id: SessionId,
        rng: &mut R,
    ) -> Result<TeamsAnnounced> {
        let _guard = self.lock_session(session_id).await?;
        let timer = self.metrics_collector.start_timer();

        let previous = self.load_session(session_id).await?;
        Self::require_transition(&previous, SessionStatus::Formed)?;

        // Held from reading the queue until the claimed players are removed
        let _queue_guard = self
            .queue_locks
            .acquire(&previous.queue().to_string())
            .await?;

        let pool_size = self.engine.requirement().pool_size();
        let queued = self.repository.players_in_queue(previous.queue()).await?;
        if queued.len() < pool_size {
            return Err(self.formation_failed(
                session_id,
                MatchmakingError::InsufficientPool {
                    expected: pool_size,
                    actual: queued.len(),
                },
            ));
        }

        let pool = self.refresh_ratings(queued.into_iter().take(pool_size).collect())?;
        let history = self.repository.session_history(session_id).await?;
        debug!(
            "Forming teams - session: {}, pool: {}, history: {}",
            session_id,
            pool.len(),
            history.pairs().len()
        );

        let formation = self
            .engine
            .form_teams(&pool, &history, 0, rng)
            .map_err(|e| self.formation_failed(session_id, e))?;

        let mut session = previous.clone();
        session.apply_formation(&formation, SessionStatus::Formed)?;
        self.persist_formation(&previous, &session, &formation, &history)
            .await?;

        let pool_ids: Vec<PlayerId> = pool.into_iter().map(|p| p.id).collect();
        if let Err(e) = self
            .repository
            .remove_from_queue(session.queue(), &pool_ids)
            .await
        {
            self.rollback_formation(&previous, &history).await;
            return Err(e);
        }

        self.metrics_collector.record_formation(
            false,
            formation.candidates,
            formation.partition.score,
            timer.stop(),
        );
        info!(
            "Teams formed - session: {}, score: {:.3}, candidates: {}, captains: {} / {}",
            session_id,
            formation.partition.score,
            formation.candidates,
            formation.captain_a,
            formation.captain_b
        );

        Self::announce(&session)
    }

    /// Replace the current split with the next best unseen one
    pub async fn reshuffle<R: Rng + ?Sized>(
        &self,
        session_id: SessionId,
        rng: &mut R,
    ) -> Result<TeamsAnnounced> {
        let _guard = self.lock_session(session_id).await?;
        let timer = self.metrics_collector.start_timer();

        let mut session = self.load_session(session_id).await?;
        Self::require_transition(&session, SessionStatus::Reshuffled)?;

        if session.reshuffle_count() >= self.max_reshuffles {
            return Err(self.formation_failed(
                session_id,
                MatchmakingError::ReshuffleLimitReached {
                    session_id,
                    limit: self.max_reshuffles,
                },
            ));
        }

        let roster = session
            .roster()
            .ok_or_else(|| MatchmakingError::InternalError {
                message: format!("Session {} has teams but no roster", session_id),
            })?;
        let pool = self.refresh_ratings(roster.reshuffle_pool())?;
        let history = self.repository.session_history(session_id).await?;
        let next_index = session.reshuffle_count() + 1;

        let formation = self
            .engine
            .form_teams(&pool, &history, next_index, rng)
            .map_err(|e| self.formation_failed(session_id, e))?;

        let previous = session.clone();
        session.apply_formation(&formation, SessionStatus::Reshuffled)?;
        self.persist_formation(&previous, &session, &formation, &history)
            .await?;

        self.metrics_collector.record_formation(
            true,
            formation.candidates,
            formation.partition.score,
            timer.stop(),
        );
        info!(
            "Teams reshuffled - session: {}, reshuffle: {}/{}, score: {:.3}, unseen: {}",
            session_id,
            next_index,
            self.max_reshuffles,
            formation.partition.score,
            formation.remaining
        );

        Self::announce(&session)
    }

    /// Append the split to history and store the session
    ///
    /// A failed session write rolls the history back, so a retry sees the
    /// same unseen splits.
    async fn persist_formation(
        &self,
        previous: &Session,
        session: &Session,
        formation: &TeamFormation,
        history: &SessionHistory,
    ) -> Result<()> {
        self.repository
            .append_history(
                session.id(),
                formation.fingerprints.clone(),
                formation.reshuffle_index,
            )
            .await?;

        if let Err(e) = self.repository.update_session(session.clone()).await {
            self.rollback_formation(previous, history).await;
            return Err(e);
        }
        Ok(())
    }

    /// Restore the history and session record read before a formation
    async fn rollback_formation(&self, previous: &Session, history: &SessionHistory) {
        let session_id = previous.id();
        warn!("Rolling back formation - session: {}", session_id);

        if let Err(e) = self
            .repository
            .restore_history(session_id, history.clone())
            .await
        {
            warn!("Failed to restore history - session: {}, error: {}", session_id, e);
        }
        if let Err(e) = self.repository.update_session(previous.clone()).await {
            warn!("Failed to restore session - session: {}, error: {}", session_id, e);
        }
    }

    fn announce(session: &Session) -> Result<TeamsAnnounced> {
        session.announcement().ok_or_else(|| {
            MatchmakingError::InternalError {
                message: format!("Session {} has no roster to announce", session.id()),
            }
            .into()
        })
    }

    /// Lock the current teams and mark the session live
    pub async fn start(&self, session_id: SessionId) -> Result<()> {
        let _guard = self.lock_session(session_id).await?;

        let mut session = self.load_session(session_id).await?;
        session.transition(SessionStatus::Live)?;
        self.repository.update_session(session).await?;

        info!("Session {} is live", session_id);
        Ok(())
    }

    /// Finish a live session and apply the rating update
    ///
    /// The update is recorded on the session before ratings are written and
    /// each rating entry accepts one update per session, so a report that
    /// failed part way can be retried without rating anyone twice.
    pub async fn report_result(
        &self,
        session_id: SessionId,
        outcome: Outcome,
    ) -> Result<RatingUpdate> {
        let guard = self.lock_session(session_id).await?;
        let timer = self.metrics_collector.start_timer();

        let mut session = self.load_session(session_id).await?;
        Self::require_transition(&session, SessionStatus::Finished)?;

        let update = match session.result().cloned() {
            Some(recorded) if recorded.outcome == outcome => {
                debug!("Resuming recorded result - session: {}", session_id);
                recorded
            }
            Some(recorded) => {
                return Err(MatchmakingError::ResultConflict {
                    session_id,
                    recorded: recorded.outcome,
                    reported: outcome,
                }
                .into());
            }
            None => {
                let roster = session
                    .roster()
                    .ok_or_else(|| MatchmakingError::InternalError {
                        message: format!("Live session {} has no roster", session_id),
                    })?;
                let team_a = self.refresh_ratings(roster.players(TeamSide::A))?;
                let team_b = self.refresh_ratings(roster.players(TeamSide::B))?;

                let update = self.engine.rate_session(&team_a, &team_b, outcome)?;
                session.record_result(update.clone())?;
                self.repository.update_session(session.clone()).await?;
                update
            }
        };

        self.apply_ratings(session_id, &update)?;

        session.transition(SessionStatus::Finished)?;
        self.repository.update_session(session).await?;
        self.repository.discard_history(session_id).await?;

        self.metrics_collector.record_rating_update(
            &outcome.to_string(),
            update.match_quality,
            timer.stop(),
        );
        self.metrics_collector
            .record_session_closed(SessionStatus::Finished.label());

        drop(guard);
        self.session_locks.release(&session_id);

        info!(
            "Session {} finished - outcome: {}, quality: {:.3}, players rated: {}",
            session_id,
            outcome,
            update.match_quality,
            update.changes.len()
        );
        Ok(update)
    }

    /// Abandon a session before it goes live
    pub async fn cancel(&self, session_id: SessionId) -> Result<()> {
        let guard = self.lock_session(session_id).await?;

        let mut session = self.load_session(session_id).await?;
        session.transition(SessionStatus::Cancelled)?;
        self.repository.update_session(session).await?;
        self.repository.discard_history(session_id).await?;

        self.metrics_collector
            .record_session_closed(SessionStatus::Cancelled.label());

        drop(guard);
        self.session_locks.release(&session_id);

        info!("Session {} cancelled", session_id);
        Ok(())
    }

    /// Write every participant's new rating, skipping entries that already
    /// carry this session's update
    fn apply_ratings(&self, session_id: SessionId, update: &RatingUpdate) -> Result<()> {
        let ids: Vec<PlayerId> = update.changes.iter().map(|c| c.player_id.clone()).collect();
        let mut stored = self.rating_storage.get_ratings(&ids)?;

        let entries: Vec<RatingEntry> = update
            .changes
            .iter()
            .filter_map(|change| {
                let mut entry = stored.remove(&change.player_id).unwrap_or_else(|| {
                    RatingEntry::new(change.player_id.clone(), change.old_rating)
                });
                entry
                    .apply_session_result(session_id, change.new_rating)
                    .then_some(entry)
            })
            .collect();

        if entries.len() < update.changes.len() {
            debug!(
                "Ratings already applied - session: {}, skipped: {}",
                session_id,
                update.changes.len() - entries.len()
            );
        }
        if entries.is_empty() {
            return Ok(());
        }
        self.rating_storage.store_ratings(entries)
    }
}
