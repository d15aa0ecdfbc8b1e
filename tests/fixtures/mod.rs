//! Test fixtures and wrapped stores for integration testing

#![allow(dead_code)]

use async_trait::async_trait;
use pickup_room::error::Result;
use pickup_room::session::{InMemorySessionRepository, Session, SessionRepository};
use pickup_room::team::{FingerprintPair, SessionHistory};
use pickup_room::types::{Player, PlayerId, PlayerRating, Position, SessionId};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn create_test_player(id: &str, rating: f64, uncertainty: f64, position: Position) -> Player {
    Player::new(id, id, PlayerRating { rating, uncertainty }, position)
}

/// Ten players that fit the default 2/2/1 requirement
pub fn production_pool() -> Vec<Player> {
    production_pool_tagged("")
}

/// The production pool with `tag` appended to every id
pub fn production_pool_tagged(tag: &str) -> Vec<Player> {
    let players = vec![
        create_test_player("ace", 34.0, 3.0, Position::Offense),
        create_test_player("blitz", 31.0, 4.0, Position::Offense),
        create_test_player("comet", 29.0, 5.0, Position::Chase),
        create_test_player("dash", 27.0, 2.5, Position::Chase),
        create_test_player("echo", 25.0, 6.0, Position::Home),
        create_test_player("flint", 24.0, 8.0, Position::Home),
        create_test_player("gale", 22.0, 3.5, Position::Flexible),
        create_test_player("haze", 20.0, 4.5, Position::Flexible),
        create_test_player("ion", 18.0, 7.0, Position::Flexible),
        create_test_player("jet", 16.0, 5.5, Position::Flexible),
    ];

    players
        .into_iter()
        .map(|mut player| {
            player.id = format!("{}{}", player.id, tag);
            player
        })
        .collect()
}

/// Repository wrapper that counts calls and injects store failures
///
/// Queue reads yield to the scheduler so concurrent callers interleave.
#[derive(Default)]
pub struct RecordingRepository {
    inner: InMemorySessionRepository,
    fail_history_writes: AtomicBool,
    fail_queue_removals: AtomicBool,
    session_update_failure: Mutex<Option<usize>>,
    history_reads: AtomicUsize,
    queue_removals: AtomicUsize,
}

impl RecordingRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inner(&self) -> &InMemorySessionRepository {
        &self.inner
    }

    pub fn fail_history_writes(&self, fail: bool) {
        self.fail_history_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_queue_removals(&self, fail: bool) {
        self.fail_queue_removals.store(fail, Ordering::SeqCst);
    }

    /// Fail one session write, after letting `skip` writes through
    pub fn fail_session_update_after(&self, skip: usize) {
        *self.session_update_failure.lock().unwrap() = Some(skip);
    }

    pub fn history_reads(&self) -> usize {
        self.history_reads.load(Ordering::SeqCst)
    }

    pub fn queue_removals(&self) -> usize {
        self.queue_removals.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionRepository for RecordingRepository {
    async fn players_in_queue(&self, queue: &str) -> Result<Vec<Player>> {
        let players = self.inner.players_in_queue(queue).await;
        tokio::task::yield_now().await;
        players
    }

    async fn remove_from_queue(&self, queue: &str, player_ids: &[PlayerId]) -> Result<()> {
        if self.fail_queue_removals.load(Ordering::SeqCst) {
            anyhow::bail!("queue store unavailable");
        }
        self.queue_removals.fetch_add(1, Ordering::SeqCst);
        self.inner.remove_from_queue(queue, player_ids).await
    }

    async fn insert_session(&self, session: Session) -> Result<()> {
        self.inner.insert_session(session).await
    }

    async fn get_session(&self, session_id: SessionId) -> Result<Option<Session>> {
        self.inner.get_session(session_id).await
    }

    async fn update_session(&self, session: Session) -> Result<()> {
        let fail = {
            let mut armed = self.session_update_failure.lock().unwrap();
            match *armed {
                Some(0) => {
                    *armed = None;
                    true
                }
                Some(skip) => {
                    *armed = Some(skip - 1);
                    false
                }
                None => false,
            }
        };
        if fail {
            anyhow::bail!("session store unavailable");
        }
        self.inner.update_session(session).await
    }

    async fn session_history(&self, session_id: SessionId) -> Result<SessionHistory> {
        self.history_reads.fetch_add(1, Ordering::SeqCst);
        self.inner.session_history(session_id).await
    }

    async fn append_history(
        &self,
        session_id: SessionId,
        pair: FingerprintPair,
        reshuffle_count: u32,
    ) -> Result<()> {
        if self.fail_history_writes.load(Ordering::SeqCst) {
            anyhow::bail!("history store unavailable");
        }
        self.inner
            .append_history(session_id, pair, reshuffle_count)
            .await
    }

    async fn restore_history(&self, session_id: SessionId, history: SessionHistory) -> Result<()> {
        self.inner.restore_history(session_id, history).await
    }

    async fn discard_history(&self, session_id: SessionId) -> Result<()> {
        self.inner.discard_history(session_id).await
    }
}
