//! Rating storage interface and implementations
//!
//! This module defines the narrow interface the session layer uses to look up
//! and persist rating beliefs, with an in-memory implementation.

use crate::types::{PlayerId, PlayerRating, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Storage entry for a player's rating with metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingEntry {
    pub player_id: PlayerId,
    pub rating: PlayerRating,
    pub games_played: u64,
    pub last_updated: DateTime<Utc>,
    /// Session whose result produced the current rating
    #[serde(default)]
    pub last_session: Option<SessionId>,
}

impl RatingEntry {
    /// Create a new rating entry for a new player
    pub fn new(player_id: PlayerId, initial_rating: PlayerRating) -> Self {
        Self {
            player_id,
            rating: initial_rating,
            games_played: 0,
            last_updated: Utc::now(),
            last_session: None,
        }
    }

    /// Update the rating and increment games played
    pub fn update_rating(&mut self, new_rating: PlayerRating) {
        self.rating = new_rating;
        self.games_played += 1;
        self.last_updated = Utc::now();
    }

    /// Apply the rating a session's result produced, at most once per session
    ///
    /// Returns false when this session's update is already recorded.
    pub fn apply_session_result(&mut self, session_id: SessionId, new_rating: PlayerRating) -> bool {
        if self.last_session == Some(session_id) {
            return false;
        }
        self.update_rating(new_rating);
        self.last_session = Some(session_id);
        true
    }
}

/// Trait for rating storage operations
#[cfg_attr(test, mockall::automock)]
pub trait RatingStorage: Send + Sync {
    /// Get a player's rating entry
    fn get_rating(&self, player_id: &PlayerId) -> crate::error::Result<Option<RatingEntry>>;

    /// Store or update a player's rating
    fn store_rating(&self, entry: RatingEntry) -> crate::error::Result<()>;

    /// Get ratings for multiple players
    fn get_ratings(
        &self,
        player_ids: &[PlayerId],
    ) -> crate::error::Result<HashMap<PlayerId, RatingEntry>>;

    /// Store multiple rating updates atomically
    fn store_ratings(&self, entries: Vec<RatingEntry>) -> crate::error::Result<()>;

    /// Get total number of rated players
    fn get_player_count(&self) -> crate::error::Result<usize>;
}

/// In-memory rating storage implementation
#[derive(Debug, Default)]
pub struct InMemoryRatingStorage {
    ratings: RwLock<HashMap<PlayerId, RatingEntry>>,
}

impl InMemoryRatingStorage {
    /// Create a new in-memory rating storage
    pub fn new() -> Self {
        Self::default()
    }

    fn read_lock(
        &self,
    ) -> crate::error::Result<std::sync::RwLockReadGuard<'_, HashMap<PlayerId, RatingEntry>>> {
        self.ratings.read().map_err(|_| {
            crate::error::MatchmakingError::InternalError {
                message: "Failed to acquire ratings read lock".to_string(),
            }
            .into()
        })
    }

    fn write_lock(
        &self,
    ) -> crate::error::Result<std::sync::RwLockWriteGuard<'_, HashMap<PlayerId, RatingEntry>>> {
        self.ratings.write().map_err(|_| {
            crate::error::MatchmakingError::InternalError {
                message: "Failed to acquire ratings write lock".to_string(),
            }
            .into()
        })
    }
}

impl RatingStorage for InMemoryRatingStorage {
    fn get_rating(&self, player_id: &PlayerId) -> crate::error::Result<Option<RatingEntry>> {
        Ok(self.read_lock()?.get(player_id).cloned())
    }

    fn store_rating(&self, entry: RatingEntry) -> crate::error::Result<()> {
        self.write_lock()?.insert(entry.player_id.clone(), entry);
        Ok(())
    }

    fn get_ratings(
        &self,
        player_ids: &[PlayerId],
    ) -> crate::error::Result<HashMap<PlayerId, RatingEntry>> {
        let ratings = self.read_lock()?;

        let mut result = HashMap::new();
        for player_id in player_ids {
            if let Some(entry) = ratings.get(player_id) {
                result.insert(player_id.clone(), entry.clone());
            }
        }

        Ok(result)
    }

    fn store_ratings(&self, entries: Vec<RatingEntry>) -> crate::error::Result<()> {
        let mut ratings = self.write_lock()?;

        for entry in entries {
            ratings.insert(entry.player_id.clone(), entry);
        }

        Ok(())
    }

    fn get_player_count(&self) -> crate::error::Result<usize> {
        Ok(self.read_lock()?.len())
    }
}
