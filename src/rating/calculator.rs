//! Rating model trait and implementations
//!
//! This module defines the interface for pairwise team rating updates and the
//! match quality estimate used by the balance scorer.

use crate::error::{EngineResult, MatchmakingError};
use crate::types::{Outcome, PlayerRating};

/// New beliefs for both teams, in the same order as the input slices
pub type TeamRatings = (Vec<PlayerRating>, Vec<PlayerRating>);

/// Trait for two-team Bayesian skill models
pub trait RatingModel: Send + Sync + std::fmt::Debug {
    /// Apply the outcome of a finished session to both teams
    ///
    /// # Arguments
    /// * `team_a` - Current beliefs of team A's players
    /// * `team_b` - Current beliefs of team B's players
    /// * `outcome` - Result from team A's point of view
    ///
    /// # Returns
    /// Updated beliefs, one per input player, order preserved
    fn update(
        &self,
        team_a: &[PlayerRating],
        team_b: &[PlayerRating],
        outcome: Outcome,
    ) -> EngineResult<TeamRatings>;

    /// Probability-of-closeness estimate in `[0, 1]`, higher is more even
    fn quality(&self, team_a: &[PlayerRating], team_b: &[PlayerRating]) -> f64;

    /// Belief assigned to players without a stored rating
    fn initial_rating(&self) -> PlayerRating;

    /// Get current configuration as JSON
    fn config(&self) -> serde_json::Value;
}

/// Reject empty teams before they reach a model
pub(crate) fn ensure_teams_present(
    team_a: &[PlayerRating],
    team_b: &[PlayerRating],
) -> EngineResult<()> {
    if team_a.is_empty() || team_b.is_empty() {
        return Err(MatchmakingError::RatingUpdateMismatch {
            reason: format!(
                "both teams must be non-empty (got {} and {})",
                team_a.len(),
                team_b.len()
            ),
        });
    }
    Ok(())
}

/// Rating model that never moves a belief
///
/// Useful for exhibition sessions and for isolating scorer behavior in tests.
#[derive(Debug, Clone)]
pub struct NoOpRatingModel {
    initial_rating: PlayerRating,
    quality: f64,
}

impl NoOpRatingModel {
    /// Create a new no-op rating model
    pub fn new(initial_rating: PlayerRating) -> Self {
        Self {
            initial_rating,
            quality: 1.0,
        }
    }

    /// Report a fixed quality for every matchup
    pub fn with_quality(mut self, quality: f64) -> Self {
        self.quality = quality.clamp(0.0, 1.0);
        self
    }
}

impl Default for NoOpRatingModel {
    fn default() -> Self {
        Self::new(PlayerRating::default())
    }
}

impl RatingModel for NoOpRatingModel {
    fn update(
        &self,
        team_a: &[PlayerRating],
        team_b: &[PlayerRating],
        _outcome: Outcome,
    ) -> EngineResult<TeamRatings> {
        ensure_teams_present(team_a, team_b)?;
        Ok((team_a.to_vec(), team_b.to_vec()))
    }

    fn quality(&self, _team_a: &[PlayerRating], _team_b: &[PlayerRating]) -> f64 {
        self.quality
    }

    fn initial_rating(&self) -> PlayerRating {
        self.initial_rating
    }

    fn config(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "no_op",
            "initial_rating": self.initial_rating.rating,
            "initial_uncertainty": self.initial_rating.uncertainty,
            "quality": self.quality
        })
    }
}
