//! TrueSkill rating system implementation
//!
//! This module provides a concrete implementation of the rating model using
//! the two-team TrueSkill functions from the skillratings crate.

use crate::error::{EngineResult, MatchmakingError};
use crate::rating::calculator::{ensure_teams_present, RatingModel, TeamRatings};
use crate::types::{Outcome, PlayerRating};
use serde::{Deserialize, Serialize};
use skillratings::trueskill::{
    match_quality_two_teams, trueskill_two_teams, TrueSkillConfig, TrueSkillRating,
};
use skillratings::Outcomes;
use tracing::debug;

/// Extended configuration for the TrueSkill rating system
/// This wraps the skillratings TrueSkillConfig with additional parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtendedTrueSkillConfig {
    /// Core TrueSkill parameters
    pub trueskill_config: TrueSkillConfig,
    /// Initial rating for new players
    pub initial_rating: f64,
    /// Initial uncertainty for new players
    pub initial_uncertainty: f64,
}

impl Default for ExtendedTrueSkillConfig {
    fn default() -> Self {
        Self {
            trueskill_config: TrueSkillConfig::new(),
            initial_rating: 25.0,
            initial_uncertainty: 25.0 / 3.0,
        }
    }
}

impl ExtendedTrueSkillConfig {
    /// Create conservative configuration (slower rating changes)
    pub fn conservative() -> Self {
        Self {
            trueskill_config: TrueSkillConfig {
                draw_probability: 0.1,
                beta: 25.0 / 4.0,
                default_dynamics: 25.0 / 600.0,
            },
            ..Self::default()
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> EngineResult<()> {
        if self.trueskill_config.beta <= 0.0 {
            return Err(MatchmakingError::ConfigurationError {
                message: "Beta must be positive".to_string(),
            });
        }

        if !(0.0..1.0).contains(&self.trueskill_config.draw_probability) {
            return Err(MatchmakingError::ConfigurationError {
                message: "Draw probability must be in [0, 1)".to_string(),
            });
        }

        if self.trueskill_config.default_dynamics < 0.0 {
            return Err(MatchmakingError::ConfigurationError {
                message: "Dynamics factor must be non-negative".to_string(),
            });
        }

        if self.initial_uncertainty <= 0.0 {
            return Err(MatchmakingError::ConfigurationError {
                message: "Initial uncertainty must be positive".to_string(),
            });
        }

        Ok(())
    }
}

/// TrueSkill rating model implementation
#[derive(Debug, Clone)]
pub struct TrueSkillRatingModel {
    config: ExtendedTrueSkillConfig,
}

impl TrueSkillRatingModel {
    /// Create a new TrueSkill rating model
    pub fn new(config: ExtendedTrueSkillConfig) -> EngineResult<Self> {
        config.validate()?;

        Ok(Self { config })
    }

    fn to_trueskill(team: &[PlayerRating]) -> Vec<TrueSkillRating> {
        team.iter().map(|r| (*r).into()).collect()
    }
}

impl Default for TrueSkillRatingModel {
    fn default() -> Self {
        Self {
            config: ExtendedTrueSkillConfig::default(),
        }
    }
}

impl RatingModel for TrueSkillRatingModel {
    fn update(
        &self,
        team_a: &[PlayerRating],
        team_b: &[PlayerRating],
        outcome: Outcome,
    ) -> EngineResult<TeamRatings> {
        ensure_teams_present(team_a, team_b)?;

        let outcome = match outcome {
            Outcome::AWins => Outcomes::WIN,
            Outcome::BWins => Outcomes::LOSS,
            Outcome::Tie => Outcomes::DRAW,
        };

        let (new_a, new_b) = trueskill_two_teams(
            &Self::to_trueskill(team_a),
            &Self::to_trueskill(team_b),
            &outcome,
            &self.config.trueskill_config,
        );

        if new_a.len() != team_a.len() || new_b.len() != team_b.len() {
            return Err(MatchmakingError::RatingUpdateMismatch {
                reason: format!(
                    "model returned {}+{} ratings for {}+{} players",
                    new_a.len(),
                    new_b.len(),
                    team_a.len(),
                    team_b.len()
                ),
            });
        }

        debug!(
            team_a = team_a.len(),
            team_b = team_b.len(),
            ?outcome,
            "Applied TrueSkill team update"
        );

        Ok((
            new_a.into_iter().map(PlayerRating::from).collect(),
            new_b.into_iter().map(PlayerRating::from).collect(),
        ))
    }

    fn quality(&self, team_a: &[PlayerRating], team_b: &[PlayerRating]) -> f64 {
        if team_a.is_empty() || team_b.is_empty() {
            return 0.0;
        }

        match_quality_two_teams(
            &Self::to_trueskill(team_a),
            &Self::to_trueskill(team_b),
            &self.config.trueskill_config,
        )
        .clamp(0.0, 1.0)
    }

    fn initial_rating(&self) -> PlayerRating {
        PlayerRating {
            rating: self.config.initial_rating,
            uncertainty: self.config.initial_uncertainty,
        }
    }

    fn config(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(ratings: &[(f64, f64)]) -> Vec<PlayerRating> {
        ratings
            .iter()
            .map(|&(rating, uncertainty)| PlayerRating {
                rating,
                uncertainty,
            })
            .collect()
    }

    #[test]
    fn test_extended_config_default() {
        let config = ExtendedTrueSkillConfig::default();
        assert_eq!(config.initial_rating, 25.0);
        assert!((config.initial_uncertainty - 8.333).abs() < 0.001);
        assert!(config.validate().is_ok());
        assert!(ExtendedTrueSkillConfig::conservative().validate().is_ok());
    }

    #[test]
    fn test_extended_config_validation() {
        let mut config = ExtendedTrueSkillConfig::default();
        config.trueskill_config.beta = -1.0;
        assert!(config.validate().is_err());

        config = ExtendedTrueSkillConfig::default();
        config.trueskill_config.draw_probability = 1.0;
        assert!(config.validate().is_err());

        config = ExtendedTrueSkillConfig::default();
        config.initial_uncertainty = 0.0;
        assert!(config.validate().is_err());

        assert!(TrueSkillRatingModel::new(config).is_err());
    }

    #[test]
    fn test_equal_teams_decisive_outcome() {
        let model = TrueSkillRatingModel::default();
        let team_a = team(&[(25.0, 8.333); 3]);
        let team_b = team(&[(25.0, 8.333); 3]);

        let (new_a, new_b) = model.update(&team_a, &team_b, Outcome::AWins).unwrap();

        assert_eq!(new_a.len(), 3);
        assert_eq!(new_b.len(), 3);
        for (old, new) in team_a.iter().zip(&new_a) {
            assert!(new.rating > old.rating);
            assert!(new.uncertainty <= old.uncertainty);
        }
        for (old, new) in team_b.iter().zip(&new_b) {
            assert!(new.rating < old.rating);
            assert!(new.uncertainty <= old.uncertainty);
        }
    }

    #[test]
    fn test_b_wins_mirrors_a_wins() {
        let model = TrueSkillRatingModel::default();
        let team_a = team(&[(25.0, 8.333), (25.0, 8.333)]);
        let team_b = team(&[(25.0, 8.333), (25.0, 8.333)]);

        let (new_a, new_b) = model.update(&team_a, &team_b, Outcome::BWins).unwrap();
        assert!(new_a.iter().all(|r| r.rating < 25.0));
        assert!(new_b.iter().all(|r| r.rating > 25.0));
    }

    #[test]
    fn test_tie_pulls_teams_together() {
        let model = TrueSkillRatingModel::default();
        let strong = team(&[(32.0, 4.0), (30.0, 4.0)]);
        let weak = team(&[(20.0, 4.0), (18.0, 4.0)]);

        let (tie_strong, tie_weak) = model.update(&strong, &weak, Outcome::Tie).unwrap();
        assert!(tie_strong.iter().zip(&strong).all(|(n, o)| n.rating < o.rating));
        assert!(tie_weak.iter().zip(&weak).all(|(n, o)| n.rating > o.rating));

        // An upset moves the weak side further than a tie does
        let (_, upset_weak) = model.update(&strong, &weak, Outcome::BWins).unwrap();
        let tie_gain = tie_weak[0].rating - weak[0].rating;
        let upset_gain = upset_weak[0].rating - weak[0].rating;
        assert!(upset_gain > tie_gain);
    }

    #[test]
    fn test_match_quality() {
        let model = TrueSkillRatingModel::default();
        let even_a = team(&[(25.0, 3.0), (25.0, 3.0)]);
        let even_b = team(&[(25.0, 3.0), (25.0, 3.0)]);
        let lopsided_b = team(&[(10.0, 3.0), (12.0, 3.0)]);

        let even = model.quality(&even_a, &even_b);
        let lopsided = model.quality(&even_a, &lopsided_b);

        assert!(even > lopsided);
        assert!(even <= 1.0);
        assert!(lopsided >= 0.0);
        assert_eq!(model.quality(&[], &even_b), 0.0);
    }

    #[test]
    fn test_initial_rating() {
        let model = TrueSkillRatingModel::default();
        let initial = model.initial_rating();
        assert_eq!(initial.rating, 25.0);
        assert!(model.config().is_object());
    }
}
