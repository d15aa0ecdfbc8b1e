//! Rating system configuration

use crate::rating::ExtendedTrueSkillConfig;
use serde::{Deserialize, Serialize};
use skillratings::trueskill::TrueSkillConfig;

/// TrueSkill parameters as they appear in configuration files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    /// Mean assigned to players with no stored rating
    pub initial_rating: f64,
    /// Uncertainty assigned to players with no stored rating
    pub initial_uncertainty: f64,
    /// Skill difference that gives roughly 76% win probability
    pub beta: f64,
    /// Chance of a tie between evenly matched teams
    pub draw_probability: f64,
    /// Uncertainty added before every update
    pub dynamics: f64,
}

impl Default for RatingConfig {
    fn default() -> Self {
        let trueskill = TrueSkillConfig::new();
        Self {
            initial_rating: 25.0,
            initial_uncertainty: 25.0 / 3.0,
            beta: trueskill.beta,
            draw_probability: trueskill.draw_probability,
            dynamics: trueskill.default_dynamics,
        }
    }
}

impl RatingConfig {
    pub fn to_trueskill_config(&self) -> ExtendedTrueSkillConfig {
        ExtendedTrueSkillConfig {
            trueskill_config: TrueSkillConfig {
                draw_probability: self.draw_probability,
                beta: self.beta,
                default_dynamics: self.dynamics,
            },
            initial_rating: self.initial_rating,
            initial_uncertainty: self.initial_uncertainty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_trueskill_defaults() {
        let config = RatingConfig::default().to_trueskill_config();
        let reference = ExtendedTrueSkillConfig::default();

        assert_eq!(config.initial_rating, reference.initial_rating);
        assert_eq!(config.initial_uncertainty, reference.initial_uncertainty);
        assert_eq!(config.trueskill_config.beta, reference.trueskill_config.beta);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_parameters_fail_validation() {
        let config = RatingConfig {
            draw_probability: 1.5,
            ..RatingConfig::default()
        };
        assert!(config.to_trueskill_config().validate().is_err());
    }
}
