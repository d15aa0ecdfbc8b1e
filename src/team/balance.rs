//! Balance scoring and ranking of candidate partitions
//!
//! Lower scores are better. The sort is stable, so candidates with equal
//! scores keep the generator's emission order.

use crate::rating::RatingModel;
use crate::team::partition::Partition;
use crate::types::PlayerRating;
use crate::utils::{average_rating, average_uncertainty, rating_difference};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Weights for the secondary scoring terms
///
/// The mean difference always carries weight 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalanceWeights {
    /// Multiplier on the average-uncertainty difference
    pub uncertainty: f64,
    /// Cost per player placed outside their stated role
    pub role_mismatch: f64,
    /// Multiplier on `1 - quality`; 0.0 leaves the rating model unused
    pub quality: f64,
}

impl Default for BalanceWeights {
    fn default() -> Self {
        Self {
            uncertainty: 1.0,
            role_mismatch: 0.1,
            quality: 0.0,
        }
    }
}

/// A partition paired with its balance score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPartition {
    pub partition: Partition,
    pub score: f64,
}

/// Scores and ranks candidate partitions
#[derive(Debug, Clone)]
pub struct BalanceScorer {
    weights: BalanceWeights,
    rating_model: Option<Arc<dyn RatingModel>>,
}

impl BalanceScorer {
    pub fn new(weights: BalanceWeights) -> Self {
        Self {
            weights,
            rating_model: None,
        }
    }

    /// Consult a rating model for the quality term
    pub fn with_rating_model(mut self, rating_model: Arc<dyn RatingModel>) -> Self {
        self.rating_model = Some(rating_model);
        self
    }

    pub fn weights(&self) -> &BalanceWeights {
        &self.weights
    }

    /// Balance score of one partition, lower is better
    pub fn score(&self, partition: &Partition) -> f64 {
        let mean_gap = rating_difference(
            average_rating(partition.team_a.players()),
            average_rating(partition.team_b.players()),
        );
        let uncertainty_gap = rating_difference(
            average_uncertainty(partition.team_a.players()),
            average_uncertainty(partition.team_b.players()),
        );
        let mismatches = partition.off_role_count() as f64;

        mean_gap
            + self.weights.uncertainty * uncertainty_gap
            + self.weights.role_mismatch * mismatches
            + self.quality_penalty(partition)
    }

    fn quality_penalty(&self, partition: &Partition) -> f64 {
        match &self.rating_model {
            Some(model) if self.weights.quality > 0.0 => {
                let team_a: Vec<PlayerRating> =
                    partition.team_a.players().map(|p| p.rating).collect();
                let team_b: Vec<PlayerRating> =
                    partition.team_b.players().map(|p| p.rating).collect();
                self.weights.quality * (1.0 - model.quality(&team_a, &team_b))
            }
            _ => 0.0,
        }
    }

    /// Score every candidate and order best first
    pub fn rank(&self, partitions: impl IntoIterator<Item = Partition>) -> Vec<ScoredPartition> {
        let mut scored: Vec<ScoredPartition> = partitions
            .into_iter()
            .map(|partition| ScoredPartition {
                score: self.score(&partition),
                partition,
            })
            .collect();

        scored.sort_by(|a, b| a.score.total_cmp(&b.score));
        scored
    }
}

impl Default for BalanceScorer {
    fn default() -> Self {
        Self::new(BalanceWeights::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rating::NoOpRatingModel;
    use crate::team::partition::generate;
    use crate::team::role::{RolePolicy, RoleRequirement};
    use crate::types::{Player, Position};

    fn player(id: &str, rating: f64, uncertainty: f64, position: Position) -> Player {
        Player::new(
            id,
            id,
            PlayerRating {
                rating,
                uncertainty,
            },
            position,
        )
    }

    fn ranked(pool: &[Player], req: RoleRequirement, scorer: &BalanceScorer) -> Vec<ScoredPartition> {
        scorer.rank(generate(pool, &req, RolePolicy::Strict).unwrap())
    }

    #[test]
    fn test_empty_input_ranks_empty() {
        let scorer = BalanceScorer::default();
        assert!(scorer.rank(Vec::new()).is_empty());
    }

    #[test]
    fn test_best_split_pairs_high_with_low() {
        let pool = vec![
            player("a", 40.0, 5.0, Position::Flexible),
            player("b", 30.0, 5.0, Position::Flexible),
            player("c", 20.0, 5.0, Position::Flexible),
            player("d", 10.0, 5.0, Position::Flexible),
        ];
        let ranked = ranked(&pool, RoleRequirement::new(1, 1, 0), &BalanceScorer::default());

        assert_eq!(ranked.len(), 3);
        let best = &ranked[0];
        assert_eq!(best.score, 0.0);
        assert!(best.partition.team_a.contains("a"));
        assert!(best.partition.team_a.contains("d"));
        assert!(ranked.windows(2).all(|w| w[0].score <= w[1].score));
    }

    #[test]
    fn test_uncertainty_term_separates_equal_means() {
        let pool = vec![
            player("a", 20.0, 1.0, Position::Flexible),
            player("b", 20.0, 1.0, Position::Flexible),
            player("c", 20.0, 9.0, Position::Flexible),
            player("d", 20.0, 9.0, Position::Flexible),
        ];
        let ranked = ranked(&pool, RoleRequirement::new(1, 1, 0), &BalanceScorer::default());

        // Confident players split across both sides beat confident-vs-unsure
        assert!(ranked[0].partition.team_a.contains("a"));
        assert!(!ranked[0].partition.team_a.contains("b"));
        assert_eq!(ranked[0].score, 0.0);
        assert_eq!(ranked.last().unwrap().score, 8.0);
    }

    #[test]
    fn test_role_mismatch_penalty() {
        let scorer = BalanceScorer::new(BalanceWeights {
            role_mismatch: 0.5,
            ..BalanceWeights::default()
        });
        let pool = vec![
            player("o1", 20.0, 5.0, Position::Offense),
            player("o2", 20.0, 5.0, Position::Offense),
            player("o3", 20.0, 5.0, Position::Offense),
            player("o4", 20.0, 5.0, Position::Offense),
        ];

        let ranked = scorer.rank(
            generate(&pool, &RoleRequirement::new(1, 1, 0), RolePolicy::AllowOffRole).unwrap(),
        );
        assert!(!ranked.is_empty());
        // One chase slot per side must be filled off-role
        assert!(ranked.iter().all(|s| s.score == 1.0));
    }

    #[test]
    fn test_equal_scores_keep_emission_order() {
        let pool: Vec<Player> = (0..6)
            .map(|i| player(&format!("p{}", i), 25.0, 5.0, Position::Flexible))
            .collect();
        let req = RoleRequirement::new(1, 1, 1);

        let emitted: Vec<Partition> = generate(&pool, &req, RolePolicy::Strict).unwrap().collect();
        let ranked = BalanceScorer::default().rank(emitted.clone());

        let ranked_partitions: Vec<Partition> =
            ranked.into_iter().map(|s| s.partition).collect();
        assert_eq!(ranked_partitions, emitted);
    }

    #[test]
    fn test_quality_term_uses_rating_model() {
        let pool = vec![
            player("a", 20.0, 5.0, Position::Flexible),
            player("b", 20.0, 5.0, Position::Flexible),
        ];
        let req = RoleRequirement::new(1, 0, 0);
        let weights = BalanceWeights {
            quality: 2.0,
            ..BalanceWeights::default()
        };

        let without_model = ranked(&pool, req, &BalanceScorer::new(weights));
        assert_eq!(without_model[0].score, 0.0);

        let with_model = ranked(
            &pool,
            req,
            &BalanceScorer::new(weights)
                .with_rating_model(Arc::new(NoOpRatingModel::default().with_quality(0.25))),
        );
        assert_eq!(with_model[0].score, 1.5);
    }
}
