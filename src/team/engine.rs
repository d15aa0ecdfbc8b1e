//! Matchmaking engine facade
//!
//! Runs role assignment, partition generation, balance scoring, history
//! filtering and captain selection as one synchronous, side-effect-free call.
//! Callers own persistence and must serialize calls for the same session.

use crate::error::{EngineResult, MatchmakingError};
use crate::rating::{RatingModel, TrueSkillRatingModel};
use crate::team::balance::{BalanceScorer, BalanceWeights, ScoredPartition};
use crate::team::captain::select_captain;
use crate::team::history::{select, FingerprintPair, SessionHistory};
use crate::team::partition::generate;
use crate::team::role::{skill_order, AssignedTeam, RolePolicy, RoleRequirement};
use crate::types::{
    Outcome, Player, PlayerId, PlayerRating, RatingChange, RatingUpdate, RosterEntry, TeamSide,
};
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Transition payload for FILLING → FORMED and FORMED/RESHUFFLED → RESHUFFLED
#[derive(Debug, Clone)]
pub struct TeamFormation {
    pub partition: ScoredPartition,
    pub captain_a: PlayerId,
    pub captain_b: PlayerId,
    pub fingerprints: FingerprintPair,
    /// Input history with this split recorded
    pub history: SessionHistory,
    pub reshuffle_index: u32,
    /// Role-valid partitions of the pool
    pub candidates: usize,
    /// Of those, partitions not excluded by history
    pub remaining: usize,
}

impl TeamFormation {
    /// Announced roster for one side, captain flagged
    pub fn roster(&self, side: TeamSide) -> Vec<RosterEntry> {
        let captain = match side {
            TeamSide::A => &self.captain_a,
            TeamSide::B => &self.captain_b,
        };
        self.partition.partition.team(side).roster(side, captain)
    }
}

/// The team balancing engine
#[derive(Debug, Clone)]
pub struct MatchmakingEngine {
    requirement: RoleRequirement,
    policy: RolePolicy,
    scorer: BalanceScorer,
    rating_model: Arc<dyn RatingModel>,
}

impl MatchmakingEngine {
    pub fn new(
        requirement: RoleRequirement,
        policy: RolePolicy,
        weights: BalanceWeights,
        rating_model: Arc<dyn RatingModel>,
    ) -> EngineResult<Self> {
        requirement.validate()?;

        Ok(Self {
            requirement,
            policy,
            scorer: BalanceScorer::new(weights).with_rating_model(rating_model.clone()),
            rating_model,
        })
    }

    /// Engine with default weights, strict roles and the TrueSkill model
    pub fn with_requirement(requirement: RoleRequirement) -> EngineResult<Self> {
        Self::new(
            requirement,
            RolePolicy::default(),
            BalanceWeights::default(),
            Arc::new(TrueSkillRatingModel::default()),
        )
    }

    pub fn requirement(&self) -> &RoleRequirement {
        &self.requirement
    }

    pub fn rating_model(&self) -> &Arc<dyn RatingModel> {
        &self.rating_model
    }

    /// Validate the pool and return it in canonical skill order
    fn canonical_pool(&self, pool: &[Player]) -> EngineResult<Vec<Player>> {
        if pool.len() != self.requirement.pool_size() {
            return Err(MatchmakingError::InsufficientPool {
                expected: self.requirement.pool_size(),
                actual: pool.len(),
            });
        }

        let mut seen = HashSet::new();
        if let Some(duplicate) = pool.iter().find(|p| !seen.insert(p.id.as_str())) {
            return Err(MatchmakingError::DuplicatePlayer {
                player_id: duplicate.id.clone(),
            });
        }

        let mut ordered = pool.to_vec();
        ordered.sort_by(skill_order);
        Ok(ordered)
    }

    /// Every role-valid partition of the pool, best first
    ///
    /// The result is independent of the input order of `pool`.
    pub fn rank_candidates(&self, pool: &[Player]) -> EngineResult<Vec<ScoredPartition>> {
        let ordered = self.canonical_pool(pool)?;
        let mut generator = generate(&ordered, &self.requirement, self.policy)?;
        let partitions: Vec<_> = generator.by_ref().collect();

        debug!(
            valid = partitions.len(),
            discarded = generator.discarded(),
            "Generated candidate partitions"
        );

        Ok(self.scorer.rank(partitions))
    }

    /// Form (or re-form) two teams for a session
    ///
    /// `reshuffle_index` 0 picks the best split not in `history`, 1 the next
    /// best, clamping to the worst remaining split. Previous captains are read
    /// from the `is_captain` hint on the pool's players.
    pub fn form_teams<R: Rng + ?Sized>(
        &self,
        pool: &[Player],
        history: &SessionHistory,
        reshuffle_index: u32,
        rng: &mut R,
    ) -> EngineResult<TeamFormation> {
        let ranked = self.rank_candidates(pool)?;
        if ranked.is_empty() {
            return Err(MatchmakingError::NoValidPartition);
        }

        let selection = select(&ranked, history, reshuffle_index as usize)
            .ok_or(MatchmakingError::HistoryExhausted)?;
        let chosen = selection.partition.clone();

        debug!(
            candidates = ranked.len(),
            remaining = selection.remaining,
            position = selection.position,
            score = chosen.score,
            "Selected partition"
        );

        let captain_a = Self::captain_for(&chosen.partition.team_a, rng)?;
        let captain_b = Self::captain_for(&chosen.partition.team_b, rng)?;
        let fingerprints = chosen.partition.fingerprints();

        Ok(TeamFormation {
            history: history.with_recorded(fingerprints.clone(), reshuffle_index),
            partition: chosen,
            captain_a,
            captain_b,
            fingerprints,
            reshuffle_index,
            candidates: ranked.len(),
            remaining: selection.remaining,
        })
    }

    fn captain_for<R: Rng + ?Sized>(team: &AssignedTeam, rng: &mut R) -> EngineResult<PlayerId> {
        let players: Vec<Player> = team.players().cloned().collect();
        let previous = players.iter().find(|p| p.is_captain).map(|p| &p.id);

        select_captain(&players, previous, rng).ok_or_else(|| MatchmakingError::InternalError {
            message: "Cannot select a captain for an empty team".to_string(),
        })
    }

    /// Apply a finished session's outcome to every participant
    pub fn rate_session(
        &self,
        team_a: &[Player],
        team_b: &[Player],
        outcome: Outcome,
    ) -> EngineResult<RatingUpdate> {
        let expected = self.requirement.team_size();
        if team_a.len() != expected || team_b.len() != expected {
            return Err(MatchmakingError::RatingUpdateMismatch {
                reason: format!(
                    "expected {} players per team, got {} and {}",
                    expected,
                    team_a.len(),
                    team_b.len()
                ),
            });
        }

        let ratings_a: Vec<PlayerRating> = team_a.iter().map(|p| p.rating).collect();
        let ratings_b: Vec<PlayerRating> = team_b.iter().map(|p| p.rating).collect();

        let match_quality = self.rating_model.quality(&ratings_a, &ratings_b);
        let (new_a, new_b) = self.rating_model.update(&ratings_a, &ratings_b, outcome)?;

        let changes = Self::changes(team_a, &new_a, TeamSide::A)
            .chain(Self::changes(team_b, &new_b, TeamSide::B))
            .collect();

        Ok(RatingUpdate {
            outcome,
            changes,
            match_quality,
        })
    }

    fn changes<'a>(
        team: &'a [Player],
        new_ratings: &'a [PlayerRating],
        side: TeamSide,
    ) -> impl Iterator<Item = RatingChange> + 'a {
        team.iter()
            .zip(new_ratings)
            .map(move |(player, new_rating)| RatingChange {
                player_id: player.id.clone(),
                side,
                old_rating: player.rating,
                new_rating: *new_rating,
            })
    }

    /// Quality estimate for two rosters as they stand
    pub fn match_quality(&self, team_a: &[Player], team_b: &[Player]) -> f64 {
        let ratings_a: Vec<PlayerRating> = team_a.iter().map(|p| p.rating).collect();
        let ratings_b: Vec<PlayerRating> = team_b.iter().map(|p| p.rating).collect();
        self.rating_model.quality(&ratings_a, &ratings_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Position, Role};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn player(id: &str, rating: f64, position: Position) -> Player {
        Player::new(
            id,
            id,
            PlayerRating {
                rating,
                uncertainty: 5.0,
            },
            position,
        )
    }

    fn specialists_and_flex() -> Vec<Player> {
        vec![
            player("off", 30.0, Position::Offense),
            player("cha", 30.0, Position::Chase),
            player("hom", 30.0, Position::Home),
            player("f1", 10.0, Position::Flexible),
            player("f2", 10.0, Position::Flexible),
            player("f3", 10.0, Position::Flexible),
        ]
    }

    fn engine() -> MatchmakingEngine {
        MatchmakingEngine::with_requirement(RoleRequirement::new(1, 1, 1)).unwrap()
    }

    #[test]
    fn test_concrete_six_player_scenario() {
        let engine = engine();
        let pool = specialists_and_flex();
        let mut rng = StdRng::seed_from_u64(3);

        let formation = engine
            .form_teams(&pool, &SessionHistory::new(), 0, &mut rng)
            .unwrap();

        for side in [TeamSide::A, TeamSide::B] {
            let roster = formation.roster(side);
            assert_eq!(roster.len(), 3);
            for role in Role::ALL {
                assert_eq!(roster.iter().filter(|r| r.role == role).count(), 1);
            }
            assert_eq!(roster.iter().filter(|r| r.is_captain).count(), 1);
        }

        // Means cannot be split evenly (90 vs 30 total): the best split puts
        // two specialists on one side and one on the other.
        let a_high = formation
            .partition
            .partition
            .team_a
            .players()
            .filter(|p| p.rating.rating == 30.0)
            .count();
        assert!(a_high == 1 || a_high == 2);
        assert!((formation.partition.score - 20.0 / 3.0).abs() < 1e-9);
        assert_eq!(formation.candidates, 10);
        assert_eq!(formation.remaining, 10);
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let engine = engine();
        let pool = specialists_and_flex();
        let mut reversed = pool.clone();
        reversed.reverse();

        let a = engine.rank_candidates(&pool).unwrap();
        let b = engine.rank_candidates(&reversed).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_pool_validation() {
        let engine = engine();
        let pool = specialists_and_flex();
        let mut rng = StdRng::seed_from_u64(0);

        let short = engine.form_teams(&pool[..4], &SessionHistory::new(), 0, &mut rng);
        assert_eq!(
            short.unwrap_err(),
            MatchmakingError::InsufficientPool {
                expected: 6,
                actual: 4
            }
        );

        let mut duplicated = pool.clone();
        duplicated[5] = duplicated[0].clone();
        let dup = engine.form_teams(&duplicated, &SessionHistory::new(), 0, &mut rng);
        assert!(matches!(
            dup,
            Err(MatchmakingError::DuplicatePlayer { player_id }) if player_id == "off"
        ));
    }

    #[test]
    fn test_no_valid_partition() {
        let engine = engine();
        let pool: Vec<Player> = (0..6)
            .map(|i| player(&format!("h{}", i), 20.0, Position::Home))
            .collect();
        let mut rng = StdRng::seed_from_u64(0);

        let result = engine.form_teams(&pool, &SessionHistory::new(), 0, &mut rng);
        assert_eq!(result.unwrap_err(), MatchmakingError::NoValidPartition);
    }

    #[test]
    fn test_reshuffles_never_repeat_a_team_until_exhausted() {
        let engine = engine();
        let pool = specialists_and_flex();
        let mut rng = StdRng::seed_from_u64(11);
        let mut history = SessionHistory::new();
        let mut produced = Vec::new();

        for index in 0.. {
            match engine.form_teams(&pool, &history, index, &mut rng) {
                Ok(formation) => {
                    assert!(!history.contains(&formation.fingerprints.team_a));
                    assert!(!history.contains(&formation.fingerprints.team_b));
                    history = formation.history.clone();
                    produced.push(formation);
                }
                Err(err) => {
                    assert_eq!(err, MatchmakingError::HistoryExhausted);
                    break;
                }
            }
        }

        assert!(!produced.is_empty());
        assert_eq!(history.pairs().len(), produced.len());
        assert_eq!(history.reshuffle_count as usize, produced.len() - 1);
    }

    #[test]
    fn test_previous_captain_is_preserved() {
        let engine = engine();
        let pool: Vec<Player> = specialists_and_flex()
            .into_iter()
            .map(|p| {
                let captain = p.id == "f1";
                p.with_captain(captain)
            })
            .collect();

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let formation = engine
                .form_teams(&pool, &SessionHistory::new(), 0, &mut rng)
                .unwrap();

            let captain = if formation.partition.partition.team_a.contains("f1") {
                &formation.captain_a
            } else {
                &formation.captain_b
            };
            assert_eq!(captain, "f1");
        }
    }

    #[test]
    fn test_rate_session() {
        let engine = engine();
        let pool = specialists_and_flex();
        let (team_a, team_b) = pool.split_at(3);

        let update = engine.rate_session(team_a, team_b, Outcome::BWins).unwrap();
        assert_eq!(update.changes.len(), 6);
        assert!(update
            .changes
            .iter()
            .filter(|c| c.side == TeamSide::B)
            .all(|c| c.mean_delta() > 0.0));
        assert!(update
            .changes
            .iter()
            .filter(|c| c.side == TeamSide::A)
            .all(|c| c.mean_delta() < 0.0));
        assert!(update.match_quality >= 0.0 && update.match_quality <= 1.0);
    }

    #[test]
    fn test_rate_session_size_mismatch() {
        let engine = engine();
        let pool = specialists_and_flex();

        let result = engine.rate_session(&pool[..2], &pool[2..], Outcome::Tie);
        assert!(matches!(
            result,
            Err(MatchmakingError::RatingUpdateMismatch { .. })
        ));
    }
}
