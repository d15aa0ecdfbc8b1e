//! Reshuffle history and the deduplicating selector
//!
//! A [`PartitionFingerprint`] digests team membership only. Two rosters with
//! the same players collide even when roles differ, so moving players between
//! positions never counts as a new split.

use crate::team::balance::ScoredPartition;
use crate::team::partition::Partition;
use crate::team::role::AssignedTeam;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

/// Order-independent digest of a roster's player identities
///
/// SHA-256 over the ascending identity list, hex encoded. Each identity is
/// fed with its byte length first so no two distinct lists share an input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionFingerprint(String);

impl PartitionFingerprint {
    pub fn of_ids<'a>(ids: impl IntoIterator<Item = &'a str>) -> Self {
        let mut ids: Vec<&str> = ids.into_iter().collect();
        ids.sort_unstable();

        let mut hasher = Sha256::new();
        for id in ids {
            hasher.update((id.len() as u64).to_le_bytes());
            hasher.update(id.as_bytes());
        }
        Self(hex::encode(hasher.finalize()))
    }

    pub fn of_team(team: &AssignedTeam) -> Self {
        Self::of_ids(team.player_ids().map(String::as_str))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PartitionFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0[..12.min(self.0.len())])
    }
}

/// Fingerprints of both teams of one partition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FingerprintPair {
    pub team_a: PartitionFingerprint,
    pub team_b: PartitionFingerprint,
}

impl FingerprintPair {
    pub fn of(partition: &Partition) -> Self {
        Self {
            team_a: PartitionFingerprint::of_team(&partition.team_a),
            team_b: PartitionFingerprint::of_team(&partition.team_b),
        }
    }
}

/// Splits already produced for one session
///
/// Owned by the session store; the engine receives a copy and returns the
/// updated value without touching storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredHistory", into = "StoredHistory")]
pub struct SessionHistory {
    pairs: Vec<FingerprintPair>,
    used: BTreeSet<PartitionFingerprint>,
    pub reshuffle_count: u32,
}

/// Persisted shape of a history; the lookup set is rebuilt on load
#[derive(Serialize, Deserialize)]
struct StoredHistory {
    pairs: Vec<FingerprintPair>,
    reshuffle_count: u32,
}

impl From<StoredHistory> for SessionHistory {
    fn from(stored: StoredHistory) -> Self {
        Self::from_pairs(stored.pairs, stored.reshuffle_count)
    }
}

impl From<SessionHistory> for StoredHistory {
    fn from(history: SessionHistory) -> Self {
        Self {
            pairs: history.pairs,
            reshuffle_count: history.reshuffle_count,
        }
    }
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a history from persisted pairs
    pub fn from_pairs(pairs: Vec<FingerprintPair>, reshuffle_count: u32) -> Self {
        let used = pairs
            .iter()
            .flat_map(|pair| [pair.team_a.clone(), pair.team_b.clone()])
            .collect();
        Self {
            pairs,
            used,
            reshuffle_count,
        }
    }

    pub fn pairs(&self) -> &[FingerprintPair] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Whether a single team grouping has been produced before
    pub fn contains(&self, fingerprint: &PartitionFingerprint) -> bool {
        self.used.contains(fingerprint)
    }

    /// Whether either team of the partition has been produced before
    pub fn has_seen(&self, partition: &Partition) -> bool {
        let pair = partition.fingerprints();
        self.contains(&pair.team_a) || self.contains(&pair.team_b)
    }

    /// Record a produced split and the reshuffle counter that produced it
    pub fn record(&mut self, pair: FingerprintPair, reshuffle_count: u32) {
        self.used.insert(pair.team_a.clone());
        self.used.insert(pair.team_b.clone());
        self.pairs.push(pair);
        self.reshuffle_count = reshuffle_count;
    }

    /// Copy of this history with one more split recorded
    pub fn with_recorded(&self, pair: FingerprintPair, reshuffle_count: u32) -> Self {
        let mut next = self.clone();
        next.record(pair, reshuffle_count);
        next
    }
}

/// Result of filtering the ranked candidates against history
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection<'a> {
    pub partition: &'a ScoredPartition,
    /// Candidates whose teams were never produced before
    pub remaining: usize,
    /// Position actually taken after clamping
    pub position: usize,
}

/// Pick the `reshuffle_index`-th best never-seen split
///
/// Indices past the end clamp to the worst remaining split. Returns `None`
/// only when every ranked candidate shares a team with history.
pub fn select<'a>(
    ranked: &'a [ScoredPartition],
    history: &SessionHistory,
    reshuffle_index: usize,
) -> Option<Selection<'a>> {
    let fresh: Vec<&ScoredPartition> = ranked
        .iter()
        .filter(|candidate| !history.has_seen(&candidate.partition))
        .collect();

    let last = fresh.len().checked_sub(1)?;
    let position = reshuffle_index.min(last);

    Some(Selection {
        partition: fresh[position],
        remaining: fresh.len(),
        position,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::team::balance::BalanceScorer;
    use crate::team::partition::generate;
    use crate::team::role::{RolePolicy, RoleRequirement};
    use crate::types::{Player, PlayerRating, Position};

    fn ranked_four_player_splits() -> Vec<ScoredPartition> {
        let pool: Vec<Player> = [("a", 40.0), ("b", 30.0), ("c", 20.0), ("d", 10.0)]
            .iter()
            .map(|(id, rating)| {
                Player::new(
                    *id,
                    *id,
                    PlayerRating {
                        rating: *rating,
                        uncertainty: 5.0,
                    },
                    Position::Flexible,
                )
            })
            .collect();
        let generator = generate(&pool, &RoleRequirement::new(1, 1, 0), RolePolicy::Strict).unwrap();
        BalanceScorer::default().rank(generator)
    }

    #[test]
    fn test_fingerprint_ignores_order() {
        let a = PartitionFingerprint::of_ids(["p3", "p1", "p2"]);
        let b = PartitionFingerprint::of_ids(["p1", "p2", "p3"]);
        let c = PartitionFingerprint::of_ids(["p1", "p2", "p4"]);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_fingerprint_separates_ids_containing_delimiters() {
        let split_late = PartitionFingerprint::of_ids(["a,b", "c"]);
        let split_early = PartitionFingerprint::of_ids(["a", "b,c"]);
        let three = PartitionFingerprint::of_ids(["a", "b", "c"]);

        assert_ne!(split_late, split_early);
        assert_ne!(split_late, three);
        assert_ne!(split_early, three);
        assert_ne!(
            PartitionFingerprint::of_ids(["ab", ""]),
            PartitionFingerprint::of_ids(["a", "b"])
        );
    }

    #[test]
    fn test_fingerprint_display_is_abbreviated() {
        let fp = PartitionFingerprint::of_ids(["x"]);
        assert_eq!(fp.to_string().len(), 12);
    }

    #[test]
    fn test_history_record_and_rebuild() {
        let pair = FingerprintPair {
            team_a: PartitionFingerprint::of_ids(["a", "b"]),
            team_b: PartitionFingerprint::of_ids(["c", "d"]),
        };

        let mut history = SessionHistory::new();
        assert!(history.is_empty());
        history.record(pair.clone(), 0);

        assert!(history.contains(&pair.team_a));
        assert!(history.contains(&pair.team_b));
        assert!(!history.contains(&PartitionFingerprint::of_ids(["a", "c"])));

        let rebuilt = SessionHistory::from_pairs(history.pairs().to_vec(), 0);
        assert_eq!(rebuilt, history);

        let next = history.with_recorded(pair, 1);
        assert_eq!(next.reshuffle_count, 1);
        assert_eq!(next.pairs().len(), 2);
        assert_eq!(history.pairs().len(), 1);
    }

    #[test]
    fn test_history_survives_json() {
        let mut history = SessionHistory::new();
        history.record(
            FingerprintPair {
                team_a: PartitionFingerprint::of_ids(["a"]),
                team_b: PartitionFingerprint::of_ids(["b"]),
            },
            2,
        );

        let json = serde_json::to_string(&history).unwrap();
        assert!(!json.contains("used"));

        let decoded: SessionHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, history);
        assert!(decoded.contains(&PartitionFingerprint::of_ids(["b"])));
    }

    #[test]
    fn test_select_best_with_empty_history() {
        let ranked = ranked_four_player_splits();
        let selection = select(&ranked, &SessionHistory::new(), 0).unwrap();

        assert_eq!(selection.partition, &ranked[0]);
        assert_eq!(selection.remaining, 3);
        assert_eq!(selection.position, 0);
    }

    #[test]
    fn test_select_clamps_to_worst_remaining() {
        let ranked = ranked_four_player_splits();
        let selection = select(&ranked, &SessionHistory::new(), 10).unwrap();

        assert_eq!(selection.position, 2);
        assert_eq!(selection.partition, &ranked[2]);
    }

    #[test]
    fn test_select_skips_seen_teams() {
        let ranked = ranked_four_player_splits();
        let mut history = SessionHistory::new();
        history.record(ranked[0].partition.fingerprints(), 0);

        let selection = select(&ranked, &history, 0).unwrap();
        assert_eq!(selection.partition, &ranked[1]);
        assert_eq!(selection.remaining, 2);
    }

    #[test]
    fn test_select_exhausted_history() {
        let ranked = ranked_four_player_splits();
        let mut history = SessionHistory::new();
        for (index, candidate) in ranked.iter().enumerate() {
            history.record(candidate.partition.fingerprints(), index as u32);
        }

        assert!(select(&ranked, &history, 0).is_none());
        assert!(select(&[], &SessionHistory::new(), 0).is_none());
    }

    #[test]
    fn test_history_only_grows_across_selections() {
        let ranked = ranked_four_player_splits();
        let mut history = SessionHistory::new();
        let mut previous_len = 0;

        while let Some(selection) = select(&ranked, &history, 0) {
            history = history.with_recorded(selection.partition.partition.fingerprints(), 0);
            assert!(history.pairs().len() > previous_len);
            previous_len = history.pairs().len();
        }
        assert_eq!(previous_len, 3);
    }
}
