//! Enumeration of role-valid two-team partitions of a pool
//!
//! Team A candidates are the `team_size` combinations of pool indices that
//! contain index 0. Every split therefore appears once, never as its mirror,
//! and the emission order depends only on the pool order.

use crate::error::{EngineResult, MatchmakingError};
use crate::team::history::FingerprintPair;
use crate::team::role::{assign, AssignedTeam, RolePolicy, RoleRequirement};
use crate::types::{Player, TeamSide};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// A candidate split of the pool into two opposing, role-complete teams
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    pub team_a: AssignedTeam,
    pub team_b: AssignedTeam,
}

impl Partition {
    pub fn team(&self, side: TeamSide) -> &AssignedTeam {
        match side {
            TeamSide::A => &self.team_a,
            TeamSide::B => &self.team_b,
        }
    }

    /// Members placed outside their stated preference, both teams
    pub fn off_role_count(&self) -> usize {
        self.team_a.off_role_count() + self.team_b.off_role_count()
    }

    /// Membership digests of both teams
    pub fn fingerprints(&self) -> FingerprintPair {
        FingerprintPair::of(self)
    }
}

/// Lazy, finite, deterministic sequence of role-valid partitions
pub struct PartitionGenerator<'a> {
    pool: &'a [Player],
    req: RoleRequirement,
    policy: RolePolicy,
    combinations: Box<dyn Iterator<Item = Vec<usize>> + 'a>,
    discarded: usize,
}

impl<'a> PartitionGenerator<'a> {
    /// Candidates rejected so far because a side could not fill its slots
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    fn build(&self, team_a_indices: &[usize]) -> EngineResult<Partition> {
        let mut in_team_a = vec![false; self.pool.len()];
        for &index in team_a_indices {
            in_team_a[index] = true;
        }

        let (team_a, team_b): (Vec<Player>, Vec<Player>) = self
            .pool
            .iter()
            .cloned()
            .zip(in_team_a)
            .partition_map(|(player, is_a)| {
                if is_a {
                    itertools::Either::Left(player)
                } else {
                    itertools::Either::Right(player)
                }
            });

        Ok(Partition {
            team_a: assign(&team_a, &self.req, self.policy)?,
            team_b: assign(&team_b, &self.req, self.policy)?,
        })
    }
}

impl Iterator for PartitionGenerator<'_> {
    type Item = Partition;

    fn next(&mut self) -> Option<Partition> {
        loop {
            let indices = self.combinations.next()?;

            // Lexicographic order: once index 0 leaves team A, only mirrors remain
            if indices.first() != Some(&0) {
                return None;
            }

            match self.build(&indices) {
                Ok(partition) => return Some(partition),
                Err(_) => self.discarded += 1,
            }
        }
    }
}

/// Enumerate every role-valid partition of `pool`
///
/// The pool must hold exactly `2 * req.team_size()` players.
pub fn generate<'a>(
    pool: &'a [Player],
    req: &RoleRequirement,
    policy: RolePolicy,
) -> EngineResult<PartitionGenerator<'a>> {
    req.validate()?;

    if pool.len() != req.pool_size() {
        return Err(MatchmakingError::InsufficientPool {
            expected: req.pool_size(),
            actual: pool.len(),
        });
    }

    Ok(PartitionGenerator {
        pool,
        req: *req,
        policy,
        combinations: Box::new((0..pool.len()).combinations(req.team_size())),
        discarded: 0,
    })
}
