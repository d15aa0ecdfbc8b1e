//! Team formation
//!
//! Splits a pool into two role-complete teams, ranks every split by balance,
//! filters out splits already produced for the session, and names captains.

pub mod balance;
pub mod captain;
pub mod engine;
pub mod history;
pub mod partition;
pub mod role;

pub use balance::{BalanceScorer, BalanceWeights, ScoredPartition};
pub use captain::select_captain;
pub use engine::{MatchmakingEngine, TeamFormation};
pub use history::{select, FingerprintPair, PartitionFingerprint, SessionHistory, Selection};
pub use partition::{generate, Partition, PartitionGenerator};
pub use role::{assign, AssignedTeam, RolePolicy, RoleRequirement, SlottedPlayer};
