//! Rating system integration using the TrueSkill algorithm
//!
//! This module provides the two-team rating model, storage interfaces, and
//! integration with the skillratings crate.

pub mod calculator;
pub mod storage;
pub mod trueskill;

// Re-export commonly used types
pub use calculator::{NoOpRatingModel, RatingModel, TeamRatings};
pub use storage::{InMemoryRatingStorage, RatingEntry, RatingStorage};
pub use trueskill::{ExtendedTrueSkillConfig, TrueSkillRatingModel};
