//! Pickup Room - team matchmaking and balancing engine
//!
//! This crate splits a queue of players into two balanced, role-complete
//! teams, reshuffles without ever repeating a team for the same session, and
//! updates TrueSkill ratings once a session finishes.

pub mod config;
pub mod error;
pub mod metrics;
pub mod rating;
pub mod session;
pub mod team;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{EngineResult, MatchmakingError, Result};
pub use types::*;

// Re-export key components
pub use session::{SessionManager, SessionRepository, SessionStatus};
pub use team::{MatchmakingEngine, RolePolicy, RoleRequirement, SessionHistory, TeamFormation};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
