//! Error types for the team balancing engine
//!
//! Engine entry points return [`EngineResult`] so callers can match on the
//! failure kind directly. The session and configuration layers use anyhow for
//! consistent propagation; the typed error is still reachable through
//! `anyhow::Error::downcast_ref::<MatchmakingError>()`.

use crate::session::SessionStatus;
use crate::types::{Outcome, PlayerId, SessionId};

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Result type for pure engine calls
pub type EngineResult<T> = std::result::Result<T, MatchmakingError>;

/// Custom error types for specific matchmaking scenarios
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MatchmakingError {
    #[error("Insufficient pool: expected {expected} players, got {actual}")]
    InsufficientPool { expected: usize, actual: usize },

    #[error("No role-satisfying partition exists for this pool")]
    NoValidPartition,

    #[error("Every valid partition has already been used for this session")]
    HistoryExhausted,

    #[error("Rating update mismatch: {reason}")]
    RatingUpdateMismatch { reason: String },

    #[error("Player {player_id} appears more than once in the pool")]
    DuplicatePlayer { player_id: PlayerId },

    #[error("Role assignment incomplete: filled {filled} of {required} slots")]
    RoleAssignmentFailed { filled: usize, required: usize },

    #[error("Reshuffle limit reached for session {session_id} ({limit} allowed)")]
    ReshuffleLimitReached { session_id: SessionId, limit: u32 },

    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: SessionId },

    #[error("Invalid session transition from {from} to {to}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },

    #[error("Session {session_id} already recorded {recorded}, cannot report {reported}")]
    ResultConflict {
        session_id: SessionId,
        recorded: Outcome,
        reported: Outcome,
    },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}

impl MatchmakingError {
    /// Short stable label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            MatchmakingError::InsufficientPool { .. } => "insufficient_pool",
            MatchmakingError::NoValidPartition => "no_valid_partition",
            MatchmakingError::HistoryExhausted => "history_exhausted",
            MatchmakingError::RatingUpdateMismatch { .. } => "rating_update_mismatch",
            MatchmakingError::DuplicatePlayer { .. } => "duplicate_player",
            MatchmakingError::RoleAssignmentFailed { .. } => "role_assignment_failed",
            MatchmakingError::ReshuffleLimitReached { .. } => "reshuffle_limit_reached",
            MatchmakingError::SessionNotFound { .. } => "session_not_found",
            MatchmakingError::InvalidTransition { .. } => "invalid_transition",
            MatchmakingError::ResultConflict { .. } => "result_conflict",
            MatchmakingError::ConfigurationError { .. } => "configuration_error",
            MatchmakingError::InternalError { .. } => "internal_error",
        }
    }
}
