//! Session record and roster lifecycle
//!
//! A session moves `Empty → Filling → Formed → (Reshuffled)* → Live → Finished`,
//! with `Cancelled` reachable from `Filling`, `Formed` and `Reshuffled`.

use crate::error::{EngineResult, MatchmakingError};
use crate::team::{Partition, TeamFormation};
use crate::types::{Player, PlayerId, RatingUpdate, SessionId, TeamSide, TeamsAnnounced};
use crate::utils::{current_timestamp, generate_session_id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Possible states of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Created, nobody pulled from the queue yet
    Empty,
    /// Waiting for the queue to hold a full pool
    Filling,
    /// Teams announced for the first time
    Formed,
    /// Teams replaced at least once
    Reshuffled,
    /// Teams locked and the game is running
    Live,
    /// Result reported (terminal)
    Finished,
    /// Abandoned before going live (terminal)
    Cancelled,
}

impl SessionStatus {
    /// Whether the lifecycle permits moving from `self` to `next`
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        use SessionStatus::*;

        matches!(
            (self, next),
            (Empty, Filling)
                | (Filling, Formed)
                | (Formed, Reshuffled)
                | (Reshuffled, Reshuffled)
                | (Formed, Live)
                | (Reshuffled, Live)
                | (Live, Finished)
                | (Filling, Cancelled)
                | (Formed, Cancelled)
                | (Reshuffled, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Finished | SessionStatus::Cancelled)
    }

    /// Lowercase label for logs and metrics
    pub fn label(self) -> &'static str {
        match self {
            SessionStatus::Empty => "empty",
            SessionStatus::Filling => "filling",
            SessionStatus::Formed => "formed",
            SessionStatus::Reshuffled => "reshuffled",
            SessionStatus::Live => "live",
            SessionStatus::Finished => "finished",
            SessionStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Current split of a session, as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRoster {
    pub partition: Partition,
    pub captain_a: PlayerId,
    pub captain_b: PlayerId,
    pub score: f64,
}

impl SessionRoster {
    pub fn captain(&self, side: TeamSide) -> &PlayerId {
        match side {
            TeamSide::A => &self.captain_a,
            TeamSide::B => &self.captain_b,
        }
    }

    /// Players of one side as currently rostered
    pub fn players(&self, side: TeamSide) -> Vec<Player> {
        self.partition.team(side).players().cloned().collect()
    }

    /// The whole roster as a pool for re-forming, captains flagged
    pub fn reshuffle_pool(&self) -> Vec<Player> {
        [TeamSide::A, TeamSide::B]
            .into_iter()
            .flat_map(|side| {
                let captain = self.captain(side).clone();
                self.partition
                    .team(side)
                    .players()
                    .cloned()
                    .map(move |p| {
                        let is_captain = p.id == captain;
                        p.with_captain(is_captain)
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

impl From<&TeamFormation> for SessionRoster {
    fn from(formation: &TeamFormation) -> Self {
        Self {
            partition: formation.partition.partition.clone(),
            captain_a: formation.captain_a.clone(),
            captain_b: formation.captain_b.clone(),
            score: formation.partition.score,
        }
    }
}

/// One session from pool-fill through finish or cancel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    queue: String,
    status: SessionStatus,
    roster: Option<SessionRoster>,
    reshuffle_count: u32,
    /// Rating update computed for the reported result, kept so a retried
    /// report applies the same update
    #[serde(default)]
    result: Option<RatingUpdate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a session in the `Empty` state
    pub fn new(queue: impl Into<String>) -> Self {
        let now = current_timestamp();
        Self {
            id: generate_session_id(),
            queue: queue.into(),
            status: SessionStatus::Empty,
            roster: None,
            reshuffle_count: 0,
            result: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn roster(&self) -> Option<&SessionRoster> {
        self.roster.as_ref()
    }

    pub fn reshuffle_count(&self) -> u32 {
        self.reshuffle_count
    }

    pub fn result(&self) -> Option<&RatingUpdate> {
        self.result.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Move to `next`, rejecting transitions the lifecycle forbids
    pub fn transition(&mut self, next: SessionStatus) -> EngineResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(MatchmakingError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        self.status = next;
        self.updated_at = current_timestamp();
        Ok(())
    }

    /// Store a freshly formed or reshuffled split and move to `next`
    pub fn apply_formation(
        &mut self,
        formation: &TeamFormation,
        next: SessionStatus,
    ) -> EngineResult<()> {
        self.transition(next)?;
        self.roster = Some(SessionRoster::from(formation));
        self.reshuffle_count = formation.reshuffle_index;
        Ok(())
    }

    /// Record the rating update for a live session's result
    ///
    /// A result can be recorded once; reporting a different outcome later is
    /// a conflict.
    pub fn record_result(&mut self, update: RatingUpdate) -> EngineResult<()> {
        if self.status != SessionStatus::Live {
            return Err(MatchmakingError::InvalidTransition {
                from: self.status,
                to: SessionStatus::Finished,
            });
        }
        if let Some(recorded) = &self.result {
            if recorded.outcome != update.outcome {
                return Err(MatchmakingError::ResultConflict {
                    session_id: self.id,
                    recorded: recorded.outcome,
                    reported: update.outcome,
                });
            }
            return Ok(());
        }

        self.result = Some(update);
        self.updated_at = current_timestamp();
        Ok(())
    }

    /// The payload announced to players for the current split
    pub fn announcement(&self) -> Option<TeamsAnnounced> {
        let roster = self.roster.as_ref()?;

        Some(TeamsAnnounced {
            session_id: self.id,
            reshuffle_count: self.reshuffle_count,
            team_a: roster
                .partition
                .team_a
                .roster(TeamSide::A, &roster.captain_a),
            team_b: roster
                .partition
                .team_b
                .roster(TeamSide::B, &roster.captain_b),
            score: roster.score,
            timestamp: self.updated_at,
        })
    }
}
