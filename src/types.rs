//! Common types used throughout the team balancing engine

use chrono::{DateTime, Utc};
use enum_map::Enum;
use serde::{Deserialize, Serialize};
use skillratings::trueskill::TrueSkillRating;
use uuid::Uuid;

/// Stable identity of a player
pub type PlayerId = String;

/// Unique identifier for sessions
pub type SessionId = Uuid;

/// A role slot a team must fill
///
/// The declaration order is the enumeration order used for every tie-break.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Enum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Offense,
    Chase,
    Home,
}

impl Role {
    /// All roles in tie-break order
    pub const ALL: [Role; 3] = [Role::Offense, Role::Chase, Role::Home];
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Offense => write!(f, "offense"),
            Role::Chase => write!(f, "chase"),
            Role::Home => write!(f, "home"),
        }
    }
}

/// A player's stated role preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Offense,
    Chase,
    Home,
    Flexible,
}

impl Position {
    /// The fixed role this preference names, `None` for flexible players
    pub fn role(self) -> Option<Role> {
        match self {
            Position::Offense => Some(Role::Offense),
            Position::Chase => Some(Role::Chase),
            Position::Home => Some(Role::Home),
            Position::Flexible => None,
        }
    }

    pub fn is_flexible(self) -> bool {
        self == Position::Flexible
    }
}

impl From<Role> for Position {
    fn from(role: Role) -> Self {
        match role {
            Role::Offense => Position::Offense,
            Role::Chase => Position::Chase,
            Role::Home => Position::Home,
        }
    }
}

/// Skill belief for a player: mean and uncertainty
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerRating {
    pub rating: f64,
    pub uncertainty: f64,
}

impl Default for PlayerRating {
    fn default() -> Self {
        Self {
            rating: 25.0,
            uncertainty: 25.0 / 3.0,
        }
    }
}

impl From<TrueSkillRating> for PlayerRating {
    fn from(rating: TrueSkillRating) -> Self {
        Self {
            rating: rating.rating,
            uncertainty: rating.uncertainty,
        }
    }
}

impl From<PlayerRating> for TrueSkillRating {
    fn from(rating: PlayerRating) -> Self {
        Self {
            rating: rating.rating,
            uncertainty: rating.uncertainty,
        }
    }
}

/// Player information for matchmaking
///
/// Built fresh from directory and rating lookups for every matchmaking call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    pub rating: PlayerRating,
    pub preferred_role: Position,
    /// Hint only: the player captained the previous split of this session
    #[serde(default)]
    pub is_captain: bool,
}

impl Player {
    pub fn new(
        id: impl Into<PlayerId>,
        display_name: impl Into<String>,
        rating: PlayerRating,
        preferred_role: Position,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            rating,
            preferred_role,
            is_captain: false,
        }
    }

    pub fn with_captain(mut self, is_captain: bool) -> Self {
        self.is_captain = is_captain;
        self
    }
}

/// One of the two opposing teams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamSide {
    A,
    B,
}

impl std::fmt::Display for TeamSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TeamSide::A => write!(f, "A"),
            TeamSide::B => write!(f, "B"),
        }
    }
}

/// Result of a finished session from team A's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    AWins,
    BWins,
    Tie,
}

impl std::str::FromStr for Outcome {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "a" | "a-wins" | "a_wins" | "awins" => Ok(Outcome::AWins),
            "b" | "b-wins" | "b_wins" | "bwins" => Ok(Outcome::BWins),
            "tie" | "draw" => Ok(Outcome::Tie),
            other => Err(anyhow::anyhow!("Unknown outcome: {}", other)),
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::AWins => write!(f, "a_wins"),
            Outcome::BWins => write!(f, "b_wins"),
            Outcome::Tie => write!(f, "tie"),
        }
    }
}

/// Rating change information for a player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingChange {
    pub player_id: PlayerId,
    pub side: TeamSide,
    pub old_rating: PlayerRating,
    pub new_rating: PlayerRating,
}

impl RatingChange {
    pub fn mean_delta(&self) -> f64 {
        self.new_rating.rating - self.old_rating.rating
    }
}

/// Post-session rating output: exactly one change per participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingUpdate {
    pub outcome: Outcome,
    pub changes: Vec<RatingChange>,
    /// Quality of the match as it was played (0.0 to 1.0)
    pub match_quality: f64,
}

/// A roster member as announced to players
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub player_id: PlayerId,
    pub display_name: String,
    pub side: TeamSide,
    pub role: Role,
    pub is_captain: bool,
}

/// Event payload produced when a session's teams are formed or reshuffled
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamsAnnounced {
    pub session_id: SessionId,
    pub reshuffle_count: u32,
    pub team_a: Vec<RosterEntry>,
    pub team_b: Vec<RosterEntry>,
    pub score: f64,
    pub timestamp: DateTime<Utc>,
}
