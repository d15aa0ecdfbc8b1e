//! Role slot requirements and single-team role assignment
//!
//! Assignment is a pure fold over the players sorted by descending rating
//! mean: specialists claim their preferred slot first, then flexible players
//! fill whichever open role has the fewest members so far.

use crate::error::{EngineResult, MatchmakingError};
use crate::types::{Player, PlayerId, Role, RosterEntry, TeamSide};
use enum_map::EnumMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Number of slots per role on one team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRequirement {
    pub offense: usize,
    pub chase: usize,
    pub home: usize,
}

impl RoleRequirement {
    pub fn new(offense: usize, chase: usize, home: usize) -> Self {
        Self {
            offense,
            chase,
            home,
        }
    }

    /// Slots required for a role
    pub fn count(&self, role: Role) -> usize {
        match role {
            Role::Offense => self.offense,
            Role::Chase => self.chase,
            Role::Home => self.home,
        }
    }

    /// Players per team
    pub fn team_size(&self) -> usize {
        self.offense + self.chase + self.home
    }

    /// Players needed to form both teams
    pub fn pool_size(&self) -> usize {
        self.team_size() * 2
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.team_size() == 0 {
            return Err(MatchmakingError::ConfigurationError {
                message: "Role requirement must contain at least one slot".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for RoleRequirement {
    fn default() -> Self {
        Self::new(2, 2, 1)
    }
}

/// What to do with specialists whose preferred role is already full
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RolePolicy {
    /// Never place a specialist outside their preferred role
    #[default]
    Strict,
    /// Place overflow specialists into the least-filled open role
    AllowOffRole,
}

/// A player together with the slot they were assigned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlottedPlayer {
    pub player: Player,
    pub role: Role,
}

impl SlottedPlayer {
    /// Whether the assignment contradicts a stated, non-flexible preference
    pub fn is_off_role(&self) -> bool {
        self.player
            .preferred_role
            .role()
            .is_some_and(|preferred| preferred != self.role)
    }
}

/// One complete team, ordered by role (offense, chase, home)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignedTeam {
    members: Vec<SlottedPlayer>,
}

impl AssignedTeam {
    pub fn members(&self) -> &[SlottedPlayer] {
        &self.members
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> + '_ {
        self.members.iter().map(|m| &m.player)
    }

    pub fn player_ids(&self) -> impl Iterator<Item = &PlayerId> + '_ {
        self.members.iter().map(|m| &m.player.id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, player_id: &str) -> bool {
        self.members.iter().any(|m| m.player.id == player_id)
    }

    /// Role assigned to each member
    pub fn slots(&self) -> BTreeMap<PlayerId, Role> {
        self.members
            .iter()
            .map(|m| (m.player.id.clone(), m.role))
            .collect()
    }

    /// Number of members placed outside their stated preference
    pub fn off_role_count(&self) -> usize {
        self.members.iter().filter(|m| m.is_off_role()).count()
    }

    /// Announced roster for this team with `captain` flagged
    pub fn roster(&self, side: TeamSide, captain: &str) -> Vec<RosterEntry> {
        self.members
            .iter()
            .map(|m| RosterEntry {
                player_id: m.player.id.clone(),
                display_name: m.player.display_name.clone(),
                side,
                role: m.role,
                is_captain: m.player.id == captain,
            })
            .collect()
    }
}

/// Descending rating mean, ties broken by ascending identity
pub(crate) fn skill_order(a: &Player, b: &Player) -> Ordering {
    b.rating
        .rating
        .total_cmp(&a.rating.rating)
        .then_with(|| a.id.cmp(&b.id))
}

/// Open role with the fewest members, ties in role enumeration order
fn least_filled_open_role(
    filled: &EnumMap<Role, Vec<Player>>,
    req: &RoleRequirement,
) -> Option<Role> {
    Role::ALL
        .into_iter()
        .filter(|&role| filled[role].len() < req.count(role))
        .min_by_key(|&role| filled[role].len())
}

/// Assign a candidate team's players to role slots
///
/// Returns `RoleAssignmentFailed` if the players cannot fill every slot under
/// the given policy. Players left over once every slot is filled are ignored;
/// callers pass exactly `req.team_size()` players.
pub fn assign(
    pool: &[Player],
    req: &RoleRequirement,
    policy: RolePolicy,
) -> EngineResult<AssignedTeam> {
    let mut ordered: Vec<&Player> = pool.iter().collect();
    ordered.sort_by(|a, b| skill_order(a, b));

    let mut filled: EnumMap<Role, Vec<Player>> = EnumMap::default();
    let mut flexible = Vec::new();
    let mut overflow = Vec::new();

    for player in ordered {
        match player.preferred_role.role() {
            Some(role) if filled[role].len() < req.count(role) => {
                filled[role].push(player.clone());
            }
            Some(_) => overflow.push(player),
            None => flexible.push(player),
        }
    }

    let leftovers = match policy {
        RolePolicy::Strict => flexible,
        RolePolicy::AllowOffRole => flexible.into_iter().chain(overflow).collect(),
    };

    for player in leftovers {
        match least_filled_open_role(&filled, req) {
            Some(role) => filled[role].push(player.clone()),
            None => break,
        }
    }

    let members: Vec<SlottedPlayer> = Role::ALL
        .into_iter()
        .flat_map(|role| {
            std::mem::take(&mut filled[role])
                .into_iter()
                .map(move |player| SlottedPlayer { player, role })
        })
        .collect();

    if members.len() < req.team_size() {
        return Err(MatchmakingError::RoleAssignmentFailed {
            filled: members.len(),
            required: req.team_size(),
        });
    }

    Ok(AssignedTeam { members })
}
