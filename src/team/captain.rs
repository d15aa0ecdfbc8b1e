//! Captain selection

use crate::types::{Player, PlayerId};
use rand::seq::SliceRandom;
use rand::Rng;

/// Choose a captain for a team
///
/// A previous captain who is still on the team keeps the role. Otherwise a
/// member is drawn uniformly from `rng`. Returns `None` only for an empty team.
pub fn select_captain<R: Rng + ?Sized>(
    team: &[Player],
    previous_captain: Option<&PlayerId>,
    rng: &mut R,
) -> Option<PlayerId> {
    if let Some(previous) = previous_captain {
        if team.iter().any(|p| &p.id == previous) {
            return Some(previous.clone());
        }
    }

    team.choose(rng).map(|p| p.id.clone())
}
