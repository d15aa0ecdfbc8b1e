//! Utility functions for the team balancing engine

use crate::types::{Player, SessionId};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a new unique session ID
pub fn generate_session_id() -> SessionId {
    Uuid::new_v4()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Calculate the absolute difference between two ratings
pub fn rating_difference(rating1: f64, rating2: f64) -> f64 {
    (rating1 - rating2).abs()
}

/// Average rating mean of a group of players, 0.0 for an empty group
pub fn average_rating<'a>(players: impl IntoIterator<Item = &'a Player>) -> f64 {
    average(players.into_iter().map(|p| p.rating.rating))
}

/// Average rating uncertainty of a group of players, 0.0 for an empty group
pub fn average_uncertainty<'a>(players: impl IntoIterator<Item = &'a Player>) -> f64 {
    average(players.into_iter().map(|p| p.rating.uncertainty))
}

fn average(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
