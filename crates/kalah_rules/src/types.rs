//! Core domain types shared by the board and the match state machine.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a match.
pub type MatchId = String;

/// Unique identifier for a persisted board.
pub type BoardId = String;

/// Unique identifier for a player.
pub type PlayerId = String;

/// One of the two seats at the board.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum Side {
    /// First seat (moves first).
    A,
    /// Second seat.
    B,
}

impl Side {
    /// Returns the other seat.
    pub fn opponent(self) -> Self {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

/// Who is ahead on store count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Leader {
    /// Seat A has more stones in its store.
    A,
    /// Seat B has more stones in its store.
    B,
    /// Both stores hold the same count.
    Tie,
}

impl Leader {
    /// Returns the leading side, or `None` on a tie.
    pub fn side(self) -> Option<Side> {
        match self {
            Leader::A => Some(Side::A),
            Leader::B => Some(Side::B),
            Leader::Tie => None,
        }
    }
}

/// Lifecycle of a match.
///
/// `Completed` and `Aborted` are terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchState {
    /// Waiting for a second player.
    Waiting,
    /// Both seats filled, moves are accepted.
    InProgress,
    /// One side ran out of stones; the board has been swept.
    Completed,
    /// Cancelled before completion.
    Aborted,
}

impl MatchState {
    /// Returns true for states that accept no further changes.
    pub fn is_terminal(self) -> bool {
        matches!(self, MatchState::Completed | MatchState::Aborted)
    }
}
