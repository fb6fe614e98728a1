//! Kalah rules - the game core behind the match server.
//!
//! This crate is pure and synchronous: no I/O, no clocks, no locks.
//!
//! # Architecture
//!
//! - **Board**: 14 cells (6 pits + store per side), sowing and capture
//! - **Match**: seats, turn ownership, completion and leader tracking
//! - **PlayerStats**: move counters and score mirror
//! - **Invariants**: properties checked after every move in debug builds
//!
//! # Example
//!
//! ```
//! use kalah_rules::{Match, MatchState, MoveOutcome, Side};
//!
//! let mut game = Match::new("match-1".to_string(), "board-1".to_string());
//! game.join("alice".to_string()).unwrap();
//! game.join("bob".to_string()).unwrap();
//! assert_eq!(*game.state(), MatchState::InProgress);
//!
//! let report = game.make_move("alice", 0).unwrap();
//! assert_eq!(report.outcome, MoveOutcome::ExtraTurn);
//! assert_eq!(*game.turn(), Side::A);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod board;
mod game;
mod invariants;
mod stats;
mod types;

pub use board::{
    Board, MoveError, MoveOutcome, PITS_PER_SIDE, Pits, STONES_PER_PIT, STORE, TOTAL_STONES,
};
pub use game::{Match, MatchError, MoveReport};
pub use invariants::{
    BoardMatchesState, Invariant, InvariantSet, InvariantViolation, MatchInvariants,
    SeatsMatchState, StoneConservation,
};
pub use stats::PlayerStats;
pub use types::{BoardId, Leader, MatchId, MatchState, PlayerId, Side};
