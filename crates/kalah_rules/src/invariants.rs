//! First-class invariants for matches and boards.
//!
//! Invariants are logical properties that must hold between operations.
//! They are testable independently and are checked in debug builds after
//! every accepted move.

use crate::board::{Board, STORE, TOTAL_STONES};
use crate::game::Match;
use crate::types::{MatchState, Side};

/// A logical property that must hold for a given state.
pub trait Invariant<S> {
    /// Checks if the invariant holds for the given state.
    fn holds(state: &S) -> bool;

    /// Human-readable description of the invariant.
    fn description() -> &'static str;
}

/// Violation of an invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub description: String,
}

impl InvariantViolation {
    /// Creates a new invariant violation.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// A set of invariants that can be checked together.
pub trait InvariantSet<S> {
    /// Checks all invariants in the set, collecting every violation.
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>>;
}

fn collect<S, I: Invariant<S>>(state: &S, violations: &mut Vec<InvariantViolation>) {
    if !I::holds(state) {
        violations.push(InvariantViolation::new(I::description()));
    }
}

impl<S, I1, I2> InvariantSet<S> for (I1, I2)
where
    I1: Invariant<S>,
    I2: Invariant<S>,
{
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
        let mut violations = Vec::new();
        collect::<S, I1>(state, &mut violations);
        collect::<S, I2>(state, &mut violations);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

impl<S, I1, I2, I3> InvariantSet<S> for (I1, I2, I3)
where
    I1: Invariant<S>,
    I2: Invariant<S>,
    I3: Invariant<S>,
{
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
        let mut violations = Vec::new();
        collect::<S, I1>(state, &mut violations);
        collect::<S, I2>(state, &mut violations);
        collect::<S, I3>(state, &mut violations);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

/// The board of a match always holds exactly the stones it was set up with.
pub struct StoneConservation;

impl Invariant<Board> for StoneConservation {
    fn holds(board: &Board) -> bool {
        board.total_stones() == TOTAL_STONES
    }

    fn description() -> &'static str {
        "Board holds all 72 stones"
    }
}

impl Invariant<Match> for StoneConservation {
    fn holds(game: &Match) -> bool {
        game.board()
            .as_ref()
            .is_none_or(<StoneConservation as Invariant<Board>>::holds)
    }

    fn description() -> &'static str {
        <StoneConservation as Invariant<Board>>::description()
    }
}

/// WAITING means a seat is open; live or finished play means both are taken.
pub struct SeatsMatchState;

impl Invariant<Match> for SeatsMatchState {
    fn holds(game: &Match) -> bool {
        let seated = game.player_a().is_some() && game.player_b().is_some();
        match game.state() {
            MatchState::Waiting => !seated,
            MatchState::InProgress | MatchState::Completed => seated,
            MatchState::Aborted => true,
        }
    }

    fn description() -> &'static str {
        "Seats agree with match state"
    }
}

/// Active matches have a live board; completed matches have a swept one.
pub struct BoardMatchesState;

impl Invariant<Match> for BoardMatchesState {
    fn holds(game: &Match) -> bool {
        let board = game.board().as_ref();
        match game.state() {
            MatchState::Waiting => board.is_none(),
            MatchState::InProgress => board.is_some_and(|b| !b.is_exhausted()),
            MatchState::Completed => board.is_some_and(|b| {
                [Side::A, Side::B]
                    .into_iter()
                    .all(|side| b.pits(side)[..STORE].iter().all(|&stones| stones == 0))
            }),
            MatchState::Aborted => true,
        }
    }

    fn description() -> &'static str {
        "Board presence agrees with match state"
    }
}

/// Every invariant a match created by this crate upholds.
pub type MatchInvariants = (SeatsMatchState, BoardMatchesState, StoneConservation);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_match_upholds_everything() {
        let game = Match::with_players(
            "m".to_string(),
            "b".to_string(),
            "a".to_string(),
            "b".to_string(),
        );
        assert!(MatchInvariants::check_all(&game).is_ok());
    }

    #[test]
    fn lost_stones_are_reported() {
        let mut game = Match::restore(
            "m".to_string(),
            "b".to_string(),
            Some("a".to_string()),
            Some("b".to_string()),
            MatchState::InProgress,
            Side::A,
            None,
        );
        game.attach_board(Board::from_pits([1; 7], [1; 7]));
        let violations = MatchInvariants::check_all(&game).expect_err("only 14 stones");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].description, "Board holds all 72 stones");
    }

    #[test]
    fn in_progress_without_board_is_reported() {
        let game = Match::restore(
            "m".to_string(),
            "b".to_string(),
            Some("a".to_string()),
            Some("b".to_string()),
            MatchState::InProgress,
            Side::A,
            None,
        );
        let violations = MatchInvariants::check_all(&game).expect_err("no board");
        assert_eq!(
            violations,
            vec![InvariantViolation::new("Board presence agrees with match state")]
        );
    }
}
