//! Match state machine: seats, turn ownership, completion and leader.

use crate::board::{Board, MoveError, MoveOutcome};
use crate::invariants::{BoardMatchesState, InvariantSet, SeatsMatchState};
use crate::types::{BoardId, MatchId, MatchState, PlayerId, Side};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// Why a match operation was refused.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum MatchError {
    /// The board rejected the move.
    #[display("{}", _0)]
    InvalidMove(MoveError),

    /// The player is seated but the other side owns the turn.
    #[display("It is not player {}'s turn", _0)]
    NotYourTurn(PlayerId),

    /// The player holds neither seat.
    #[display("Player {} is not part of match {}", player, match_id)]
    NotAParticipant {
        /// Player who attempted the action.
        player: PlayerId,
        /// Match that was addressed.
        match_id: MatchId,
    },

    /// The action is not allowed in the current state.
    #[display("Cannot {} match {} while it is {}", action, match_id, state)]
    IllegalState {
        /// Match that was addressed.
        match_id: MatchId,
        /// What was attempted.
        action: &'static str,
        /// State at the time of the attempt.
        state: MatchState,
    },

    /// Both seats are already taken.
    #[display("Match {} already has two players", _0)]
    MatchFull(MatchId),

    /// The player already holds the other seat.
    #[display("Player {} is already seated in match {}", player, match_id)]
    AlreadySeated {
        /// Player who tried to join twice.
        player: PlayerId,
        /// Match that was addressed.
        match_id: MatchId,
    },

    /// An active match has no board attached.
    #[display("Match {} has no board attached", _0)]
    BoardMissing(MatchId),
}

impl std::error::Error for MatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MatchError::InvalidMove(err) => Some(err),
            _ => None,
        }
    }
}

/// What happened on an accepted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveReport {
    /// Side that moved.
    pub mover: Side,
    /// Whether the mover goes again.
    pub outcome: MoveOutcome,
    /// Whether this move ended the match.
    pub completed: bool,
}

/// A two-player match and the board it is played on.
///
/// The board is owned here while the match is in memory; it is persisted
/// separately under `board_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct Match {
    id: MatchId,
    board_id: BoardId,
    player_a: Option<PlayerId>,
    player_b: Option<PlayerId>,
    state: MatchState,
    turn: Side,
    leader_id: Option<PlayerId>,
    #[serde(skip)]
    board: Option<Board>,
}

impl Match {
    /// Creates an empty match waiting for players.
    #[instrument]
    pub fn new(id: MatchId, board_id: BoardId) -> Self {
        Self {
            id,
            board_id,
            player_a: None,
            player_b: None,
            state: MatchState::Waiting,
            turn: Side::A,
            leader_id: None,
            board: None,
        }
    }

    /// Creates a match with both seats filled and a fresh board.
    #[instrument]
    pub fn with_players(
        id: MatchId,
        board_id: BoardId,
        player_a: PlayerId,
        player_b: PlayerId,
    ) -> Self {
        info!(match_id = %id, "Starting two-player match");
        Self {
            id,
            board_id,
            player_a: Some(player_a),
            player_b: Some(player_b),
            state: MatchState::InProgress,
            turn: Side::A,
            leader_id: None,
            board: Some(Board::setup()),
        }
    }

    /// Rebuilds a match from stored fields. The board is attached separately.
    pub fn restore(
        id: MatchId,
        board_id: BoardId,
        player_a: Option<PlayerId>,
        player_b: Option<PlayerId>,
        state: MatchState,
        turn: Side,
        leader_id: Option<PlayerId>,
    ) -> Self {
        Self {
            id,
            board_id,
            player_a,
            player_b,
            state,
            turn,
            leader_id,
            board: None,
        }
    }

    /// Attaches a loaded board.
    pub fn attach_board(&mut self, board: Board) {
        self.board = Some(board);
    }

    /// Removes and returns the board, leaving the match row alone.
    pub fn detach_board(&mut self) -> Option<Board> {
        self.board.take()
    }

    /// Returns the player in `side`'s seat.
    pub fn player(&self, side: Side) -> Option<&PlayerId> {
        match side {
            Side::A => self.player_a.as_ref(),
            Side::B => self.player_b.as_ref(),
        }
    }

    /// Returns the seat held by `player_id`.
    pub fn seat_of(&self, player_id: &str) -> Option<Side> {
        [Side::A, Side::B]
            .into_iter()
            .find(|&side| self.player(side).map(String::as_str) == Some(player_id))
    }

    /// Seats a player: A first, then B.
    ///
    /// Seating B attaches a freshly set-up board and starts the match.
    ///
    /// # Errors
    ///
    /// [`MatchError::IllegalState`] on a finished match,
    /// [`MatchError::AlreadySeated`] if the player holds a seat, and
    /// [`MatchError::MatchFull`] if both seats are taken.
    #[instrument(skip(self), fields(match_id = %self.id))]
    pub fn join(&mut self, player_id: PlayerId) -> Result<Side, MatchError> {
        if self.state.is_terminal() {
            return Err(self.illegal("join"));
        }

        if self.seat_of(&player_id).is_some() {
            warn!(%player_id, "Player already seated");
            return Err(MatchError::AlreadySeated {
                player: player_id,
                match_id: self.id.clone(),
            });
        }

        if self.player_a.is_none() {
            info!(%player_id, "Seating player as A");
            self.player_a = Some(player_id);
            self.state = MatchState::Waiting;
            Ok(Side::A)
        } else if self.player_b.is_none() {
            info!(%player_id, "Seating player as B, match starts");
            self.player_b = Some(player_id);
            self.board = Some(Board::setup());
            self.state = MatchState::InProgress;
            Ok(Side::B)
        } else {
            warn!(%player_id, "Match already has two players");
            Err(MatchError::MatchFull(self.id.clone()))
        }
    }

    /// Plays `pit` for `player_id`.
    ///
    /// Flips the turn unless the last stone reached the mover's store, marks
    /// the match completed once a side runs out of stones, and refreshes the
    /// leader. Move counters and persistence are left to the caller, using
    /// the returned [`MoveReport`].
    ///
    /// # Errors
    ///
    /// [`MatchError::IllegalState`] unless in progress,
    /// [`MatchError::NotAParticipant`] / [`MatchError::NotYourTurn`] for the
    /// wrong caller, and [`MatchError::InvalidMove`] when the board refuses.
    /// The match is unchanged on error.
    #[instrument(skip(self), fields(match_id = %self.id))]
    pub fn make_move(&mut self, player_id: &str, pit: usize) -> Result<MoveReport, MatchError> {
        if self.state != MatchState::InProgress {
            return Err(self.illegal("move in"));
        }

        let mover = self.seat_of(player_id).ok_or_else(|| {
            warn!(player_id, "Unknown player attempted move");
            MatchError::NotAParticipant {
                player: player_id.to_string(),
                match_id: self.id.clone(),
            }
        })?;

        if mover != self.turn {
            warn!(player_id, ?mover, turn = ?self.turn, "Player tried to move out of turn");
            return Err(MatchError::NotYourTurn(player_id.to_string()));
        }

        let board = self
            .board
            .as_mut()
            .ok_or_else(|| MatchError::BoardMissing(self.id.clone()))?;
        let stones_before = board.total_stones();

        let outcome = board.make_move(mover, pit).map_err(|err| {
            warn!(player_id, pit, error = %err, "Invalid move");
            MatchError::InvalidMove(err)
        })?;
        let completed = board.is_completed();
        let leader = board.leader();
        debug_assert_eq!(board.total_stones(), stones_before, "stones were lost");

        if outcome.passes_turn() {
            self.turn = self.turn.opponent();
        }
        if completed {
            info!("Match completed");
            self.state = MatchState::Completed;
        }
        self.leader_id = leader.side().and_then(|side| self.player(side).cloned());

        debug_assert!(
            <(SeatsMatchState, BoardMatchesState)>::check_all(&*self).is_ok(),
            "match invariants violated after move"
        );
        debug!(?outcome, turn = ?self.turn, leader = ?self.leader_id, "Move applied");

        Ok(MoveReport {
            mover,
            outcome,
            completed,
        })
    }

    /// Cancels a match that has not finished.
    ///
    /// # Errors
    ///
    /// [`MatchError::IllegalState`] if already completed or aborted.
    #[instrument(skip(self), fields(match_id = %self.id))]
    pub fn abort(&mut self) -> Result<(), MatchError> {
        if self.state.is_terminal() {
            warn!(state = %self.state, "Refusing to abort finished match");
            return Err(self.illegal("abort"));
        }
        info!(from = %self.state, "Aborting match");
        self.state = MatchState::Aborted;
        Ok(())
    }

    fn illegal(&self, action: &'static str) -> MatchError {
        MatchError::IllegalState {
            match_id: self.id.clone(),
            action,
            state: self.state,
        }
    }
}
