//! The 14-cell Kalah board and its sowing algorithm.

use crate::types::{Leader, Side};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Cells per side: six small pits plus the store.
pub const PITS_PER_SIDE: usize = 7;

/// Index of the store in each side's row.
pub const STORE: usize = 6;

/// Stones placed in every small pit at setup.
pub const STONES_PER_PIT: u32 = 6;

/// Total stones on a standard board.
pub const TOTAL_STONES: u32 = STONES_PER_PIT * 6 * 2;

/// One side's row of pits; index 6 is the store.
pub type Pits = [u32; PITS_PER_SIDE];

/// Result of an accepted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveOutcome {
    /// The last stone landed in the mover's store; the mover goes again.
    ExtraTurn,
    /// The turn passes to the opponent.
    TurnPasses,
}

impl MoveOutcome {
    /// Returns true if the turn changes hands.
    pub fn passes_turn(self) -> bool {
        matches!(self, MoveOutcome::TurnPasses)
    }
}

/// A move the rules do not allow.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum MoveError {
    /// The pit index is not one of the six small pits.
    #[display("Pit index {} is out of range (must be 0-5)", _0)]
    PitOutOfRange(usize),

    /// The chosen pit has no stones to sow.
    #[display("Player {} move at index {} is not allowed. No stones here", side, pit)]
    EmptyPit {
        /// Side that attempted the move.
        side: Side,
        /// Pit that was chosen.
        pit: usize,
    },
}

impl std::error::Error for MoveError {}

/// Pit counts for both players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    player_a_pits: Pits,
    player_b_pits: Pits,
}

impl Board {
    /// Creates a board with six stones in every small pit and empty stores.
    #[instrument]
    pub fn setup() -> Self {
        let row = [
            STONES_PER_PIT,
            STONES_PER_PIT,
            STONES_PER_PIT,
            STONES_PER_PIT,
            STONES_PER_PIT,
            STONES_PER_PIT,
            0,
        ];
        Self {
            player_a_pits: row,
            player_b_pits: row,
        }
    }

    /// Builds a board from explicit rows.
    pub fn from_pits(player_a_pits: Pits, player_b_pits: Pits) -> Self {
        Self {
            player_a_pits,
            player_b_pits,
        }
    }

    /// Returns the row belonging to `side`.
    pub fn pits(&self, side: Side) -> &Pits {
        match side {
            Side::A => &self.player_a_pits,
            Side::B => &self.player_b_pits,
        }
    }

    /// Returns the store count for `side`.
    pub fn store(&self, side: Side) -> u32 {
        self.pits(side)[STORE]
    }

    /// Sum of all 14 cells.
    pub fn total_stones(&self) -> u32 {
        self.player_a_pits.iter().chain(self.player_b_pits.iter()).sum()
    }

    /// Mover's row and opponent's row, mutably.
    fn rows_mut(&mut self, side: Side) -> (&mut Pits, &mut Pits) {
        match side {
            Side::A => (&mut self.player_a_pits, &mut self.player_b_pits),
            Side::B => (&mut self.player_b_pits, &mut self.player_a_pits),
        }
    }

    /// Sows the stones from `pit` for `side`.
    ///
    /// Stones only ever land in the mover's own row, wrapping from the store
    /// back to pit 0. Landing in the store grants an extra turn. Landing in a
    /// previously empty small pit captures that stone plus the opponent's
    /// mirrored pit (`5 - landing`) into the mover's store.
    ///
    /// # Errors
    ///
    /// Returns [`MoveError::PitOutOfRange`] for indices above 5 and
    /// [`MoveError::EmptyPit`] when the pit holds no stones. The board is
    /// unchanged on error.
    #[instrument(skip(self))]
    pub fn make_move(&mut self, side: Side, pit: usize) -> Result<MoveOutcome, MoveError> {
        if pit >= STORE {
            return Err(MoveError::PitOutOfRange(pit));
        }

        let (own, opponent) = self.rows_mut(side);
        let mut stones = own[pit];
        if stones == 0 {
            return Err(MoveError::EmptyPit { side, pit });
        }

        own[pit] = 0;
        let mut index = pit;
        while stones > 0 {
            index = (index + 1) % PITS_PER_SIDE;
            own[index] += 1;
            stones -= 1;
        }

        if index == STORE {
            debug!(%side, pit, "Last stone in store, extra turn");
            return Ok(MoveOutcome::ExtraTurn);
        }

        if own[index] == 1 {
            let mirror = STORE - 1 - index;
            let captured = opponent[mirror];
            opponent[mirror] = 0;
            own[index] = 0;
            own[STORE] += captured + 1;
            debug!(%side, landing = index, mirror, captured, "Capture");
        }

        Ok(MoveOutcome::TurnPasses)
    }

    /// True when either side has no stones left in its small pits.
    pub fn is_exhausted(&self) -> bool {
        Self::small_pits_empty(&self.player_a_pits) || Self::small_pits_empty(&self.player_b_pits)
    }

    fn small_pits_empty(row: &Pits) -> bool {
        row[..STORE].iter().all(|&stones| stones == 0)
    }

    /// Moves every small-pit stone into its owner's store.
    #[instrument(skip(self))]
    pub fn sweep(&mut self) {
        for row in [&mut self.player_a_pits, &mut self.player_b_pits] {
            let remaining: u32 = row[..STORE].iter().sum();
            row[..STORE].fill(0);
            row[STORE] += remaining;
        }
    }

    /// Checks for game end, sweeping the board when it is over.
    ///
    /// Calling this again on a swept board is a no-op that still returns true.
    #[instrument(skip(self))]
    pub fn is_completed(&mut self) -> bool {
        let completed = self.is_exhausted();
        if completed {
            self.sweep();
            debug!(
                store_a = self.store(Side::A),
                store_b = self.store(Side::B),
                "Board completed and swept"
            );
        }
        completed
    }

    /// Compares the two stores.
    pub fn leader(&self) -> Leader {
        use std::cmp::Ordering;

        match self.store(Side::A).cmp(&self.store(Side::B)) {
            Ordering::Greater => Leader::A,
            Ordering::Less => Leader::B,
            Ordering::Equal => Leader::Tie,
        }
    }

    /// `Some(true)` if A leads, `Some(false)` if B leads, `None` on a tie.
    pub fn is_player_a_leading(&self) -> Option<bool> {
        self.leader().side().map(|side| side == Side::A)
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::setup()
    }
}
