//! Persistence gateway consumed by the match service.
//!
//! The service only depends on [`MatchStore`]; [`MemoryStore`] and
//! [`crate::SqliteStore`] are the two implementations.

mod error;
mod memory;

pub use error::StoreError;
pub use memory::MemoryStore;

use kalah_rules::{Board, BoardId, Match, PlayerStats};

/// Everything a single accepted operation writes back.
#[derive(Debug, Clone, Copy)]
pub struct Commit<'a> {
    /// The match row (its board is written from `board`, not from here).
    pub game: &'a Match,
    /// Board to store under the match's board id, if one is attached.
    pub board: Option<&'a Board>,
    /// Player stats touched by the operation.
    pub players: &'a [&'a PlayerStats],
}

/// Load/save of matches, boards and player stats by identifier.
///
/// Loads return `Ok(None)` when nothing is stored under the id; callers decide
/// whether that is an error. Implementations must give read-your-writes
/// consistency for a save followed by a load.
pub trait MatchStore: std::fmt::Debug + Send + Sync {
    /// Loads a match without its board.
    fn load_match(&self, id: &str) -> Result<Option<Match>, StoreError>;

    /// Inserts or replaces a match row.
    fn save_match(&self, game: &Match) -> Result<(), StoreError>;

    /// Loads a board.
    fn load_board(&self, id: &str) -> Result<Option<Board>, StoreError>;

    /// Inserts or replaces a board under `id`.
    fn save_board(&self, id: &BoardId, board: &Board) -> Result<(), StoreError>;

    /// Loads a player's stats.
    fn load_player(&self, id: &str) -> Result<Option<PlayerStats>, StoreError>;

    /// Inserts or replaces a player's stats.
    fn save_player(&self, stats: &PlayerStats) -> Result<(), StoreError>;

    /// Writes a whole operation's results.
    ///
    /// The default saves players, then the board, then the match. Stores that
    /// support transactions override this to make the write all-or-nothing.
    fn commit(&self, commit: &Commit<'_>) -> Result<(), StoreError> {
        for stats in commit.players {
            self.save_player(stats)?;
        }
        if let Some(board) = commit.board {
            self.save_board(commit.game.board_id(), board)?;
        }
        self.save_match(commit.game)
    }
}
