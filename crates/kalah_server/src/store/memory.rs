//! In-process store backed by hash maps.

use super::{Commit, MatchStore, StoreError};
use kalah_rules::{Board, BoardId, Match, MatchId, PlayerId, PlayerStats};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument};

#[derive(Debug, Default)]
struct Tables {
    matches: HashMap<MatchId, Match>,
    boards: HashMap<BoardId, Board>,
    players: HashMap<PlayerId, PlayerStats>,
}

/// Store that keeps cloned entities in memory.
///
/// Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[instrument]
    pub fn new() -> Self {
        info!("Creating in-memory store");
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of stored matches.
    pub fn match_count(&self) -> usize {
        self.tables().matches.len()
    }
}

impl MatchStore for MemoryStore {
    #[instrument(skip(self))]
    fn load_match(&self, id: &str) -> Result<Option<Match>, StoreError> {
        let found = self.tables().matches.get(id).cloned();
        debug!(found = found.is_some(), "Loaded match");
        Ok(found)
    }

    #[instrument(skip(self, game), fields(match_id = %game.id()))]
    fn save_match(&self, game: &Match) -> Result<(), StoreError> {
        let mut row = game.clone();
        // Boards live in their own table.
        row.detach_board();
        self.tables().matches.insert(game.id().clone(), row);
        Ok(())
    }

    #[instrument(skip(self))]
    fn load_board(&self, id: &str) -> Result<Option<Board>, StoreError> {
        Ok(self.tables().boards.get(id).cloned())
    }

    #[instrument(skip(self, board))]
    fn save_board(&self, id: &BoardId, board: &Board) -> Result<(), StoreError> {
        self.tables().boards.insert(id.clone(), board.clone());
        Ok(())
    }

    #[instrument(skip(self))]
    fn load_player(&self, id: &str) -> Result<Option<PlayerStats>, StoreError> {
        Ok(self.tables().players.get(id).cloned())
    }

    #[instrument(skip(self, stats), fields(player_id = %stats.id()))]
    fn save_player(&self, stats: &PlayerStats) -> Result<(), StoreError> {
        self.tables().players.insert(stats.id().clone(), stats.clone());
        Ok(())
    }

    #[instrument(skip(self, commit), fields(match_id = %commit.game.id()))]
    fn commit(&self, commit: &Commit<'_>) -> Result<(), StoreError> {
        let mut tables = self.tables();
        for stats in commit.players {
            tables.players.insert(stats.id().clone(), (*stats).clone());
        }
        if let Some(board) = commit.board {
            tables
                .boards
                .insert(commit.game.board_id().clone(), board.clone());
        }
        let mut row = commit.game.clone();
        row.detach_board();
        tables.matches.insert(row.id().clone(), row);
        debug!("Committed under one lock");
        Ok(())
    }
}
