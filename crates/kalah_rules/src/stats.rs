//! Per-player move counters and score mirror.

use crate::types::PlayerId;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Running statistics for one player.
///
/// `score` mirrors the player's store pit and is refreshed after each move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct PlayerStats {
    id: PlayerId,
    name: String,
    moves: u32,
    score: u32,
}

impl PlayerStats {
    /// Creates stats for a player who has not moved yet.
    #[instrument]
    pub fn new(id: PlayerId, name: String) -> Self {
        Self {
            id,
            name,
            moves: 0,
            score: 0,
        }
    }

    /// Rebuilds stats from stored values.
    pub fn restore(id: PlayerId, name: String, moves: u32, score: u32) -> Self {
        Self {
            id,
            name,
            moves,
            score,
        }
    }

    /// Counts one accepted move.
    #[instrument(skip(self), fields(player_id = %self.id))]
    pub fn record_move(&mut self) {
        self.moves += 1;
    }

    /// Overwrites the score with `store`, returning whether it changed.
    #[instrument(skip(self), fields(player_id = %self.id))]
    pub fn sync_score(&mut self, store: u32) -> bool {
        if self.score == store {
            return false;
        }
        self.score = store;
        true
    }
}
