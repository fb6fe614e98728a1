//! Row types and their conversions to domain values.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use kalah_rules::{Board, BoardId, Match, MatchState, Pits, PlayerStats, Side};
use tracing::instrument;

use crate::db::schema;
use crate::store::StoreError;

/// Stored player statistics.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::players)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PlayerRow {
    id: String,
    name: String,
    moves: i32,
    score: i32,
    updated_at: NaiveDateTime,
}

impl PlayerRow {
    #[instrument(skip(stats), fields(player_id = %stats.id()))]
    pub fn from_stats(stats: &PlayerStats, updated_at: NaiveDateTime) -> Result<Self, StoreError> {
        Ok(Self {
            id: stats.id().clone(),
            name: stats.name().clone(),
            moves: i32::try_from(*stats.moves())
                .map_err(|e| StoreError::corrupt("player", stats.id(), e))?,
            score: i32::try_from(*stats.score())
                .map_err(|e| StoreError::corrupt("player", stats.id(), e))?,
            updated_at,
        })
    }

    pub fn into_stats(self) -> Result<PlayerStats, StoreError> {
        let moves = u32::try_from(self.moves)
            .map_err(|e| StoreError::corrupt("player", &self.id, e))?;
        let score = u32::try_from(self.score)
            .map_err(|e| StoreError::corrupt("player", &self.id, e))?;
        Ok(PlayerStats::restore(self.id, self.name, moves, score))
    }
}

/// Stored board. Each row of pits is a JSON array of seven counts.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::boards)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BoardRow {
    id: String,
    player_a_pits: String,
    player_b_pits: String,
    updated_at: NaiveDateTime,
}

impl BoardRow {
    pub fn from_board(
        id: &BoardId,
        board: &Board,
        updated_at: NaiveDateTime,
    ) -> Result<Self, StoreError> {
        Ok(Self {
            id: id.clone(),
            player_a_pits: serde_json::to_string(board.pits(Side::A))?,
            player_b_pits: serde_json::to_string(board.pits(Side::B))?,
            updated_at,
        })
    }

    #[instrument(skip(self), fields(board_id = %self.id))]
    pub fn into_board(self) -> Result<Board, StoreError> {
        let row = |pits: &str| {
            serde_json::from_str::<Pits>(pits).map_err(|e| StoreError::corrupt("board", &self.id, e))
        };
        Ok(Board::from_pits(
            row(&self.player_a_pits)?,
            row(&self.player_b_pits)?,
        ))
    }
}

/// Stored match. The board lives in `boards` under `board_id`.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::matches)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MatchRow {
    id: String,
    board_id: String,
    player_a_id: Option<String>,
    player_b_id: Option<String>,
    state: String,
    turn: String,
    leader_id: Option<String>,
    updated_at: NaiveDateTime,
}

impl MatchRow {
    pub fn from_match(game: &Match, updated_at: NaiveDateTime) -> Self {
        Self {
            id: game.id().clone(),
            board_id: game.board_id().clone(),
            player_a_id: game.player_a().clone(),
            player_b_id: game.player_b().clone(),
            state: game.state().to_string(),
            turn: game.turn().to_string(),
            leader_id: game.leader_id().clone(),
            updated_at,
        }
    }

    #[instrument(skip(self), fields(match_id = %self.id))]
    pub fn into_match(self) -> Result<Match, StoreError> {
        let state = self
            .state
            .parse::<MatchState>()
            .map_err(|e| StoreError::corrupt("match", &self.id, e))?;
        let turn = self
            .turn
            .parse::<Side>()
            .map_err(|e| StoreError::corrupt("match", &self.id, e))?;
        Ok(Match::restore(
            self.id,
            self.board_id,
            self.player_a_id,
            self.player_b_id,
            state,
            turn,
            self.leader_id,
        ))
    }
}
