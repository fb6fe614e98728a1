//! [`MatchStore`] over a single SQLite connection.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use kalah_rules::{Board, BoardId, Match, PlayerStats};
use tracing::{debug, info, instrument};

use crate::db::models::{BoardRow, MatchRow, PlayerRow};
use crate::db::schema;
use crate::store::{Commit, MatchStore, StoreError};

/// Schema migrations compiled into the binary.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// SQLite-backed store.
///
/// Holds one connection for its whole life so that `":memory:"` databases
/// keep their contents. Clones share the connection.
#[derive(Clone)]
pub struct SqliteStore {
    path: String,
    conn: Arc<Mutex<SqliteConnection>>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Opens the database at `path` and applies pending migrations.
    ///
    /// Use `":memory:"` for a throwaway database.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the connection or a migration fails.
    #[instrument(skip(path), fields(path = %path))]
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let mut conn = SqliteConnection::establish(path)?;
        let applied = run_migrations(&mut conn)?;
        info!(path, applied, "Opened SQLite store");
        Ok(Self {
            path: path.to_string(),
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Applies pending migrations to the database at `path` and returns how
    /// many ran.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the connection or a migration fails.
    #[instrument(skip(path), fields(path = %path))]
    pub fn migrate(path: &str) -> Result<usize, StoreError> {
        let mut conn = SqliteConnection::establish(path)?;
        run_migrations(&mut conn)
    }

    /// Database path this store was opened with.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn connection(&self) -> MutexGuard<'_, SqliteConnection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn run_migrations(conn: &mut SqliteConnection) -> Result<usize, StoreError> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| StoreError::new(format!("Migration failed: {}", e)))?;
    for version in &applied {
        debug!(%version, "Applied migration");
    }
    Ok(applied.len())
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

fn write_player(conn: &mut SqliteConnection, stats: &PlayerStats) -> Result<(), StoreError> {
    let row = PlayerRow::from_stats(stats, now())?;
    diesel::replace_into(schema::players::table)
        .values(&row)
        .execute(conn)?;
    Ok(())
}

fn write_board(conn: &mut SqliteConnection, id: &BoardId, board: &Board) -> Result<(), StoreError> {
    let row = BoardRow::from_board(id, board, now())?;
    diesel::replace_into(schema::boards::table)
        .values(&row)
        .execute(conn)?;
    Ok(())
}

fn write_match(conn: &mut SqliteConnection, game: &Match) -> Result<(), StoreError> {
    let row = MatchRow::from_match(game, now());
    diesel::replace_into(schema::matches::table)
        .values(&row)
        .execute(conn)?;
    Ok(())
}

impl MatchStore for SqliteStore {
    #[instrument(skip(self))]
    fn load_match(&self, id: &str) -> Result<Option<Match>, StoreError> {
        let row = schema::matches::table
            .find(id)
            .select(MatchRow::as_select())
            .first(&mut *self.connection())
            .optional()?;
        debug!(found = row.is_some(), "Loaded match row");
        row.map(MatchRow::into_match).transpose()
    }

    #[instrument(skip(self, game), fields(match_id = %game.id(), state = %game.state()))]
    fn save_match(&self, game: &Match) -> Result<(), StoreError> {
        write_match(&mut self.connection(), game)
    }

    #[instrument(skip(self))]
    fn load_board(&self, id: &str) -> Result<Option<Board>, StoreError> {
        let row = schema::boards::table
            .find(id)
            .select(BoardRow::as_select())
            .first(&mut *self.connection())
            .optional()?;
        row.map(BoardRow::into_board).transpose()
    }

    #[instrument(skip(self, board))]
    fn save_board(&self, id: &BoardId, board: &Board) -> Result<(), StoreError> {
        write_board(&mut self.connection(), id, board)
    }

    #[instrument(skip(self))]
    fn load_player(&self, id: &str) -> Result<Option<PlayerStats>, StoreError> {
        let row = schema::players::table
            .find(id)
            .select(PlayerRow::as_select())
            .first(&mut *self.connection())
            .optional()?;
        row.map(PlayerRow::into_stats).transpose()
    }

    #[instrument(skip(self, stats), fields(player_id = %stats.id()))]
    fn save_player(&self, stats: &PlayerStats) -> Result<(), StoreError> {
        write_player(&mut self.connection(), stats)
    }

    #[instrument(skip(self, commit), fields(match_id = %commit.game.id()))]
    fn commit(&self, commit: &Commit<'_>) -> Result<(), StoreError> {
        self.connection().transaction::<_, StoreError, _>(|conn| {
            for stats in commit.players {
                write_player(conn, stats)?;
            }
            if let Some(board) = commit.board {
                write_board(conn, commit.game.board_id(), board)?;
            }
            write_match(conn, commit.game)
        })?;
        debug!(players = commit.players.len(), "Committed transaction");
        Ok(())
    }
}
