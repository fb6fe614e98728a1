//! Tests for the SQLite-backed store.

use diesel::{Connection, RunQueryDsl, SqliteConnection};
use kalah_rules::{Board, Match, MatchState, PlayerStats, Side};
use kalah_server::{Commit, MatchStore, SqliteStore};
use tempfile::NamedTempFile;

/// Creates a temporary database file and a store over it. The file handle
/// must stay in scope to keep the file alive.
fn setup_test_db() -> (NamedTempFile, SqliteStore) {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();
    let store = SqliteStore::open(&db_path).expect("Failed to open store");
    (db_file, store)
}

fn started() -> Match {
    Match::with_players(
        "match-1".to_string(),
        "board-1".to_string(),
        "alice".to_string(),
        "bob".to_string(),
    )
}

#[test]
fn test_missing_rows_load_as_none() {
    let (_db, store) = setup_test_db();
    assert!(store.load_match("nope").expect("Query failed").is_none());
    assert!(store.load_board("nope").expect("Query failed").is_none());
    assert!(store.load_player("nope").expect("Query failed").is_none());
}

#[test]
fn test_match_round_trips_without_board() {
    let (_db, store) = setup_test_db();
    let mut game = started();
    game.make_move("alice", 1).expect("legal move");
    store.save_match(&game).expect("Save failed");

    let loaded = store
        .load_match("match-1")
        .expect("Query failed")
        .expect("Match missing");
    assert_eq!(loaded.id(), game.id());
    assert_eq!(loaded.board_id(), game.board_id());
    assert_eq!(loaded.player_a(), game.player_a());
    assert_eq!(loaded.player_b(), game.player_b());
    assert_eq!(*loaded.state(), MatchState::InProgress);
    assert_eq!(*loaded.turn(), Side::B);
    assert_eq!(loaded.leader_id().as_deref(), Some("alice"));
    assert!(loaded.board().is_none());
}

#[test]
fn test_save_replaces_existing_rows() {
    let (_db, store) = setup_test_db();
    let mut board = Board::setup();
    store
        .save_board(&"board-1".to_string(), &board)
        .expect("Save failed");
    board.make_move(Side::A, 0).expect("legal move");
    store
        .save_board(&"board-1".to_string(), &board)
        .expect("Save failed");

    let loaded = store
        .load_board("board-1")
        .expect("Query failed")
        .expect("Board missing");
    assert_eq!(loaded, board);

    let mut stats = PlayerStats::new("alice".to_string(), "Alice".to_string());
    store.save_player(&stats).expect("Save failed");
    stats.record_move();
    stats.sync_score(1);
    store.save_player(&stats).expect("Save failed");
    let loaded = store
        .load_player("alice")
        .expect("Query failed")
        .expect("Player missing");
    assert_eq!(*loaded.moves(), 1);
    assert_eq!(*loaded.score(), 1);
    assert_eq!(loaded.name(), "Alice");
}

#[test]
fn test_commit_writes_all_rows() {
    let (_db, store) = setup_test_db();
    let game = started();
    let alice = PlayerStats::new("alice".to_string(), "Alice".to_string());
    let bob = PlayerStats::new("bob".to_string(), "Bob".to_string());

    store
        .commit(&Commit {
            game: &game,
            board: game.board().as_ref(),
            players: &[&alice, &bob],
        })
        .expect("Commit failed");

    assert!(store.load_match("match-1").expect("Query failed").is_some());
    assert_eq!(
        store.load_board("board-1").expect("Query failed"),
        Some(Board::setup())
    );
    assert_eq!(store.load_player("bob").expect("Query failed"), Some(bob));
}

#[test]
fn test_corrupt_pits_are_reported() {
    let (db, store) = setup_test_db();
    store
        .save_board(&"board-1".to_string(), &Board::setup())
        .expect("Save failed");

    let path = db.path().to_str().expect("Invalid path");
    let mut conn = SqliteConnection::establish(path).expect("Failed to connect");
    diesel::sql_query("UPDATE boards SET player_a_pits = '[6,6,6]' WHERE id = 'board-1'")
        .execute(&mut conn)
        .expect("Update failed");

    let err = store.load_board("board-1").expect_err("Short row accepted");
    assert!(err.message.contains("Corrupt board 'board-1'"), "{}", err);
}

#[test]
fn test_memory_database_keeps_data() {
    let store = SqliteStore::open(":memory:").expect("Failed to open store");
    let game = started();
    store.save_match(&game).expect("Save failed");
    assert!(store.load_match("match-1").expect("Query failed").is_some());
}

#[test]
fn test_migrate_is_idempotent() {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let path = db_file.path().to_str().expect("Invalid path");
    assert!(SqliteStore::migrate(path).expect("Migration failed") > 0);
    assert_eq!(SqliteStore::migrate(path).expect("Migration failed"), 0);
}
