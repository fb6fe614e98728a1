//! Match service flows over both stores.

use kalah_rules::{MatchState, STORE, Side, TOTAL_STONES};
use kalah_server::{
    MatchService, MatchStore, MemoryStore, PlayerDescriptor, ServiceError, SqliteStore,
};
use std::sync::{Arc, Barrier};
use std::thread;

fn memory_service() -> MatchService {
    MatchService::new(Arc::new(MemoryStore::new()))
}

fn sqlite_service() -> MatchService {
    MatchService::new(Arc::new(
        SqliteStore::open(":memory:").expect("Failed to open store"),
    ))
}

fn start(service: &MatchService) -> (String, String, String) {
    let view = service
        .start(PlayerDescriptor::named("Alice"), PlayerDescriptor::named("Bob"))
        .expect("start");
    let game = view.game();
    (
        game.id().clone(),
        game.player_a().clone().expect("seat A"),
        game.player_b().clone().expect("seat B"),
    )
}

#[test]
fn start_creates_a_live_match() {
    let service = memory_service();
    let view = service
        .start(PlayerDescriptor::named("Alice"), PlayerDescriptor::named("Bob"))
        .expect("start");

    assert_eq!(*view.game().state(), MatchState::InProgress);
    assert_eq!(*view.game().turn(), Side::A);
    let board = view.board().as_ref().expect("board");
    assert_eq!(board.total_stones(), TOTAL_STONES);
    assert_eq!(*view.player_a_score(), 0);
    assert_eq!(
        view.player_a_stats().as_ref().map(|s| s.name().as_str()),
        Some("Alice")
    );
}

#[test]
fn join_opens_then_fills_a_match() {
    let service = memory_service();
    let opened = service
        .join(None, PlayerDescriptor::named("Alice"))
        .expect("open");
    assert_eq!(*opened.game().state(), MatchState::Waiting);
    assert!(opened.board().is_none());
    let match_id = opened.game().id().clone();

    let waiting = service.view(&match_id).expect("view waiting");
    assert_eq!(*waiting.game().state(), MatchState::Waiting);
    assert!(waiting.player_b_stats().is_none());

    let joined = service
        .join(Some(&match_id), PlayerDescriptor::named("Bob"))
        .expect("join");
    assert_eq!(*joined.game().state(), MatchState::InProgress);
    assert!(joined.board().is_some());

    let err = service
        .join(Some(&match_id), PlayerDescriptor::named("Carol"))
        .expect_err("third player");
    assert_eq!(err.kind(), "MatchFull");
}

#[test]
fn returning_player_keeps_stats() {
    let service = memory_service();
    let (match_id, alice, _) = start(&service);
    service.make_move(&match_id, &alice, 0).expect("move");

    let view = service
        .join(None, PlayerDescriptor::existing(alice.clone()))
        .expect("open second match");
    let stats = view.player_a_stats().as_ref().expect("stats");
    assert_eq!(stats.id(), &alice);
    assert_eq!(*stats.moves(), 1);
}

#[test]
fn join_unknown_match_creates_nothing() {
    let store = MemoryStore::new();
    let service = MatchService::new(Arc::new(store.clone()));
    let err = service
        .join(Some("ghost"), PlayerDescriptor::named("Alice"))
        .expect_err("unknown id");
    assert!(matches!(err, ServiceError::MatchNotFound(ref id) if id == "ghost"));
    assert_eq!(store.match_count(), 0);
}

#[test]
fn moves_update_board_turn_and_stats() {
    for service in [memory_service(), sqlite_service()] {
        let (match_id, alice, bob) = start(&service);

        let view = service.make_move(&match_id, &alice, 0).expect("A0");
        assert_eq!(*view.game().turn(), Side::A);
        assert_eq!(*view.player_a_score(), 1);

        let view = service.make_move(&match_id, &alice, 1).expect("A1");
        assert_eq!(*view.game().turn(), Side::B);
        assert_eq!(*view.player_a_score(), 9);
        let stats_a = view.player_a_stats().as_ref().expect("stats");
        assert_eq!(*stats_a.moves(), 2);
        assert_eq!(*stats_a.score(), 9);

        let err = service
            .make_move(&match_id, &alice, 2)
            .expect_err("B's turn");
        assert_eq!(err.kind(), "NotYourTurn");

        let err = service
            .make_move(&match_id, &bob, 4)
            .expect_err("captured pit is empty");
        assert_eq!(err.kind(), "InvalidMove");

        let err = service
            .make_move(&match_id, "mallory", 0)
            .expect_err("stranger");
        assert_eq!(err.kind(), "NotAParticipant");

        let view = service.view(&match_id).expect("view");
        let board = view.board().as_ref().expect("board");
        assert_eq!(board.pits(Side::A), &[1, 0, 8, 8, 8, 8, 9]);
        assert_eq!(board.pits(Side::B), &[6, 6, 6, 6, 0, 6, 0]);
        assert_eq!(
            view.player_b_stats().as_ref().map(|s| *s.moves()),
            Some(0)
        );
    }
}

#[test]
fn game_played_to_the_end_over_sqlite() {
    let service = sqlite_service();
    let (match_id, alice, bob) = start(&service);

    let mut guard = 0;
    loop {
        guard += 1;
        assert!(guard < 2000, "game did not terminate");

        let view = service.view(&match_id).expect("view");
        if *view.game().state() != MatchState::InProgress {
            break;
        }
        let side = *view.game().turn();
        let board = view.board().as_ref().expect("board");
        let pit = (0..STORE)
            .find(|&pit| board.pits(side)[pit] > 0)
            .expect("live side has stones");
        let player = if side == Side::A { &alice } else { &bob };
        service.make_move(&match_id, player, pit).expect("legal move");
    }

    let view = service.view(&match_id).expect("view");
    assert_eq!(*view.game().state(), MatchState::Completed);
    assert_eq!(view.player_a_score() + view.player_b_score(), TOTAL_STONES);

    let err = service.abort(&match_id).expect_err("completed");
    assert_eq!(err.kind(), "IllegalStateTransition");
    let err = service
        .make_move(&match_id, &alice, 0)
        .expect_err("completed");
    assert_eq!(err.kind(), "IllegalStateTransition");
}

#[test]
fn abort_is_final() {
    let service = memory_service();
    let (match_id, alice, _) = start(&service);

    let view = service.abort(&match_id).expect("abort");
    assert_eq!(*view.game().state(), MatchState::Aborted);

    let err = service.abort(&match_id).expect_err("already aborted");
    assert_eq!(err.kind(), "IllegalStateTransition");
    let err = service
        .make_move(&match_id, &alice, 0)
        .expect_err("aborted");
    assert_eq!(err.kind(), "IllegalStateTransition");
    assert!(matches!(
        service.abort("ghost"),
        Err(ServiceError::MatchNotFound(_))
    ));
}

#[test]
fn missing_board_is_reported() {
    let store = MemoryStore::new();
    let service = MatchService::new(Arc::new(store.clone()));
    let (match_id, alice, _) = start(&service);

    // Same match row pointing at a board that was never stored.
    let game = store.load_match(&match_id).expect("load").expect("present");
    let orphan = kalah_rules::Match::restore(
        game.id().clone(),
        "missing-board".to_string(),
        game.player_a().clone(),
        game.player_b().clone(),
        *game.state(),
        *game.turn(),
        None,
    );
    store.save_match(&orphan).expect("save");

    let err = service
        .make_move(&match_id, &alice, 0)
        .expect_err("no board");
    assert!(matches!(err, ServiceError::BoardNotFound(ref id) if id == "missing-board"));
}

#[test]
fn concurrent_moves_accept_exactly_one() {
    const ATTEMPTS: usize = 8;

    for service in [memory_service(), sqlite_service()] {
        let (match_id, alice, _) = start(&service);
        let barrier = Arc::new(Barrier::new(ATTEMPTS));

        // Pit 1 passes the turn, so only the first attempt can be legal.
        let handles: Vec<_> = (0..ATTEMPTS)
            .map(|_| {
                let service = service.clone();
                let barrier = Arc::clone(&barrier);
                let match_id = match_id.clone();
                let alice = alice.clone();
                thread::spawn(move || {
                    barrier.wait();
                    service.make_move(&match_id, &alice, 1)
                })
            })
            .collect();

        let results: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().expect("thread"))
            .collect();
        let accepted = results.iter().filter(|result| result.is_ok()).count();
        assert_eq!(accepted, 1);
        for result in results.iter().filter_map(|result| result.as_ref().err()) {
            assert_eq!(result.kind(), "NotYourTurn");
        }

        let view = service.view(&match_id).expect("view");
        let board = view.board().as_ref().expect("board");
        assert_eq!(board.total_stones(), TOTAL_STONES);
        assert_eq!(board.pits(Side::A), &[7, 0, 7, 7, 7, 7, 1]);
        assert_eq!(
            view.player_a_stats().as_ref().map(|s| *s.moves()),
            Some(1)
        );
        assert!(service.locks().is_empty());
    }
}
