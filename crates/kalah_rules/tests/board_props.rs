use kalah_rules::{
    Board, InvariantSet, Match, MatchInvariants, MatchState, MoveOutcome, STORE, Side,
    TOTAL_STONES,
};
use proptest::prelude::*;

/// First non-empty small pit at or after `hint`, wrapping.
fn playable_pit(board: &Board, side: Side, hint: usize) -> Option<usize> {
    (0..STORE)
        .map(|offset| (hint + offset) % STORE)
        .find(|&pit| board.pits(side)[pit] > 0)
}

fn started() -> Match {
    Match::with_players(
        "m".to_string(),
        "b".to_string(),
        "alice".to_string(),
        "bob".to_string(),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn legal_play_conserves_stones(hints in prop::collection::vec(0..STORE, 1..200)) {
        let mut game = started();

        for hint in hints {
            if *game.state() != MatchState::InProgress {
                break;
            }
            let side = *game.turn();
            let board = game.board().as_ref().expect("board attached");
            let Some(pit) = playable_pit(board, side, hint) else {
                break;
            };
            let player = game.player(side).expect("seated").clone();

            let report = game.make_move(&player, pit).expect("legal move");
            prop_assert_eq!(report.mover, side);
            match report.outcome {
                MoveOutcome::ExtraTurn => prop_assert_eq!(*game.turn(), side),
                MoveOutcome::TurnPasses => prop_assert_eq!(*game.turn(), side.opponent()),
            }

            let board = game.board().as_ref().expect("board attached");
            prop_assert_eq!(board.total_stones(), TOTAL_STONES);
            prop_assert!(MatchInvariants::check_all(&game).is_ok());
        }
    }

    #[test]
    fn sweep_is_idempotent(
        a in prop::array::uniform6(0u32..12),
        b in prop::array::uniform6(0u32..12),
        stores in (0u32..40, 0u32..40),
        empty_a in any::<bool>(),
    ) {
        let mut row_a = [a[0], a[1], a[2], a[3], a[4], a[5], stores.0];
        let row_b = [b[0], b[1], b[2], b[3], b[4], b[5], stores.1];
        if empty_a {
            row_a[..STORE].fill(0);
        }
        let mut board = Board::from_pits(row_a, row_b);
        let total = board.total_stones();

        let first = board.is_completed();
        let once = board.clone();
        let second = board.is_completed();

        prop_assert_eq!(first, second);
        prop_assert_eq!(&board, &once);
        prop_assert_eq!(board.total_stones(), total);
        if first {
            for side in [Side::A, Side::B] {
                prop_assert!(board.pits(side)[..STORE].iter().all(|&s| s == 0));
            }
        }
    }

    #[test]
    fn sowing_exactly_to_store_grants_extra_turn(pit in 0..STORE) {
        let mut row = [0u32; 7];
        row[pit] = (STORE - pit) as u32;
        let mut board = Board::from_pits(row, [1, 1, 1, 1, 1, 1, 0]);
        prop_assert_eq!(board.make_move(Side::A, pit), Ok(MoveOutcome::ExtraTurn));
        prop_assert_eq!(board.store(Side::A), 1);
    }
}
