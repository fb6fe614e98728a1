//! Match service: the transactional layer between transport and store.

use crate::locks::MatchLocks;
use crate::store::{Commit, MatchStore, StoreError};
use derive_getters::Getters;
use kalah_rules::{
    Board, BoardId, Match, MatchError, MatchId, MatchState, PlayerId, PlayerStats, Side,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Why a service operation failed.
#[derive(Debug, Clone, derive_more::Display)]
pub enum ServiceError {
    /// The match refused the operation.
    #[display("{}", _0)]
    Rules(MatchError),

    /// No match is stored under the id.
    #[display("Match {} not found", _0)]
    MatchNotFound(MatchId),

    /// The match points at a board that is not stored.
    #[display("Board {} not found", _0)]
    BoardNotFound(BoardId),

    /// A seated or named player is not stored.
    #[display("Player {} not found", _0)]
    PlayerNotFound(PlayerId),

    /// A required input was absent.
    #[display("Missing {}", _0)]
    MissingInput(&'static str),

    /// The store failed.
    #[display("{}", _0)]
    Store(StoreError),
}

impl ServiceError {
    /// Stable name of the failure, for logs and clients.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Rules(MatchError::InvalidMove(_)) => "InvalidMove",
            ServiceError::Rules(MatchError::NotYourTurn(_)) => "NotYourTurn",
            ServiceError::Rules(MatchError::NotAParticipant { .. }) => "NotAParticipant",
            ServiceError::Rules(MatchError::IllegalState { .. }) => "IllegalStateTransition",
            ServiceError::Rules(MatchError::MatchFull(_)) => "MatchFull",
            ServiceError::Rules(MatchError::AlreadySeated { .. }) => "AlreadySeated",
            ServiceError::Rules(MatchError::BoardMissing(_)) => "BoardNotFound",
            ServiceError::MatchNotFound(_) => "MatchNotFound",
            ServiceError::BoardNotFound(_) => "BoardNotFound",
            ServiceError::PlayerNotFound(_) => "PlayerNotFound",
            ServiceError::MissingInput(_) => "MissingInput",
            ServiceError::Store(_) => "StoreFailure",
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Rules(err) => Some(err),
            ServiceError::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MatchError> for ServiceError {
    fn from(err: MatchError) -> Self {
        ServiceError::Rules(err)
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        ServiceError::Store(err)
    }
}

/// Who is taking a seat: a returning player by id, or a new one by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerDescriptor {
    /// Id of a stored player.
    #[serde(default)]
    pub id: Option<PlayerId>,
    /// Display name for a new player.
    #[serde(default)]
    pub name: Option<String>,
}

impl PlayerDescriptor {
    /// A new player with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }

    /// A stored player.
    pub fn existing(id: impl Into<PlayerId>) -> Self {
        Self {
            id: Some(id.into()),
            name: None,
        }
    }
}

/// Everything a client needs to render a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Getters)]
pub struct MatchView {
    #[serde(rename = "match")]
    game: Match,
    board: Option<Board>,
    player_a_stats: Option<PlayerStats>,
    player_b_stats: Option<PlayerStats>,
    player_a_score: u32,
    player_b_score: u32,
}

impl MatchView {
    fn new(game: Match, player_a: Option<PlayerStats>, player_b: Option<PlayerStats>) -> Self {
        let board = game.board().clone();
        let score = |side| board.as_ref().map_or(0, |b: &Board| b.store(side));
        Self {
            player_a_score: score(Side::A),
            player_b_score: score(Side::B),
            game,
            board,
            player_a_stats: player_a,
            player_b_stats: player_b,
        }
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Told about every committed change to a match.
///
/// Called while the match lock is still held, so views arrive in commit
/// order. Implementations must not block.
pub trait MatchObserver: std::fmt::Debug + Send + Sync {
    /// A join, abort or move on `view`'s match was committed.
    fn match_changed(&self, view: &MatchView);
}

/// Runs match operations against a store, one mutation per match at a time.
#[derive(Debug, Clone)]
pub struct MatchService {
    store: Arc<dyn MatchStore>,
    locks: MatchLocks,
    observer: Option<Arc<dyn MatchObserver>>,
}

impl MatchService {
    /// Creates a service over `store`.
    pub fn new(store: Arc<dyn MatchStore>) -> Self {
        Self {
            store,
            locks: MatchLocks::new(),
            observer: None,
        }
    }

    /// Reports committed changes to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn MatchObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    fn notify(&self, view: &MatchView) {
        if let Some(observer) = &self.observer {
            observer.match_changed(view);
        }
    }

    /// Live per-match lock entries.
    pub fn locks(&self) -> &MatchLocks {
        &self.locks
    }

    /// Creates an in-progress match between two players.
    ///
    /// # Errors
    ///
    /// [`ServiceError::MissingInput`] / [`ServiceError::PlayerNotFound`] for
    /// unusable descriptors, [`MatchError::AlreadySeated`] if both describe the
    /// same player, and [`ServiceError::Store`] on storage failure.
    #[instrument(skip(self))]
    pub fn start(
        &self,
        player_a: PlayerDescriptor,
        player_b: PlayerDescriptor,
    ) -> Result<MatchView, ServiceError> {
        let (stats_a, new_a) = self.resolve_player(player_a)?;
        let (stats_b, new_b) = self.resolve_player(player_b)?;
        let match_id = new_id();

        if stats_a.id() == stats_b.id() {
            warn!(player_id = %stats_a.id(), "Same player in both seats");
            return Err(MatchError::AlreadySeated {
                player: stats_a.id().clone(),
                match_id,
            }
            .into());
        }

        let game = Match::with_players(
            match_id,
            new_id(),
            stats_a.id().clone(),
            stats_b.id().clone(),
        );
        let created: Vec<&PlayerStats> = [(&stats_a, new_a), (&stats_b, new_b)]
            .into_iter()
            .filter_map(|(stats, new)| new.then_some(stats))
            .collect();
        self.store.commit(&Commit {
            game: &game,
            board: game.board().as_ref(),
            players: &created,
        })?;

        info!(match_id = %game.id(), "Match started");
        Ok(MatchView::new(game, Some(stats_a), Some(stats_b)))
    }

    /// Seats a player, in a new match when `match_id` is `None`.
    ///
    /// # Errors
    ///
    /// [`ServiceError::MatchNotFound`] for an unknown id (no match is created
    /// in that case), the seating errors of [`Match::join`], and the
    /// descriptor errors of [`MatchService::start`].
    #[instrument(skip(self))]
    pub fn join(
        &self,
        match_id: Option<&str>,
        player: PlayerDescriptor,
    ) -> Result<MatchView, ServiceError> {
        let Some(match_id) = match_id else {
            let (stats, created) = self.resolve_player(player)?;
            let mut game = Match::new(new_id(), new_id());
            game.join(stats.id().clone())?;
            let new_player = created.then_some(&stats);
            self.store.commit(&Commit {
                game: &game,
                board: None,
                players: new_player.as_slice(),
            })?;
            info!(match_id = %game.id(), player_id = %stats.id(), "Opened match");
            let view = MatchView::new(game, Some(stats), None);
            self.notify(&view);
            return Ok(view);
        };

        self.locks.with_lock(match_id, || -> Result<MatchView, ServiceError> {
            let mut game = self.load_match(match_id)?;
            let (stats, created) = self.resolve_player(player)?;
            let side = game.join(stats.id().clone())?;
            let new_player = created.then_some(&stats);
            self.store.commit(&Commit {
                game: &game,
                board: game.board().as_ref(),
                players: new_player.as_slice(),
            })?;
            info!(player_id = %stats.id(), %side, state = %game.state(), "Player joined");
            let view = self.view_of(game)?;
            self.notify(&view);
            Ok(view)
        })
    }

    /// Current state of a match with its board and both players.
    ///
    /// # Errors
    ///
    /// [`ServiceError::MatchNotFound`], [`ServiceError::BoardNotFound`] or
    /// [`ServiceError::PlayerNotFound`] when a piece is missing.
    #[instrument(skip(self))]
    pub fn view(&self, match_id: &str) -> Result<MatchView, ServiceError> {
        self.locks.with_lock(match_id, || -> Result<MatchView, ServiceError> {
            let game = self.load_match(match_id)?;
            self.view_of(game)
        })
    }

    /// Cancels a match that has not finished.
    ///
    /// # Errors
    ///
    /// [`ServiceError::MatchNotFound`], or [`MatchError::IllegalState`] for a
    /// completed or aborted match.
    #[instrument(skip(self))]
    pub fn abort(&self, match_id: &str) -> Result<MatchView, ServiceError> {
        self.locks.with_lock(match_id, || -> Result<MatchView, ServiceError> {
            let mut game = self.load_match(match_id)?;
            game.abort()?;
            self.store.save_match(&game)?;
            let view = self.view_of(game)?;
            self.notify(&view);
            Ok(view)
        })
    }

    /// Plays `pit_index` for `player_id` and persists the result.
    ///
    /// The mover's move count goes up by one and both scores are refreshed
    /// from the stores. The opponent's stats are only written when its score
    /// changed. Nothing is written when the move is refused.
    ///
    /// # Errors
    ///
    /// [`ServiceError::MatchNotFound`], [`ServiceError::BoardNotFound`],
    /// [`ServiceError::PlayerNotFound`], any [`MatchError`] from
    /// [`Match::make_move`], and [`ServiceError::Store`].
    #[instrument(skip(self))]
    pub fn make_move(
        &self,
        match_id: &str,
        player_id: &str,
        pit_index: usize,
    ) -> Result<MatchView, ServiceError> {
        self.locks.with_lock(match_id, || -> Result<MatchView, ServiceError> {
            let mut game = self.load_match(match_id)?;
            if *game.state() == MatchState::InProgress {
                self.attach_board(&mut game)?;
            }
            let mut stats_a = self.seated_player(&game, Side::A)?;
            let mut stats_b = self.seated_player(&game, Side::B)?;

            let report = game.make_move(player_id, pit_index)?;

            let (Some(a), Some(b)) = (stats_a.as_mut(), stats_b.as_mut()) else {
                // make_move only succeeds with both seats filled.
                return Err(MatchError::IllegalState {
                    match_id: match_id.to_string(),
                    action: "move in",
                    state: *game.state(),
                }
                .into());
            };
            let (mover, opponent) = match report.mover {
                Side::A => (a, b),
                Side::B => (b, a),
            };
            mover.record_move();
            let opponent_changed = match game.board() {
                Some(board) => {
                    mover.sync_score(board.store(report.mover));
                    opponent.sync_score(board.store(report.mover.opponent()))
                }
                None => false,
            };

            let mut players: Vec<&PlayerStats> = vec![&*mover];
            if opponent_changed {
                players.push(&*opponent);
            }
            self.store.commit(&Commit {
                game: &game,
                board: game.board().as_ref(),
                players: &players,
            })?;
            info!(
                mover = %report.mover,
                outcome = ?report.outcome,
                completed = report.completed,
                "Move committed"
            );
            let view = MatchView::new(game, stats_a, stats_b);
            self.notify(&view);
            Ok(view)
        })
    }

    fn load_match(&self, match_id: &str) -> Result<Match, ServiceError> {
        self.store.load_match(match_id)?.ok_or_else(|| {
            warn!(match_id, "Match not found");
            ServiceError::MatchNotFound(match_id.to_string())
        })
    }

    /// Loads the board; required once play has started.
    fn attach_board(&self, game: &mut Match) -> Result<(), ServiceError> {
        match self.store.load_board(game.board_id())? {
            Some(board) => {
                game.attach_board(board);
                Ok(())
            }
            None if *game.state() == MatchState::Waiting
                || (*game.state() == MatchState::Aborted && game.player_b().is_none()) =>
            {
                Ok(())
            }
            None => {
                warn!(board_id = %game.board_id(), "Board not found");
                Err(ServiceError::BoardNotFound(game.board_id().clone()))
            }
        }
    }

    fn seated_player(&self, game: &Match, side: Side) -> Result<Option<PlayerStats>, ServiceError> {
        let Some(player_id) = game.player(side) else {
            return Ok(None);
        };
        self.store
            .load_player(player_id)?
            .map(Some)
            .ok_or_else(|| ServiceError::PlayerNotFound(player_id.clone()))
    }

    fn view_of(&self, mut game: Match) -> Result<MatchView, ServiceError> {
        if game.board().is_none() {
            self.attach_board(&mut game)?;
        }
        let player_a = self.seated_player(&game, Side::A)?;
        let player_b = self.seated_player(&game, Side::B)?;
        Ok(MatchView::new(game, player_a, player_b))
    }

    /// Returns the player and whether it was just created.
    fn resolve_player(&self, player: PlayerDescriptor) -> Result<(PlayerStats, bool), ServiceError> {
        if let Some(id) = player.id {
            let stats = self
                .store
                .load_player(&id)?
                .ok_or(ServiceError::PlayerNotFound(id))?;
            debug!(player_id = %stats.id(), "Returning player");
            return Ok((stats, false));
        }

        let name = player
            .name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or(ServiceError::MissingInput("player name"))?;
        let stats = PlayerStats::new(new_id(), name);
        debug!(player_id = %stats.id(), "New player");
        Ok((stats, true))
    }
}
