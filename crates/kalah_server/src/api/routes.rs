//! REST handlers.

use super::{ApiError, AppState, RestResponse};
use crate::service::{MatchView, PlayerDescriptor, ServiceError};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use kalah_rules::{MatchId, PlayerId};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Body of `POST /matches`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartRequest {
    /// First seat.
    #[serde(default)]
    pub player_a: Option<PlayerDescriptor>,
    /// Second seat.
    #[serde(default)]
    pub player_b: Option<PlayerDescriptor>,
}

/// Body of `POST /matches/join`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Match to join; a new one is opened when absent.
    #[serde(default)]
    pub match_id: Option<MatchId>,
    /// Who is joining.
    #[serde(default)]
    pub player: Option<PlayerDescriptor>,
}

/// Body of `POST /matches/{id}/moves`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoveRequest {
    /// Player making the move.
    #[serde(default)]
    pub player_id: Option<PlayerId>,
    /// Small pit to sow from, 0-5.
    #[serde(default)]
    pub pit_index: Option<usize>,
}

type Reply = Result<RestResponse<MatchView>, ApiError>;

/// `GET /ping`
pub async fn ping() -> RestResponse<&'static str> {
    RestResponse::ok("pong")
}

/// `POST /matches`
#[instrument(skip(state, body))]
pub async fn start(
    State(state): State<AppState>,
    body: Result<Json<StartRequest>, JsonRejection>,
) -> Reply {
    let Json(request) = body?;
    let player_a = request
        .player_a
        .ok_or(ServiceError::MissingInput("player_a"))?;
    let player_b = request
        .player_b
        .ok_or(ServiceError::MissingInput("player_b"))?;

    let view = state
        .blocking(move |service| service.start(player_a, player_b))
        .await?;
    Ok(RestResponse::ok(view))
}

/// `POST /matches/join`
#[instrument(skip(state, body))]
pub async fn join(
    State(state): State<AppState>,
    body: Result<Json<JoinRequest>, JsonRejection>,
) -> Reply {
    let Json(request) = body?;
    let player = request.player.ok_or(ServiceError::MissingInput("player"))?;
    let match_id = request.match_id;

    let view = state
        .blocking(move |service| service.join(match_id.as_deref(), player))
        .await?;
    Ok(RestResponse::ok(view))
}

/// `GET /matches/{id}`
#[instrument(skip(state))]
pub async fn view(State(state): State<AppState>, Path(id): Path<MatchId>) -> Reply {
    let view = state.blocking(move |service| service.view(&id)).await?;
    Ok(RestResponse::ok(view))
}

/// `DELETE /matches/{id}`
#[instrument(skip(state))]
pub async fn abort(State(state): State<AppState>, Path(id): Path<MatchId>) -> Reply {
    let view = state.blocking(move |service| service.abort(&id)).await?;
    Ok(RestResponse::ok(view))
}

/// `POST /matches/{id}/moves`
#[instrument(skip(state, body))]
pub async fn make_move(
    State(state): State<AppState>,
    Path(id): Path<MatchId>,
    body: Result<Json<MoveRequest>, JsonRejection>,
) -> Reply {
    let Json(request) = body?;
    let player_id = request
        .player_id
        .ok_or(ServiceError::MissingInput("player_id"))?;
    let pit_index = request
        .pit_index
        .ok_or(ServiceError::MissingInput("pit_index"))?;

    let view = state
        .blocking(move |service| service.make_move(&id, &player_id, pit_index))
        .await?;
    Ok(RestResponse::ok(view))
}
