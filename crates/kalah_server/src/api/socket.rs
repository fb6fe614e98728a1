//! WebSocket subscription to a single match.
//!
//! A client connected to `/matches/{id}/ws` first receives the current view,
//! then every update committed to the match. It may also send commands;
//! failures are answered to the sender only, successes reach all subscribers
//! through the hub.

use super::{ApiError, AppState, RestResponse};
use crate::hub::Subscription;
use crate::service::{MatchView, PlayerDescriptor, ServiceError};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use kalah_rules::{MatchId, PlayerId};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, instrument, warn};

/// A command sent by a WebSocket client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SocketCommand {
    /// Play a pit.
    Move {
        /// Player making the move.
        #[serde(default)]
        player_id: Option<PlayerId>,
        /// Small pit to sow from, 0-5.
        #[serde(default)]
        pit_index: Option<usize>,
    },
    /// Take a seat in this match.
    Join {
        /// Who is joining.
        #[serde(default)]
        player: Option<PlayerDescriptor>,
    },
}

/// `GET /matches/{id}/ws`
#[instrument(skip(state, ws))]
pub async fn upgrade(
    State(state): State<AppState>,
    Path(id): Path<MatchId>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, id))
}

/// Subscribes to `match_id` and renders its current view.
///
/// The subscription is taken first so no update slips in between. It is only
/// returned when the match exists; otherwise it is dropped, which frees the
/// channel again.
async fn open(state: &AppState, match_id: &str) -> (Option<String>, Option<Subscription>) {
    let updates = state.hub().subscribe(match_id);

    let id = match_id.to_string();
    let (snapshot, updates) = match state.blocking(move |service| service.view(&id)).await {
        Ok(view) => (RestResponse::ok(&view).to_frame(), Some(updates)),
        Err(err) => {
            debug!(match_id, kind = err.kind(), "Snapshot failed");
            (RestResponse::<()>::failure(&err).to_frame(), None)
        }
    };
    let frame = snapshot
        .map_err(|e| warn!(error = %e, "Failed to encode snapshot"))
        .ok();
    (frame, updates)
}

async fn handle_socket(socket: WebSocket, state: AppState, match_id: MatchId) {
    info!(%match_id, "WebSocket connected");
    let (mut sink, mut stream) = socket.split();

    let (snapshot, updates) = open(&state, &match_id).await;
    if let Some(frame) = snapshot {
        if sink.send(Message::Text(frame.into())).await.is_err() {
            return;
        }
    }
    let Some(mut updates) = updates else {
        debug!(%match_id, "Closing socket after failed snapshot");
        return;
    };

    // Replies meant for this client alone.
    let (direct_tx, mut direct_rx) = mpsc::channel::<String>(16);

    let mut send_task = tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                update = updates.recv() => match update {
                    Ok(frame) => frame,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Subscriber lagged, frames skipped");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                direct = direct_rx.recv() => match direct {
                    Some(frame) => frame,
                    None => break,
                },
            };
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_state = state.clone();
    let recv_match = match_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            match message {
                Message::Text(text) => {
                    let reply = run_command(&recv_state, &recv_match, text.as_str()).await;
                    match reply {
                        // Committed views reach every subscriber, this one included.
                        Ok(view) => {
                            debug!(match_id = %view.game().id(), "Socket command applied");
                        }
                        Err(err) => {
                            warn!(kind = err.kind(), error = %err, "Socket command failed");
                            if let Ok(frame) = RestResponse::<()>::failure(&err).to_frame() {
                                if direct_tx.send(frame).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // The survivor is awaited so its half of the socket and the subscription
    // are gone before we return.
    let survivor = tokio::select! {
        _ = &mut send_task => recv_task,
        _ = &mut recv_task => send_task,
    };
    survivor.abort();
    let _ = survivor.await;
    info!(%match_id, "WebSocket disconnected");
}

#[instrument(skip(state, text))]
async fn run_command(state: &AppState, match_id: &str, text: &str) -> Result<MatchView, ApiError> {
    let command: SocketCommand =
        serde_json::from_str(text).map_err(|e| ApiError::Malformed(e.to_string()))?;
    debug!(?command, "Socket command");
    let match_id = match_id.to_string();

    match command {
        SocketCommand::Move {
            player_id,
            pit_index,
        } => {
            let player_id = player_id.ok_or(ServiceError::MissingInput("player_id"))?;
            let pit_index = pit_index.ok_or(ServiceError::MissingInput("pit_index"))?;
            state
                .blocking(move |service| service.make_move(&match_id, &player_id, pit_index))
                .await
        }
        SocketCommand::Join { player } => {
            let player = player.ok_or(ServiceError::MissingInput("player"))?;
            state
                .blocking(move |service| service.join(Some(&match_id), player))
                .await
        }
    }
}
