//! HTTP and WebSocket transport over [`MatchService`].

mod envelope;
mod routes;
mod socket;

pub use envelope::{API_VERSION, ApiError, RestResponse};
pub use routes::{JoinRequest, MoveRequest, StartRequest};
pub use socket::SocketCommand;

use crate::hub::MatchHub;
use crate::service::{MatchObserver, MatchService, MatchView, ServiceError};
use axum::body::Body;
use axum::http::Request;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::{debug, info, warn};

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    service: MatchService,
    hub: MatchHub,
}

impl AppState {
    /// Bundles the service with a fresh hub that hears every committed change.
    pub fn new(service: MatchService) -> Self {
        let hub = MatchHub::new();
        Self {
            service: service.with_observer(Arc::new(hub.clone())),
            hub,
        }
    }

    /// Broadcast hub for match updates.
    pub fn hub(&self) -> &MatchHub {
        &self.hub
    }

    /// Runs a blocking service call off the async workers.
    async fn blocking<F>(&self, op: F) -> Result<MatchView, ApiError>
    where
        F: FnOnce(&MatchService) -> Result<MatchView, ServiceError> + Send + 'static,
    {
        let service = self.service.clone();
        tokio::task::spawn_blocking(move || op(&service))
            .await
            .map_err(|e| ApiError::Worker(e.to_string()))?
            .map_err(ApiError::from)
    }
}

/// Sends each committed view to every WebSocket watching its match.
impl MatchObserver for MatchHub {
    fn match_changed(&self, view: &MatchView) {
        match RestResponse::ok(view).to_frame() {
            Ok(frame) => {
                let delivered = self.publish(view.game().id(), frame);
                debug!(match_id = %view.game().id(), delivered, "Broadcast update");
            }
            Err(e) => warn!(error = %e, "Failed to encode update"),
        }
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(routes::ping))
        .route("/matches", post(routes::start))
        .route("/matches/join", post(routes::join))
        .route("/matches/{id}", get(routes::view).delete(routes::abort))
        .route("/matches/{id}/moves", post(routes::make_move))
        .route("/matches/{id}/ws", get(socket::upgrade))
        .layer(ServiceBuilder::new().map_request(|req: Request<Body>| {
            info!(
                method = %req.method(),
                uri = %req.uri(),
                "Incoming HTTP request"
            );
            req
        }))
        .with_state(state)
}
