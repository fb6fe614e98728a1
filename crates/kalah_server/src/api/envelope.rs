//! JSON envelope shared by every REST and WebSocket reply.

use crate::service::ServiceError;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kalah_rules::MatchError;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

/// Envelope schema version.
pub const API_VERSION: &str = "0.0.1";

/// `{version, result, code, message}` wrapper. `code` mirrors the HTTP status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestResponse<T> {
    /// Envelope schema version.
    pub version: String,
    /// Payload, `null` on failure.
    pub result: Option<T>,
    /// Numeric status.
    pub code: u16,
    /// `OK` or a description of the failure.
    pub message: String,
    /// Failure kind, absent on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> RestResponse<T> {
    /// Successful reply carrying `result`.
    pub fn ok(result: T) -> Self {
        Self {
            version: API_VERSION.to_string(),
            result: Some(result),
            code: StatusCode::OK.as_u16(),
            message: "OK".to_string(),
            error: None,
        }
    }

    /// Failed reply with no payload.
    pub fn failure(err: &ApiError) -> Self {
        Self {
            version: API_VERSION.to_string(),
            result: None,
            code: err.status().as_u16(),
            message: err.to_string(),
            error: Some(err.kind().to_string()),
        }
    }
}

impl<T: Serialize> RestResponse<T> {
    /// Serializes the envelope for a WebSocket text frame.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl<T: Serialize> IntoResponse for RestResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Anything a request can fail with.
#[derive(Debug, derive_more::Display)]
pub enum ApiError {
    /// The service refused or failed.
    #[display("{}", _0)]
    Service(ServiceError),

    /// The body or frame could not be decoded.
    #[display("Malformed request: {}", _0)]
    Malformed(String),

    /// The blocking worker running the operation died.
    #[display("Worker failed: {}", _0)]
    Worker(String),
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Service(err) => Some(err),
            _ => None,
        }
    }
}

impl ApiError {
    /// HTTP status for the failure.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Service(err) => service_status(err),
            ApiError::Malformed(_) => StatusCode::BAD_REQUEST,
            ApiError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable name of the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Service(err) => err.kind(),
            ApiError::Malformed(_) => "MalformedRequest",
            ApiError::Worker(_) => "WorkerFailure",
        }
    }
}

fn service_status(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::Rules(rules) => match rules {
            MatchError::InvalidMove(_) => StatusCode::BAD_REQUEST,
            MatchError::NotAParticipant { .. } => StatusCode::FORBIDDEN,
            MatchError::NotYourTurn(_)
            | MatchError::IllegalState { .. }
            | MatchError::MatchFull(_)
            | MatchError::AlreadySeated { .. } => StatusCode::NOT_ACCEPTABLE,
            MatchError::BoardMissing(_) => StatusCode::NOT_FOUND,
        },
        ServiceError::MatchNotFound(_)
        | ServiceError::BoardNotFound(_)
        | ServiceError::PlayerNotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::MissingInput(_) => StatusCode::PRECONDITION_FAILED,
        ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Service(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Malformed(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(kind = self.kind(), error = %self, "Request failed");
        } else {
            warn!(kind = self.kind(), code = status.as_u16(), error = %self, "Request rejected");
        }
        RestResponse::<()>::failure(&self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kalah_rules::{MatchState, MoveError};

    #[test]
    fn each_error_kind_has_its_code() {
        let cases = [
            (
                ServiceError::Rules(MatchError::InvalidMove(MoveError::PitOutOfRange(7))),
                400,
            ),
            (
                ServiceError::Rules(MatchError::NotAParticipant {
                    player: "p".to_string(),
                    match_id: "m".to_string(),
                }),
                403,
            ),
            (ServiceError::MatchNotFound("m".to_string()), 404),
            (ServiceError::BoardNotFound("b".to_string()), 404),
            (ServiceError::Rules(MatchError::NotYourTurn("p".to_string())), 406),
            (
                ServiceError::Rules(MatchError::IllegalState {
                    match_id: "m".to_string(),
                    action: "abort",
                    state: MatchState::Completed,
                }),
                406,
            ),
            (ServiceError::MissingInput("pit_index"), 412),
        ];
        for (err, code) in cases {
            assert_eq!(ApiError::from(err).status().as_u16(), code);
        }
    }

    #[test]
    fn failure_envelope_has_no_result() {
        let err = ApiError::from(ServiceError::MissingInput("player_id"));
        let envelope = RestResponse::<()>::failure(&err);
        let json = serde_json::to_value(&envelope).expect("serialize");
        assert_eq!(json["version"], API_VERSION);
        assert_eq!(json["code"], 412);
        assert!(json["result"].is_null());
        assert_eq!(json["message"], "Missing player_id");
        assert_eq!(json["error"], "MissingInput");
    }
}
