use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures surfaced by the booking lifecycle.
///
/// Every variant is reported to the user the same way (a dismissible
/// notification); none of them ends the session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Another booking action is still in progress")]
    Busy,

    #[error("Session not found or expired")]
    SessionNotFound,
}

impl BookingError {
    /// Short user-facing text, without the category prefix.
    pub fn user_message(&self) -> String {
        match self {
            BookingError::Validation(msg)
            | BookingError::Network(msg)
            | BookingError::Conflict(msg)
            | BookingError::MalformedResponse(msg)
            | BookingError::Unauthorized(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for BookingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BookingError::MalformedResponse(err.to_string())
        } else {
            BookingError::Network(err.to_string())
        }
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let status = match &self {
            BookingError::Validation(_) => StatusCode::BAD_REQUEST,
            BookingError::Network(_) => StatusCode::BAD_GATEWAY,
            BookingError::Conflict(_) => StatusCode::CONFLICT,
            BookingError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
            BookingError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            BookingError::Busy => StatusCode::CONFLICT,
            BookingError::SessionNotFound => StatusCode::UNAUTHORIZED,
        };

        tracing::error!("Error: {}: {}", status, self);

        let body = Json(json!({
            "error": self.user_message()
        }));

        (status, body).into_response()
    }
}
