//! Client-visible error type for the proxy

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Model name is required in URL path")]
    MissingModel,

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    /// Non-2xx answer from the backend; status and body are passed through.
    #[error("{body}")]
    Upstream { status: u16, body: String },

    #[error("Upstream request failed: {0}")]
    Transport(String),

    #[error("Unexpected streaming response for non-streaming endpoint")]
    UnexpectedStreaming,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::InvalidRequest(_) | ProxyError::MissingModel => StatusCode::BAD_REQUEST,
            ProxyError::UnknownAction(_) => StatusCode::NOT_FOUND,
            ProxyError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ProxyError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ProxyError::Transport(_) => StatusCode::BAD_GATEWAY,
            ProxyError::UnexpectedStreaming | ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(e: reqwest::Error) -> Self {
        ProxyError::Transport(e.to_string())
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "error": {
                "message": self.to_string(),
                "type": "error",
            }
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(ProxyError::MissingModel.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ProxyError::UnknownAction("embed".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ProxyError::RateLimited.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            ProxyError::Upstream { status: 401, body: "nope".into() }.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ProxyError::Upstream { status: 42, body: String::new() }.status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(ProxyError::Transport("reset".into()).status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(ProxyError::UnexpectedStreaming.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn upstream_message_is_the_body() {
        let err = ProxyError::Upstream { status: 503, body: "overloaded".into() };
        assert_eq!(err.to_string(), "overloaded");
    }
}
