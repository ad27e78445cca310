use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use fieldlink_types::error::ChatError;

/// HTTP-facing error: the shared taxonomy plus plain not-found.
/// Every variant renders as a JSON body with a human-readable reason.
#[derive(Debug)]
pub enum ApiError {
    Chat(ChatError),
    NotFound(String),
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        ApiError::Chat(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, reason) = match self {
            ApiError::Chat(err) => {
                let status = match &err {
                    ChatError::DuplicateIdentity(_) => StatusCode::CONFLICT,
                    ChatError::Validation(_) | ChatError::InvalidAddressing => {
                        StatusCode::UNPROCESSABLE_ENTITY
                    }
                    ChatError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                    ChatError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    error!("request failed: {err}");
                }
                (status, err.to_string())
            }
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, what),
        };

        (status, Json(json!({ "error": reason }))).into_response()
    }
}
