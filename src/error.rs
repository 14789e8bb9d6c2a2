use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

use crate::upstream::UpstreamError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Missing API_SPORTS_KEY. Put API_SPORTS_KEY in .env and restart the server.")]
    MissingApiKey,

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::MissingApiKey | ApiError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, failure(&self))
            }
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, failure(&self)),
            ApiError::Upstream(UpstreamError::Status { status, body, .. }) => {
                let code = StatusCode::from_u16(*status)
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                // Forward the provider's own error document when it is JSON.
                let body = serde_json::from_str::<Value>(body)
                    .ok()
                    .filter(Value::is_object)
                    .unwrap_or_else(|| failure(&self));
                (code, body)
            }
            ApiError::Upstream(_) => (StatusCode::INTERNAL_SERVER_ERROR, failure(&self)),
        };

        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), "request failed: {self}");
        }
        (status, Json(body)).into_response()
    }
}

fn failure(err: &ApiError) -> Value {
    json!({ "ok": false, "error": err.to_string() })
}

pub type ApiResult<T> = Result<T, ApiError>;
