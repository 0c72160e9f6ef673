//! HTTP error type. Every failure leaves a handler as `{"message": ...}`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    PayloadTooLarge(String),
    Internal(String),
    /// LLM provider failure; the cause is passed through as `error`.
    Ai(String),
}

impl From<notesage_core::Error> for ApiError {
    fn from(err: notesage_core::Error) -> Self {
        match err {
            notesage_core::Error::NotFound(msg) => ApiError::NotFound(msg),
            notesage_core::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            notesage_core::Error::Unauthorized(msg) => ApiError::Unauthorized(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// JSON body extractor whose rejections use the `{"message"}` shape.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, serde_json::json!({ "message": msg })),
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, serde_json::json!({ "message": msg }))
            }
            ApiError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, serde_json::json!({ "message": msg }))
            }
            ApiError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, serde_json::json!({ "message": msg }))
            }
            ApiError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, serde_json::json!({ "message": msg }))
            }
            ApiError::Ai(cause) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({
                    "message": "Failed to generate AI response",
                    "error": cause,
                }),
            ),
        };

        (status, Json(body)).into_response()
    }
}
