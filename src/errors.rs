use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Database error: {0}")]
    Db(sqlx::Error),
    #[error("Narrative model error: {0}")]
    Llm(#[from] LlmError),
    #[error("Render error: {0}")]
    Render(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures talking to the external text-generation endpoint.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("narrative model is not configured")]
    Disabled,
    #[error("request to narrative model timed out")]
    Timeout,
    #[error("network error: {0}")]
    NetworkError(String),
    #[error("rate limited by narrative provider")]
    RateLimited,
    #[error("provider returned an error: {0}")]
    ApiError(String),
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Db(e) => {
                error!("Database failure while handling request: {}", e);
                "Internal server error".to_string()
            }
            other => {
                error!("Request failed: {}", other);
                other.to_string()
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(value: sqlx::Error) -> Self {
        AppError::Db(value)
    }
}

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(value: axum::extract::rejection::JsonRejection) -> Self {
        AppError::Validation(format!("Invalid request body: {}", value.body_text()))
    }
}

impl From<axum::extract::rejection::QueryRejection> for AppError {
    fn from(value: axum::extract::rejection::QueryRejection) -> Self {
        AppError::Validation(format!("Invalid query string: {}", value.body_text()))
    }
}
