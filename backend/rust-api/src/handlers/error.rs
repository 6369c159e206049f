use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::quiz::QuizError;
use crate::services::session_service::SessionError;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!("Request failed: {:#}", err);
        ApiError::internal(err.to_string())
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(_) => ApiError::not_found(err.to_string()),
            SessionError::Quiz(QuizError::InvalidAnswer(_)) => ApiError::bad_request(err.to_string()),
            SessionError::Quiz(QuizError::SessionCompleted | QuizError::NotReady) => {
                ApiError::conflict(err.to_string())
            }
            SessionError::Quiz(quiz) => {
                tracing::error!("Quiz engine failure: {}", quiz);
                ApiError::internal(quiz.to_string())
            }
            SessionError::Storage(storage) => storage.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        (
            status,
            Json(json!({
                "message": message,
                "status": status.as_u16()
            })),
        )
            .into_response()
    }
}
