//! API error handling
//!
//! Every failure of a use case collapses into one of four outward categories.
//! Internal detail is logged here and never reaches the response body.
//!
//! Author: hephaex@gmail.com

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    /// The single body used for every authentication failure
    pub fn unauthorized() -> Self {
        Self::new("UNAUTHORIZED", "Invalid credentials")
    }

    pub fn internal_error() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Conflict(String),
    Unauthorized,
    /// Detail is for logs only
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {msg}"),
            AppError::Conflict(msg) => write!(f, "Conflict: {msg}"),
            AppError::Unauthorized => write!(f, "Unauthorized"),
            AppError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = match self {
            AppError::BadRequest(msg) => ApiError::bad_request(msg),
            AppError::Conflict(msg) => ApiError::conflict(msg),
            AppError::Unauthorized => ApiError::unauthorized(),
            AppError::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed with internal error");
                ApiError::internal_error()
            }
        };

        (status, Json(error)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(error: AppError) -> (StatusCode, String) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_status_mapping() {
        assert_eq!(
            body_of(AppError::BadRequest("x".into())).await.0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            body_of(AppError::Conflict("x".into())).await.0,
            StatusCode::CONFLICT
        );
        assert_eq!(
            body_of(AppError::Unauthorized).await.0,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            body_of(AppError::Internal("x".into())).await.0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_internal_detail_not_exposed() {
        let (_, body) = body_of(AppError::Internal(
            "Database error: relation \"users\" does not exist".to_string(),
        ))
        .await;

        assert!(!body.contains("relation"));
        assert!(!body.contains("Database"));
        assert!(body.contains("INTERNAL_ERROR"));
    }

    #[tokio::test]
    async fn test_unauthorized_body_is_fixed() {
        let (_, body) = body_of(AppError::Unauthorized).await;
        assert_eq!(
            body,
            r#"{"code":"UNAUTHORIZED","message":"Invalid credentials"}"#
        );
    }
}
