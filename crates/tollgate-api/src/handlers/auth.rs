//! Authentication API handlers
//!
//! Provides HTTP endpoints for registration, login and token validation.
//!
//! Author: hephaex@gmail.com

use crate::auth::{
    bearer_token, AuthenticatedUser, LoginRequest, LoginResponse, RegisterRequest, UserInfo,
};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Validation response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidateResponse {
    pub valid: bool,
    pub username: String,
}

/// Current user response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub username: String,
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value).map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected request body");
        AppError::BadRequest("Invalid request body".to_string())
    })
}

/// Register a new user account
///
/// # Responses
///
/// * `201 Created` - User successfully registered
/// * `400 Bad Request` - Empty username/password or undecodable body
/// * `409 Conflict` - Username already exists
/// * `500 Internal Server Error` - Server error
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = UserInfo),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 409, description = "Username already exists", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let request = json_body(body)?;
    let user = state.auth.register(request).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Login with username and password
///
/// Returns a session token. Logging in again invalidates every token
/// previously issued to the same user.
///
/// # Responses
///
/// * `200 OK` - Authentication successful, returns token
/// * `401 Unauthorized` - Invalid credentials
/// * `500 Internal Server Error` - Server error
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 401, description = "Invalid credentials", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let request = json_body(body)?;
    let response = state.auth.login(request).await?;

    Ok(Json(response))
}

/// Validate a bearer token
///
/// The token is read from the Authorization header, with or without the
/// `Bearer ` prefix.
///
/// # Responses
///
/// * `200 OK` - Token is the user's current, unexpired session
/// * `401 Unauthorized` - Missing, invalid, expired or superseded token
/// * `500 Internal Server Error` - Server error
#[utoipa::path(
    get,
    path = "/api/v1/auth/validate",
    tag = "auth",
    responses(
        (status = 200, description = "Token is valid", body = ValidateResponse),
        (status = 401, description = "Token is not valid", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn validate_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let token = bearer_token(&headers).unwrap_or_default();
    let session = state.auth.validate(token).await?;

    Ok(Json(ValidateResponse {
        valid: true,
        username: session.username,
    }))
}

/// Get the current user
///
/// Requires the caller's current session token.
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn me_handler(Extension(user): Extension<AuthenticatedUser>) -> impl IntoResponse {
    Json(MeResponse {
        username: user.username,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_response_serialization() {
        let response = ValidateResponse {
            valid: true,
            username: "alice".to_string(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"valid":true,"username":"alice"}"#);
    }

    #[test]
    fn test_login_response_has_token_field() {
        let response = LoginResponse {
            token: "abc".to_string(),
            expires_at: chrono::Utc::now(),
        };

        let json: serde_json::Value = serde_json::to_value(&response).unwrap();
        assert_eq!(json["token"], "abc");
    }
}
