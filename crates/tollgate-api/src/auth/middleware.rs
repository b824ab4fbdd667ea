/// Authentication middleware for protecting routes
///
/// Extracts the bearer token from the Authorization header and runs it
/// through the full session validation. On success, adds the authenticated
/// user to request extensions.
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Authenticated user information
///
/// This is added to request extensions by [`require_session`] and can be
/// extracted in handlers using `Extension<AuthenticatedUser>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub username: String,
}

/// Token presented in the Authorization header
///
/// Accepts `Bearer <token>` as well as a bare token. Returns `None` when the
/// header is missing or not valid ASCII.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    Some(strip_bearer_scheme(value).trim())
}

/// Drop a leading `Bearer ` auth scheme, matched case-insensitively
pub fn strip_bearer_scheme(value: &str) -> &str {
    const SCHEME: &str = "bearer ";
    match value.get(..SCHEME.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(SCHEME) => &value[SCHEME.len()..],
        _ => value,
    }
}

/// Authentication middleware that requires the caller's current session token
///
/// # Usage
///
/// ```ignore
/// use axum::{Router, routing::get, middleware};
/// use tollgate_api::auth::middleware::require_session;
///
/// let app = Router::new()
///     .route("/protected", get(protected_handler))
///     .route_layer(middleware::from_fn_with_state(state.clone(), require_session));
/// ```
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers()).unwrap_or_default();
    let session = state.auth.validate(token).await?;

    request.extensions_mut().insert(AuthenticatedUser {
        user_id: session.user_id,
        username: session.username,
    });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_prefix_stripped() {
        let headers = headers_with("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn test_bare_token_accepted() {
        let headers = headers_with("abc.def.ghi");
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_scheme_matched_case_insensitively() {
        for value in ["bearer abc.def.ghi", "BEARER abc.def.ghi", "BeArEr abc.def.ghi"] {
            assert_eq!(bearer_token(&headers_with(value)), Some("abc.def.ghi"), "{value}");
        }
    }

    #[test]
    fn test_strip_bearer_scheme_leaves_other_values() {
        assert_eq!(strip_bearer_scheme("Basic dXNlcjpwdw=="), "Basic dXNlcjpwdw==");
        assert_eq!(strip_bearer_scheme("Bearer"), "Bearer");
        assert_eq!(strip_bearer_scheme("tok"), "tok");
    }

    #[test]
    fn test_empty_bearer() {
        let headers = headers_with("Bearer ");
        assert_eq!(bearer_token(&headers), Some(""));
    }
}
