//! API route definitions
//!
//! Author: hephaex@gmail.com

use crate::auth::middleware::require_session;
use crate::handlers::auth;
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Create API v1 routes
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route(
            "/auth/validate",
            get(auth::validate_handler).post(auth::validate_handler),
        );

    // Protected routes (current session required)
    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route_layer(middleware::from_fn_with_state(state, require_session));

    Router::new().merge(public_routes).merge(protected_routes)
}
