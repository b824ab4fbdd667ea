//! Tollgate API - authentication and session-token server
//!
//! Provides HTTP endpoints for registering accounts, logging in, and
//! validating bearer session tokens.

pub mod audit;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::{routing::get, Router};
use state::AppState;
use std::sync::Arc;
use tollgate_core::{AppConfig, LoggingConfig};
use tower_http::trace::TraceLayer;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI document
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::register_handler,
        handlers::auth::login_handler,
        handlers::auth::validate_handler,
        handlers::auth::me_handler,
        handlers::health::health_check,
        handlers::health::readiness_check,
        handlers::health::metrics,
    ),
    components(schemas(
        auth::RegisterRequest,
        auth::LoginRequest,
        auth::LoginResponse,
        auth::UserInfo,
        handlers::auth::ValidateResponse,
        handlers::auth::MeResponse,
        handlers::health::HealthResponse,
        handlers::health::ReadinessResponse,
        handlers::health::ReadinessChecks,
        handlers::health::MetricsResponse,
        error::ApiError,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and token validation"),
        (name = "health", description = "Liveness and readiness probes"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Build the full application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::health::metrics))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::count_requests,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over the configured level when set.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "tollgate_api={level},tollgate_core={level},audit=info,tower_http=debug",
            level = config.level
        )
        .into()
    });

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Connect the stores and serve HTTP until interrupted
pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    if config.auth.uses_default_secret() {
        tracing::warn!("SERVER_SECRET is not set; signing tokens with the development secret");
    }

    let addr = config.listen_addr();
    let state = Arc::new(AppState::from_config(config).await?);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Tollgate API Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// Helpers for wiring the service against in-memory stores in tests
#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    use super::*;
    use crate::auth::{AuthService, PasswordConfig, TokenCodec};
    use tollgate_core::{ManualClock, MemoryStore, StoreBackend};

    /// Signing secret used by [`test_state`]
    pub const TEST_SECRET: &str = "test-secret";

    /// State backed by a fresh in-memory store and the given clock
    pub fn test_state(clock: Arc<ManualClock>) -> Arc<AppState> {
        let mut config = AppConfig::default();
        config.database.backend = StoreBackend::Memory;
        config.auth.secret = TEST_SECRET.to_string();

        let store = Arc::new(MemoryStore::new());
        let codec = TokenCodec::from_config(&config.auth, clock);
        let auth = AuthService::new(store.clone(), store, codec)
            .with_auth_config(&config.auth)
            .with_password_config(PasswordConfig::for_testing());

        Arc::new(AppState::new(config, auth))
    }
}

/// Router over in-memory stores with fast password hashing
#[cfg(any(test, feature = "test-utils"))]
pub fn create_router_for_testing() -> Router {
    create_router(testing::test_state(Arc::new(
        tollgate_core::ManualClock::default(),
    )))
}
