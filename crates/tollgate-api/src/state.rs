//! Application state management
//!
//! Author: hephaex@gmail.com

use crate::auth::{AuthService, TokenCodec};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tollgate_core::{
    AppConfig, Clock, CredentialStore, MemoryStore, PgStore, SessionStore, StoreBackend,
    StoreError, SystemClock,
};

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Authentication use cases
    pub auth: AuthService,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
}

impl AppState {
    /// Create new application state around an already wired service
    pub fn new(config: AppConfig, auth: AuthService) -> Self {
        Self {
            config,
            auth,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
        }
    }

    /// Build the stores named by the configuration and wire the service
    pub async fn from_config(config: AppConfig) -> Result<Self, StoreError> {
        let (credentials, sessions): (Arc<dyn CredentialStore>, Arc<dyn SessionStore>) =
            match config.database.backend {
                StoreBackend::Postgres => {
                    let store = Arc::new(
                        PgStore::connect(
                            &config.database.connection_url(),
                            config.database.max_connections,
                        )
                        .await?,
                    );
                    store.migrate().await?;
                    (store.clone(), store)
                }
                StoreBackend::Memory => {
                    tracing::warn!("Using in-memory store; accounts and sessions are not persisted");
                    let store = Arc::new(MemoryStore::new());
                    (store.clone(), store)
                }
            };

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let codec = TokenCodec::from_config(&config.auth, clock);
        let auth = AuthService::new(credentials, sessions, codec)
            .with_auth_config(&config.auth)
            .with_store_timeout(Duration::from_secs(config.database.store_timeout_secs));

        Ok(Self::new(config, auth))
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
