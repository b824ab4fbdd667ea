//! Tollgate API Server
//!
//! Author: hephaex@gmail.com

use tollgate_core::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    tollgate_api::init_tracing(&config.logging);

    tollgate_api::serve(config).await
}
