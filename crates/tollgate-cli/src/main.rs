//! Tollgate CLI - Command-line interface
//!
//! Usage:
//!   tollgate serve
//!   tollgate migrate
//!   tollgate config
//!   tollgate inspect-token <token>

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tollgate_api::auth::{middleware::strip_bearer_scheme, TokenCodec, TokenError};
use tollgate_core::{AppConfig, PgStore, StoreBackend, SystemClock};

#[derive(Parser)]
#[command(name = "tollgate")]
#[command(about = "Authentication and session-token service")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve,
    /// Apply the database schema and exit
    Migrate,
    /// Print the effective configuration with secrets masked
    Config,
    /// Verify a token against the configured secret and print its claims
    InspectToken {
        /// Token, with or without the "Bearer " prefix
        token: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load().context("Failed to load configuration")?;

    tollgate_api::init_tracing(&config.logging);

    match cli.command {
        Commands::Serve => tollgate_api::serve(config).await?,
        Commands::Migrate => migrate(&config).await?,
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config.redacted())?);
        }
        Commands::InspectToken { token } => inspect_token(&config, &token)?,
    }

    Ok(())
}

async fn migrate(config: &AppConfig) -> anyhow::Result<()> {
    if config.database.backend == StoreBackend::Memory {
        println!("STORE_BACKEND is memory; nothing to migrate");
        return Ok(());
    }

    let store = PgStore::connect(
        &config.database.connection_url(),
        config.database.max_connections,
    )
    .await
    .context("Failed to connect to database")?;
    store.migrate().await.context("Failed to apply schema")?;

    println!("Schema is up to date");
    Ok(())
}

fn inspect_token(config: &AppConfig, token: &str) -> anyhow::Result<()> {
    let token = strip_bearer_scheme(token).trim();
    let codec = TokenCodec::from_config(&config.auth, Arc::new(SystemClock));

    match codec.verify(token) {
        Ok(claims) => {
            println!("{}", serde_json::to_string_pretty(&claims)?);
            println!("expires_at: {}", claims.expires_at());
            Ok(())
        }
        Err(TokenError::Expired) => anyhow::bail!("Token rejected: expired"),
        Err(TokenError::InvalidSignature) => {
            anyhow::bail!("Token rejected: signature does not match the configured secret")
        }
        Err(e) => anyhow::bail!("Token rejected: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_parse_inspect_token() {
        let cli = Cli::try_parse_from(["tollgate", "inspect-token", "abc.def.ghi"]).unwrap();
        match cli.command {
            Commands::InspectToken { token } => assert_eq!(token, "abc.def.ghi"),
            _ => panic!("expected inspect-token"),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_command() {
        assert!(Cli::try_parse_from(["tollgate", "frobnicate"]).is_err());
    }

    #[test]
    fn test_inspect_token_accepts_bearer_prefix() {
        let config = AppConfig::default();
        let codec = TokenCodec::from_config(&config.auth, Arc::new(SystemClock));
        let issued = codec.issue("alice", Duration::hours(1)).unwrap();

        assert!(inspect_token(&config, &format!("Bearer {}", issued.token)).is_ok());
    }

    #[test]
    fn test_inspect_token_rejects_foreign_secret() {
        let config = AppConfig::default();
        let foreign = TokenCodec::new(b"someone-else", "tollgate", Arc::new(SystemClock));
        let issued = foreign.issue("alice", Duration::hours(1)).unwrap();

        let err = inspect_token(&config, &issued.token).unwrap_err();
        assert!(err.to_string().contains("signature"));
    }
}
