//! confhub-server - conference management backend
//!
//! Serves the paper submission, reviewer assignment and dashboard API over
//! a SQLite-backed document store.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use confhub_common::config::{
    default_config_path, load_toml_config, ConfigOverrides, ServerConfig,
};
use confhub_common::db::{init_database, SqliteStore};
use confhub_server::auth::SignedSessionVerifier;
use confhub_server::{build_router, AppState};

/// Command-line arguments for confhub-server
#[derive(Parser, Debug)]
#[command(name = "confhub-server")]
#[command(about = "Conference management backend")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "CONFHUB_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "CONFHUB_BIND")]
    bind: Option<String>,

    /// SQLite database file
    #[arg(long, env = "CONFHUB_DATABASE")]
    database: Option<PathBuf>,

    /// Secret shared with the identity provider for session tokens
    #[arg(long, env = "CONFHUB_SESSION_SECRET", hide_env_values = true)]
    session_secret: Option<String>,

    /// TOML config file
    #[arg(short, long, env = "CONFHUB_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config resolves before tracing starts so log_level can apply;
    // the load outcome is logged once the subscriber is up
    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let toml = load_toml_config(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    let config_found = toml.is_some();
    let config = ServerConfig::resolve(
        ConfigOverrides {
            port: args.port,
            bind: args.bind,
            database_path: args.database,
            session_secret: args.session_secret,
        },
        toml.unwrap_or_default(),
    )?;

    let level = &config.log_level;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("confhub_server={level},confhub_common={level},tower_http={level}")
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting confhub-server v{}", env!("CARGO_PKG_VERSION"));
    if config_found {
        info!("Loaded config file: {}", config_path.display());
    } else {
        warn!(
            "Config file not found at {} - using defaults",
            config_path.display()
        );
    }

    info!("Database path: {}", config.database_path.display());
    let pool = init_database(&config.database_path)
        .await
        .context("Failed to initialize database")?;

    let state = AppState::new(
        Arc::new(SqliteStore::new(pool)),
        Arc::new(SignedSessionVerifier::new(config.session_secret.clone())),
    );
    let app = build_router(state);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("confhub-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}
