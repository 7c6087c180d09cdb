// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Dev-Optics HTTP Daemon
//!
//! Boots the release-tracker API: connects the PostgreSQL pool, ensures the
//! schema, wires the repository implementations into the router, and serves
//! until ctrl-c / SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use devoptics_core::infrastructure::repositories::{
    PostgresAppRepository, PostgresChangeRepository, PostgresDeploymentRepository,
    PostgresMilestoneRepository, PostgresVersionRepository,
};
use devoptics_core::infrastructure::{Database, ImageStore};
use devoptics_core::presentation::{app, AppState};

/// Dev-Optics release tracker daemon
#[derive(Parser)]
#[command(name = "devoptics")]
#[command(version, about, long_about = None)]
struct Cli {
    /// HTTP API host
    #[arg(long, env = "DEVOPTICS_HOST", default_value = "0.0.0.0")]
    host: String,

    /// HTTP API port
    #[arg(long, env = "DEVOPTICS_PORT", default_value = "1337")]
    port: u16,

    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Directory served under /static (uploaded images land in images/)
    #[arg(long, env = "DEVOPTICS_STATIC_DIR", default_value = "static")]
    static_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "DEVOPTICS_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    let database = Database::new(&cli.database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;
    database
        .ensure_schema()
        .await
        .context("Failed to ensure database schema")?;
    info!("Database ready");

    let pool = database.get_pool().clone();
    let state = Arc::new(AppState::new(
        Arc::new(PostgresAppRepository::new(pool.clone())),
        Arc::new(PostgresVersionRepository::new(pool.clone())),
        Arc::new(PostgresDeploymentRepository::new(pool.clone())),
        Arc::new(PostgresChangeRepository::new(pool.clone())),
        Arc::new(PostgresMilestoneRepository::new(pool)),
        ImageStore::new(&cli.static_dir),
    ));

    let router = app(state, &cli.static_dir);

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Dev-Optics API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Daemon shutting down");
    Ok(())
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
