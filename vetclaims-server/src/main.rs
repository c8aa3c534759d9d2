//! Vets4Claims backend server
//!
//! Serves the veteran profile API (with SSN field encryption and identity
//! reconciliation) and the transactional email endpoints.
//!
//! Usage:
//!   ENCRYPTION_KEY=... vetclaims-server --port 8000
//!   ENCRYPTION_KEY=new PREVIOUS_ENCRYPTION_KEYS=old vetclaims-server --reencrypt
//!
//! Every option can also be supplied through the environment; see `--help`.

use std::sync::Arc;
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use vetclaims_server::{Args, build_router, build_state};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("Vets4Claims backend starting...");
    let state = build_state(&args)?;

    if args.reencrypt {
        let report = state
            .profiles
            .reencrypt_stored_ssns()
            .context("SSN re-encryption failed")?;
        if report.failed > 0 {
            warn!(
                "{} SSN(s) could not be read with any configured key; keep their secret in PREVIOUS_ENCRYPTION_KEYS",
                report.failed
            );
        }
        info!("Re-encryption finished, {} record(s) updated", report.reencrypted);
        return Ok(());
    }

    let app = build_router(Arc::new(state));

    let addr = format!("{}:{}", args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("HTTP API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
