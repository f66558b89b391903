//! deskscroll-daemon: per-device scroll direction and Control+scroll desktop switching
//!
//! This daemon runs as a LaunchAgent and provides:
//! - Session event taps for scroll, modifier and multi-touch events
//! - Wheel vs trackpad classification of every scroll event
//! - Inverted wheel scrolling while the trackpad keeps natural scrolling
//! - Control+scroll mapped to Control+Left/Right desktop switching
//!
//! Installing and starting the agent is left to an external service
//! manager; `--check-permission` reports trust status for it.

mod classify;
mod config;
mod dispatch;
mod events;
mod gateway;
mod intercept;
mod lifecycle;
mod modifier;
mod transform;

use anyhow::{bail, Context, Result};
use tokio::runtime::Handle;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::gateway::{Gateway, PermissionReport};
use crate::lifecycle::ShutdownSignal;

#[tokio::main]
async fn main() -> Result<()> {
    match std::env::args().nth(1).as_deref() {
        None => {}
        Some("--version") => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Some("--check-permission") => return check_permission(),
        Some(other) => bail!("unknown argument: {other}"),
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "deskscroll-daemon starting"
    );

    let config = Config::load().context("invalid configuration")?;
    info!(?config, "configuration loaded");

    // Active taps are useless without trust; never run degraded
    if let Err(e) = gateway::ensure_trusted() {
        error!(%e, "accessibility permission missing");
        return Err(e.into());
    }

    let shutdown = ShutdownSignal::new();
    let mut gateway = Gateway::new(config);

    if let Err(e) = gateway.start(Handle::current()).await {
        error!(?e, "failed to start event taps");
        return Err(e.into());
    }

    info!("daemon initialized, entering main loop");

    tokio::select! {
        result = shutdown.wait() => match result {
            Ok(reason) => info!(%reason, "shutdown signal received"),
            Err(e) => error!(?e, "failed to listen for shutdown signals"),
        },

        _ = gateway.exited() => {
            warn!("event tap thread exited unexpectedly");
        }
    }

    info!("shutting down...");

    gateway.shutdown().await;

    let totals = serde_json::to_string(&gateway.stats().snapshot())?;
    info!(%totals, "interception totals");

    info!("deskscroll-daemon stopped");

    Ok(())
}

/// Print the trust status as JSON; exit status 1 when not trusted
fn check_permission() -> Result<()> {
    let report = PermissionReport::current();
    println!("{}", serde_json::to_string(&report)?);

    if !report.trusted {
        std::process::exit(1);
    }

    Ok(())
}
