//! CLI command implementations.

mod consume;
mod publish;
mod purge;

pub use consume::run_consume;
pub use publish::run_publish;
pub use purge::run_purge;

use anyhow::{Context, Result};
use tokio::signal::unix::{signal, SignalKind};

/// Wait for shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() -> Result<&'static str> {
    let mut sigint = signal(SignalKind::interrupt()).context("register SIGINT handler")?;
    let mut sigterm = signal(SignalKind::terminate()).context("register SIGTERM handler")?;

    Ok(tokio::select! {
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
    })
}
