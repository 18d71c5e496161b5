//! Runs the console session until it ends or the process is told to stop.

use anyhow::{Context, Result};
use std::fmt;
use std::future::Future;
use tokio::signal;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `quit` was typed or input reached end of file.
    SessionEnded,
    /// A termination signal arrived, named as the OS reports it.
    Signal(&'static str),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::SessionEnded => f.write_str("console closed"),
            StopReason::Signal(name) => write!(f, "received {name}"),
        }
    }
}

#[cfg(unix)]
async fn termination_signal() -> Result<&'static str> {
    use signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let name = tokio::select! {
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
    };
    Ok(name)
}

#[cfg(not(unix))]
async fn termination_signal() -> Result<&'static str> {
    signal::ctrl_c().await?;
    Ok("Ctrl+C")
}

/// Drives `session` until it finishes or SIGINT/SIGTERM (Ctrl+C off Unix)
/// arrives, whichever comes first. The session is dropped mid-command on a
/// signal.
pub async fn run_until_stopped<F>(session: F) -> Result<StopReason>
where
    F: Future<Output = Result<()>>,
{
    tokio::select! {
        result = session => {
            result.context("Console input failed")?;
            Ok(StopReason::SessionEnded)
        }
        signal = termination_signal() => {
            let name = signal.context("Failed to install signal handlers")?;
            info!("📡 Received {}", name);
            Ok(StopReason::Signal(name))
        }
    }
}
