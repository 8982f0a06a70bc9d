//! Shutdown signal handling.

use std::fmt;
use std::io;
use tokio::signal;

/// The signal that ended the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// Ctrl+C / SIGINT
    Interrupt,
    /// SIGTERM, as sent by service managers
    #[cfg_attr(not(unix), allow(dead_code))]
    Terminate,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownSignal::Interrupt => write!(f, "SIGINT"),
            ShutdownSignal::Terminate => write!(f, "SIGTERM"),
        }
    }
}

/// Resolves with the first shutdown signal the process receives.
///
/// Ctrl+C is watched on every platform; SIGTERM is added on Unix.
#[cfg(unix)]
pub async fn wait_for_shutdown() -> io::Result<ShutdownSignal> {
    let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    tokio::select! {
        interrupted = signal::ctrl_c() => interrupted.map(|()| ShutdownSignal::Interrupt),
        _ = terminate.recv() => Ok(ShutdownSignal::Terminate),
    }
}

/// Resolves once Ctrl+C is received.
#[cfg(not(unix))]
pub async fn wait_for_shutdown() -> io::Result<ShutdownSignal> {
    signal::ctrl_c().await?;
    Ok(ShutdownSignal::Interrupt)
}
