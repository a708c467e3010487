// src/engine/signals.rs

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::errors::{Result, WatchptyError};
use crate::types::{ShutdownCause, ShutdownSignal};

/// Forward SIGINT / SIGTERM to the shutdown listener.
///
/// Handlers are installed before this returns, so a failure to install one
/// is a setup error. The spawned task runs for the rest of the process.
pub fn spawn_signal_listener(causes: mpsc::Sender<ShutdownCause>) -> Result<JoinHandle<()>> {
    let mut sigint = signal(SignalKind::interrupt()).map_err(|source| {
        WatchptyError::SignalHandler {
            signal: "SIGINT",
            source,
        }
    })?;
    let mut sigterm = signal(SignalKind::terminate()).map_err(|source| {
        WatchptyError::SignalHandler {
            signal: "SIGTERM",
            source,
        }
    })?;

    Ok(tokio::spawn(async move {
        loop {
            let sig = tokio::select! {
                Some(()) = sigint.recv() => ShutdownSignal::Interrupt,
                Some(()) = sigterm.recv() => ShutdownSignal::Terminate,
                else => break,
            };

            debug!(signal = %sig, "received termination signal");
            if causes.send(ShutdownCause::Signal(sig)).await.is_err() {
                break;
            }
        }
        debug!("signal listener finished");
    }))
}
