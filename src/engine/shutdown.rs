// src/engine/shutdown.rs

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::types::ShutdownCause;

/// The two stop signals, sent together exactly once.
#[derive(Debug)]
pub struct StopSignals {
    pub watcher: oneshot::Sender<()>,
    pub runner: oneshot::Sender<()>,
}

/// Turn shutdown causes into stop signals.
///
/// The first cause sends `stop-watcher` then `stop-runner` and acknowledges
/// on `ack`. The loop keeps draining causes afterwards so repeated Ctrl-C
/// presses are reported instead of piling up.
pub async fn shutdown_listener(
    mut causes: mpsc::Receiver<ShutdownCause>,
    stops: StopSignals,
    ack: oneshot::Sender<()>,
) {
    let mut pending = Some((stops, ack));

    while let Some(cause) = causes.recv().await {
        match pending.take() {
            Some((stops, ack)) => {
                if stops.watcher.send(()).is_err() {
                    debug!("watcher already gone when stop was sent");
                }
                if stops.runner.send(()).is_err() {
                    debug!("runner already gone when stop was sent");
                }
                info!("stopping on {cause}...");
                if ack.send(()).is_err() {
                    debug!("coordinator gone before shutdown acknowledgement");
                }
            }
            None => {
                info!("{cause} received; shutdown already in progress");
            }
        }
    }

    debug!("shutdown listener finished");
}
