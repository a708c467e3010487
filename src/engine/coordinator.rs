// src/engine/coordinator.rs

//! Lifecycle coordinator.
//!
//! The coordinator owns no component state. It hands stop signals to the
//! shutdown listener, then waits until the runner, the watcher and the
//! listener have all confirmed. The three confirmations are awaited
//! concurrently rather than in a fixed order; any of them may arrive first.

use std::fmt;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::engine::channels::CoordinatorEndpoints;
use crate::engine::shutdown::{shutdown_listener, StopSignals};
use crate::errors::{Result, WatchptyError};
use crate::types::ShutdownCause;

pub struct Coordinator {
    endpoints: CoordinatorEndpoints,
    causes_tx: mpsc::Sender<ShutdownCause>,
    causes_rx: mpsc::Receiver<ShutdownCause>,
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator").finish_non_exhaustive()
    }
}

impl Coordinator {
    pub fn new(endpoints: CoordinatorEndpoints) -> Self {
        let (causes_tx, causes_rx) = mpsc::channel(8);
        Self {
            endpoints,
            causes_tx,
            causes_rx,
        }
    }

    /// Sender used by the OS signal listener (or tests) to request shutdown.
    pub fn shutdown_sender(&self) -> mpsc::Sender<ShutdownCause> {
        self.causes_tx.clone()
    }

    /// Run until both components and the shutdown listener have finished.
    ///
    /// Returns the first fatal error reported by a component, if any.
    pub async fn run(self) -> Result<()> {
        let Coordinator {
            endpoints,
            causes_tx,
            causes_rx,
        } = self;
        let CoordinatorEndpoints {
            stop_watcher,
            stop_runner,
            watcher_done,
            runner_done,
            mut fatal_rx,
        } = endpoints;

        let (ack_tx, ack_rx) = oneshot::channel();
        tokio::spawn(shutdown_listener(
            causes_rx,
            StopSignals {
                watcher: stop_watcher,
                runner: stop_runner,
            },
            ack_tx,
        ));

        let mut runner_done = Some(runner_done);
        let mut watcher_done = Some(watcher_done);
        let mut ack = Some(ack_rx);
        let mut fatal: Option<WatchptyError> = None;

        info!("coordinator started");

        while runner_done.is_some() || watcher_done.is_some() || ack.is_some() {
            // Fatal reports are sent before a component drops its done
            // sender, so polling them first attributes a vanished component
            // to the error that took it down.
            tokio::select! {
                biased;

                Some(err) = fatal_rx.recv() => {
                    error!(error = %err, "fatal error; shutting down");
                    if fatal.is_none() {
                        fatal = Some(err);
                        request_shutdown(&causes_tx, ShutdownCause::Fatal).await;
                    }
                }
                res = wait_for(&mut runner_done) => {
                    runner_done = None;
                    match res {
                        Ok(()) => debug!("runner done"),
                        Err(_) => {
                            component_lost("runner", &mut fatal, &causes_tx).await;
                        }
                    }
                }
                res = wait_for(&mut watcher_done) => {
                    watcher_done = None;
                    match res {
                        Ok(()) => debug!("watcher done"),
                        Err(_) => {
                            component_lost("watcher", &mut fatal, &causes_tx).await;
                        }
                    }
                }
                res = wait_for(&mut ack) => {
                    ack = None;
                    if res.is_err() {
                        debug!("shutdown listener ended without acknowledging");
                    }
                }
            }
        }

        match fatal {
            Some(err) => Err(err),
            None => {
                info!("shutdown complete");
                Ok(())
            }
        }
    }
}

async fn wait_for(
    rx: &mut Option<oneshot::Receiver<()>>,
) -> std::result::Result<(), oneshot::error::RecvError> {
    match rx.as_mut() {
        Some(rx) => rx.await,
        None => std::future::pending().await,
    }
}

async fn request_shutdown(causes_tx: &mpsc::Sender<ShutdownCause>, cause: ShutdownCause) {
    if causes_tx.send(cause).await.is_err() {
        debug!("shutdown listener already finished");
    }
}

/// A component dropped its done signal without reporting why.
async fn component_lost(
    name: &'static str,
    fatal: &mut Option<WatchptyError>,
    causes_tx: &mpsc::Sender<ShutdownCause>,
) {
    if fatal.is_some() {
        debug!(component = name, "component exited after fatal error");
        return;
    }
    error!(component = name, "component exited without acknowledging shutdown");
    *fatal = Some(WatchptyError::ComponentLost(name));
    request_shutdown(causes_tx, ShutdownCause::Fatal).await;
}
