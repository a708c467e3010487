// src/engine/channels.rs

//! The control signals shared by the watcher, the runner and the
//! coordinator.
//!
//! - `restart` is a single-slot queue: a request that arrives while another
//!   is still pending is coalesced into it.
//! - `stop-*`, `*-done` and the shutdown acknowledgement are one-shot.
//! - fatal errors flow from the components to the coordinator.

use tokio::sync::{mpsc, oneshot};

use crate::errors::WatchptyError;

/// Result of asking the runner to restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartOutcome {
    /// The request occupies the slot.
    Sent,
    /// A request was already pending; this one folds into it.
    Coalesced,
    /// The runner is gone.
    Closed,
}

/// Producer side of the `restart` signal.
#[derive(Debug, Clone)]
pub struct RestartSender {
    tx: mpsc::Sender<()>,
}

impl RestartSender {
    /// Request a restart without blocking.
    pub fn notify(&self) -> RestartOutcome {
        match self.tx.try_send(()) {
            Ok(()) => RestartOutcome::Sent,
            Err(mpsc::error::TrySendError::Full(())) => RestartOutcome::Coalesced,
            Err(mpsc::error::TrySendError::Closed(())) => RestartOutcome::Closed,
        }
    }
}

/// Create a `restart` signal pair.
pub fn restart_channel() -> (RestartSender, mpsc::Receiver<()>) {
    let (tx, rx) = mpsc::channel(1);
    (RestartSender { tx }, rx)
}

/// Everything the filesystem watcher needs to talk to the others.
#[derive(Debug)]
pub struct WatcherEndpoints {
    pub restart: RestartSender,
    pub stop_rx: oneshot::Receiver<()>,
    pub done_tx: oneshot::Sender<()>,
    pub fatal_tx: mpsc::Sender<WatchptyError>,
}

/// Everything the process runner needs to talk to the others.
#[derive(Debug)]
pub struct RunnerEndpoints {
    pub restart_rx: mpsc::Receiver<()>,
    pub stop_rx: oneshot::Receiver<()>,
    pub done_tx: oneshot::Sender<()>,
    pub fatal_tx: mpsc::Sender<WatchptyError>,
}

/// The coordinator's ends of the stop / done / fatal signals.
#[derive(Debug)]
pub struct CoordinatorEndpoints {
    pub stop_watcher: oneshot::Sender<()>,
    pub stop_runner: oneshot::Sender<()>,
    pub watcher_done: oneshot::Receiver<()>,
    pub runner_done: oneshot::Receiver<()>,
    pub fatal_rx: mpsc::Receiver<WatchptyError>,
}

/// Build every control signal and split the ends by owner.
pub fn control_channels() -> (WatcherEndpoints, RunnerEndpoints, CoordinatorEndpoints) {
    let (restart, restart_rx) = restart_channel();
    let (stop_watcher, watcher_stop_rx) = oneshot::channel();
    let (stop_runner, runner_stop_rx) = oneshot::channel();
    let (watcher_done_tx, watcher_done) = oneshot::channel();
    let (runner_done_tx, runner_done) = oneshot::channel();
    let (fatal_tx, fatal_rx) = mpsc::channel(4);

    let watcher = WatcherEndpoints {
        restart,
        stop_rx: watcher_stop_rx,
        done_tx: watcher_done_tx,
        fatal_tx: fatal_tx.clone(),
    };
    let runner = RunnerEndpoints {
        restart_rx,
        stop_rx: runner_stop_rx,
        done_tx: runner_done_tx,
        fatal_tx,
    };
    let coordinator = CoordinatorEndpoints {
        stop_watcher,
        stop_runner,
        watcher_done,
        runner_done,
        fatal_rx,
    };

    (watcher, runner, coordinator)
}
