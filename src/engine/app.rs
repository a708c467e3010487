// src/engine/app.rs

use std::fmt;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::config::Settings;
use crate::engine::channels::{control_channels, WatcherEndpoints};
use crate::engine::coordinator::Coordinator;
use crate::errors::Result;
use crate::exec::{OutputSink, Runner, RunnerStatus, SessionBackend};
use crate::types::ShutdownCause;
use crate::watch::run_watcher;

/// A fully wired watcher + runner + coordinator, not yet started.
///
/// Generic over the session backend and output sink so the same wiring
/// runs against a real pseudo-terminal or a fake.
pub struct App<B: SessionBackend, S: OutputSink> {
    settings: Settings,
    coordinator: Coordinator,
    watcher: WatcherEndpoints,
    runner: Runner<B, S>,
}

impl<B: SessionBackend, S: OutputSink> fmt::Debug for App<B, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<B: SessionBackend + 'static, S: OutputSink> App<B, S> {
    pub fn new(settings: Settings, backend: B, sink: S) -> Self {
        let (watcher, runner_ends, coordinator_ends) = control_channels();
        let runner = Runner::new(settings.command.clone(), backend, sink, runner_ends);
        Self {
            settings,
            coordinator: Coordinator::new(coordinator_ends),
            watcher,
            runner,
        }
    }

    /// Forward terminal input to the running command.
    pub fn with_input(mut self, input_rx: mpsc::Receiver<Vec<u8>>) -> Self {
        self.runner = self.runner.with_input(input_rx);
        self
    }

    /// Where OS signals (or tests) request shutdown.
    pub fn shutdown_sender(&self) -> mpsc::Sender<ShutdownCause> {
        self.coordinator.shutdown_sender()
    }

    pub fn runner_status(&self) -> watch::Receiver<RunnerStatus> {
        self.runner.subscribe()
    }

    /// Start both components and block until the coordinated shutdown has
    /// drained.
    pub async fn run(self) -> Result<()> {
        let App {
            settings,
            coordinator,
            watcher,
            runner,
        } = self;

        info!(
            command = %settings.command,
            root = %settings.watch_root.display(),
            "starting"
        );

        let watcher_task = tokio::spawn(run_watcher(settings.watch_root.clone(), watcher));
        let runner_task = tokio::spawn(runner.run());

        let result = coordinator.run().await;

        // Both have confirmed (or vanished) by now; joining only surfaces panics.
        if let Err(err) = watcher_task.await {
            debug!(error = %err, "watcher task ended abnormally");
        }
        if let Err(err) = runner_task.await {
            debug!(error = %err, "runner task ended abnormally");
        }

        result
    }
}
