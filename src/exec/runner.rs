// src/exec/runner.rs

use std::fmt;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::engine::channels::RunnerEndpoints;
use crate::errors::{Result, WatchptyError};
use crate::exec::backend::{ExitWaiter, KillOutcome, OutputEnd, Session, SessionBackend};
use crate::exec::input::{spawn_input_forwarder, InputForwarder};
use crate::exec::lifecycle::{RunnerCommand, RunnerCore, RunnerEvent, RunnerStatus, RunnerStep};
use crate::exec::output::{spawn_output_copier, spawn_reaper, OutputCopier, OutputSink};
use crate::types::CommandSpec;

/// How long a restart waits for the killed session's output to drain
/// before detaching it. Processes that escaped the group (`setsid`,
/// daemons) can hold the terminal open indefinitely.
pub const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(1);

/// The live child, as far as the runner is concerned.
struct ActiveSession {
    generation: u64,
    pgid: i32,
    input: InputForwarder,
    output: OutputCopier,
    /// `true` once the output copy has been observed to finish.
    output_closed: bool,
    /// Taken once the group has been killed.
    wait: Option<ExitWaiter>,
}

enum Wake {
    Stop,
    Restart,
    Closed(Option<OutputEnd>),
    Input(Vec<u8>),
}

/// Async shell around [`RunnerCore`].
///
/// One loop owns the child for its whole life: restarts are carried out
/// one at a time, and requests that pile up while a restart is in flight
/// are folded into it.
pub struct Runner<B: SessionBackend, S: OutputSink> {
    command: CommandSpec,
    backend: B,
    sink: S,
    core: RunnerCore,
    restart_rx: mpsc::Receiver<()>,
    stop_rx: Option<oneshot::Receiver<()>>,
    stop_pending: bool,
    done_tx: Option<oneshot::Sender<()>>,
    fatal_tx: mpsc::Sender<WatchptyError>,
    input_rx: Option<mpsc::Receiver<Vec<u8>>>,
    status_tx: watch::Sender<RunnerStatus>,
    active: Option<ActiveSession>,
}

impl<B: SessionBackend, S: OutputSink> fmt::Debug for Runner<B, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("command", &self.command)
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<B: SessionBackend + 'static, S: OutputSink> Runner<B, S> {
    pub fn new(command: CommandSpec, backend: B, sink: S, endpoints: RunnerEndpoints) -> Self {
        let RunnerEndpoints {
            restart_rx,
            stop_rx,
            done_tx,
            fatal_tx,
        } = endpoints;
        let core = RunnerCore::new();
        let (status_tx, _) = watch::channel(core.status());

        Self {
            command,
            backend,
            sink,
            core,
            restart_rx,
            stop_rx: Some(stop_rx),
            stop_pending: false,
            done_tx: Some(done_tx),
            fatal_tx,
            input_rx: None,
            status_tx,
            active: None,
        }
    }

    /// Forward terminal input chunks to the active session.
    pub fn with_input(mut self, input_rx: mpsc::Receiver<Vec<u8>>) -> Self {
        self.input_rx = Some(input_rx);
        self
    }

    /// Observe state transitions, generations and process groups.
    pub fn subscribe(&self) -> watch::Receiver<RunnerStatus> {
        self.status_tx.subscribe()
    }

    /// Run until stopped.
    ///
    /// Sends `runner-done` after the final kill. On a fatal error the error
    /// goes to the coordinator instead and `runner-done` is dropped.
    pub async fn run(mut self) {
        match self.run_inner().await {
            Ok(()) => debug!("runner finished"),
            Err(err) => {
                error!(error = %err, "command runner failed");
                if let Some(active) = self.active.take() {
                    if let Err(kill_err) = self.backend.kill_group(active.pgid) {
                        warn!(pgid = active.pgid, error = %kill_err, "cleanup kill failed");
                    }
                    if let Some(wait) = active.wait {
                        if let Err(reap_err) = spawn_reaper(active.generation, wait) {
                            warn!(error = %reap_err, "could not reap command");
                        }
                    }
                }
                if self.fatal_tx.send(err).await.is_err() {
                    debug!("coordinator gone before runner error was reported");
                }
            }
        }
    }

    async fn run_inner(&mut self) -> Result<()> {
        let step = self.core.start();
        if !self.apply(step).await? {
            return Ok(());
        }

        loop {
            let wake = if self.stop_pending {
                Wake::Stop
            } else {
                tokio::select! {
                    () = wait_stop(&mut self.stop_rx) => Wake::Stop,
                    Some(()) = self.restart_rx.recv() => Wake::Restart,
                    exit = wait_closed(&mut self.active) => Wake::Closed(exit),
                    Some(chunk) = recv_input(&mut self.input_rx) => Wake::Input(chunk),
                }
            };

            let event = match wake {
                Wake::Stop => {
                    self.stop_pending = false;
                    debug!("stopping command");
                    RunnerEvent::StopRequested
                }
                Wake::Restart => {
                    debug!("updating command");
                    RunnerEvent::RestartRequested
                }
                Wake::Closed(end) => {
                    debug!(?end, "command output closed");
                    info!("command exited; waiting for changes");
                    RunnerEvent::OutputClosed
                }
                Wake::Input(chunk) => {
                    self.forward_input(chunk);
                    continue;
                }
            };

            let step = self.core.step(event);
            if !self.apply(step).await? {
                break;
            }
        }

        Ok(())
    }

    /// Publish the new state and carry out the step's commands in order.
    async fn apply(&mut self, step: RunnerStep) -> Result<bool> {
        self.publish();

        for command in step.commands {
            if self.stop_pending && command == RunnerCommand::SpawnChild {
                debug!("stop requested during restart; not spawning");
                continue;
            }
            self.execute(command).await?;
        }

        Ok(step.keep_running)
    }

    async fn execute(&mut self, command: RunnerCommand) -> Result<()> {
        match command {
            RunnerCommand::SpawnChild => {
                let coalesced = self.drain_pending_restarts();
                if coalesced > 0 {
                    debug!(coalesced, "folded pending restart requests into this one");
                }
                let pgid = self.spawn_session()?;
                let _ = self.core.step(RunnerEvent::Spawned { pgid });
                self.publish();
            }
            RunnerCommand::KillGroup(pgid) => {
                match self.backend.kill_group(pgid)? {
                    KillOutcome::Killed => debug!(pgid, "killed process group"),
                    KillOutcome::AlreadyExited => warn!(pgid, "process group already exited"),
                }
                self.reap_killed(pgid)?;
            }
            RunnerCommand::AwaitOutputClosed => self.await_output_closed().await,
            RunnerCommand::ReportDone => {
                self.core.finish();
                self.publish();
                if let Some(done_tx) = self.done_tx.take() {
                    if done_tx.send(()).is_err() {
                        debug!("coordinator gone before runner-done");
                    }
                }
            }
        }
        Ok(())
    }

    fn spawn_session(&mut self) -> Result<i32> {
        let generation = self.core.generation();
        info!("running command {:?}", self.command.as_str());

        let Session {
            pid,
            pgid,
            output,
            input,
            wait,
            guard,
        } = self.backend.spawn(&self.command)?;

        let output = spawn_output_copier(generation, output, self.sink.writer(), guard)?;
        let input = spawn_input_forwarder(generation, input)?;

        self.active = Some(ActiveSession {
            generation,
            pgid,
            input,
            output,
            output_closed: false,
            wait: Some(wait),
        });
        debug!(pid, pgid, generation, "command started");
        Ok(pgid)
    }

    /// Wait for the killed session to finish writing, unless a stop
    /// arrives first. After [`OUTPUT_DRAIN_GRACE`] the session is detached:
    /// whatever it writes later never reaches the terminal.
    async fn await_output_closed(&mut self) {
        let drained = tokio::select! {
            res = tokio::time::timeout(OUTPUT_DRAIN_GRACE, wait_closed(&mut self.active)) => res,
            () = wait_stop(&mut self.stop_rx) => {
                self.stop_pending = true;
                return;
            }
        };

        match drained {
            Ok(end) => debug!(?end, "previous command output closed"),
            Err(_) => {
                if let Some(active) = &self.active {
                    warn!(
                        pgid = active.pgid,
                        "previous command still holds the terminal; detaching its output"
                    );
                    active.output.detach();
                }
            }
        }
        self.active = None;
    }

    /// Reap the killed group's leader. Until now its zombie kept the
    /// process group id from being reused.
    fn reap_killed(&mut self, pgid: i32) -> Result<()> {
        let Some(active) = self.active.as_mut() else {
            return Ok(());
        };
        if active.pgid != pgid {
            return Ok(());
        }
        if let Some(wait) = active.wait.take() {
            spawn_reaper(active.generation, wait)?;
        }
        Ok(())
    }

    fn drain_pending_restarts(&mut self) -> usize {
        let mut drained = 0;
        while self.restart_rx.try_recv().is_ok() {
            drained += 1;
        }
        drained
    }

    fn forward_input(&mut self, chunk: Vec<u8>) {
        match &self.active {
            Some(active) => {
                if !active.input.forward(chunk) {
                    debug!("command no longer accepts input");
                }
            }
            None => debug!("no command running; dropping input"),
        }
    }

    fn publish(&self) {
        self.status_tx.send_replace(self.core.status());
    }
}

async fn wait_stop(stop_rx: &mut Option<oneshot::Receiver<()>>) {
    match stop_rx.as_mut() {
        Some(rx) => {
            if rx.await.is_err() {
                debug!("stop-runner sender dropped; stopping");
            }
            *stop_rx = None;
        }
        None => std::future::pending().await,
    }
}

async fn wait_closed(active: &mut Option<ActiveSession>) -> Option<OutputEnd> {
    let Some(active) = active.as_mut().filter(|a| !a.output_closed) else {
        return std::future::pending().await;
    };
    let end = (&mut active.output.closed).await.ok();
    active.output_closed = true;
    end
}

async fn recv_input(input_rx: &mut Option<mpsc::Receiver<Vec<u8>>>) -> Option<Vec<u8>> {
    match input_rx.as_mut() {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
