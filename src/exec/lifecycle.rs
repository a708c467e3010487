// src/exec/lifecycle.rs

//! Pure runner state machine.
//!
//! [`RunnerCore`] consumes [`RunnerEvent`]s and answers with the commands
//! the async shell (`exec::runner::Runner`) must carry out. It owns no
//! processes, channels or threads, so every transition can be tested
//! directly.
//!
//! ```text
//! Starting -> Running -> Exited
//!    ^          |          |
//!    |          v          v
//!    +----- Restarting <---+        Running | Exited -> Stopping -> Stopped
//! ```

/// Where the runner is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    /// A child is being spawned.
    Starting,
    /// A child is running and its output is being copied.
    Running,
    /// The child exited on its own; waiting for a restart or stop.
    Exited,
    /// The old group is being killed before a fresh start.
    Restarting,
    /// The group is being killed for good.
    Stopping,
    /// Terminal; `runner-done` has been reported.
    Stopped,
}

/// Inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerEvent {
    Spawned { pgid: i32 },
    /// The current session's output reached end-of-file.
    OutputClosed,
    RestartRequested,
    StopRequested,
}

/// What the shell must do, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerCommand {
    SpawnChild,
    KillGroup(i32),
    /// Wait until the killed session's output copy has finished, or detach
    /// it after a grace period.
    AwaitOutputClosed,
    ReportDone,
}

/// Commands for one event, plus whether the runner keeps going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerStep {
    pub commands: Vec<RunnerCommand>,
    pub keep_running: bool,
}

impl RunnerStep {
    fn run(commands: Vec<RunnerCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    fn idle() -> Self {
        Self::run(Vec::new())
    }
}

/// Snapshot published to observers after every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerStatus {
    pub state: RunnerState,
    /// Number of children started so far; the current one has this number.
    pub generation: u64,
    pub pgid: Option<i32>,
}

#[derive(Debug)]
pub struct RunnerCore {
    state: RunnerState,
    generation: u64,
    pgid: Option<i32>,
    output_open: bool,
}

impl Default for RunnerCore {
    fn default() -> Self {
        Self::new()
    }
}

impl RunnerCore {
    pub fn new() -> Self {
        Self {
            state: RunnerState::Starting,
            generation: 0,
            pgid: None,
            output_open: false,
        }
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn status(&self) -> RunnerStatus {
        RunnerStatus {
            state: self.state,
            generation: self.generation,
            pgid: self.pgid,
        }
    }

    /// First step: spawn generation 1.
    pub fn start(&mut self) -> RunnerStep {
        self.state = RunnerState::Starting;
        self.generation = 1;
        RunnerStep::run(vec![RunnerCommand::SpawnChild])
    }

    /// Handle a single event.
    pub fn step(&mut self, event: RunnerEvent) -> RunnerStep {
        match event {
            RunnerEvent::Spawned { pgid } => {
                if matches!(self.state, RunnerState::Starting | RunnerState::Restarting) {
                    self.state = RunnerState::Running;
                    self.pgid = Some(pgid);
                    self.output_open = true;
                }
                RunnerStep::idle()
            }

            RunnerEvent::OutputClosed => {
                self.output_open = false;
                if self.state == RunnerState::Running {
                    self.state = RunnerState::Exited;
                }
                RunnerStep::idle()
            }

            RunnerEvent::RestartRequested => match self.state {
                RunnerState::Running | RunnerState::Exited => {
                    self.state = RunnerState::Restarting;
                    let mut commands = Vec::with_capacity(3);
                    if let Some(pgid) = self.pgid {
                        commands.push(RunnerCommand::KillGroup(pgid));
                    }
                    if self.output_open {
                        commands.push(RunnerCommand::AwaitOutputClosed);
                        self.output_open = false;
                    }
                    self.generation += 1;
                    commands.push(RunnerCommand::SpawnChild);
                    RunnerStep::run(commands)
                }
                // Already (re)starting, or on the way out: fold into that.
                _ => RunnerStep::idle(),
            },

            RunnerEvent::StopRequested => match self.state {
                RunnerState::Stopping | RunnerState::Stopped => RunnerStep {
                    commands: Vec::new(),
                    keep_running: false,
                },
                _ => {
                    self.state = RunnerState::Stopping;
                    let mut commands = Vec::with_capacity(2);
                    if let Some(pgid) = self.pgid {
                        commands.push(RunnerCommand::KillGroup(pgid));
                    }
                    commands.push(RunnerCommand::ReportDone);
                    RunnerStep {
                        commands,
                        keep_running: false,
                    }
                }
            },
        }
    }

    /// Mark the stop sequence as carried out.
    pub fn finish(&mut self) {
        if self.state == RunnerState::Stopping {
            self.state = RunnerState::Stopped;
        }
    }
}
