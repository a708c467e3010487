// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] provides the `SessionBackend` trait the runner talks to,
//!   so tests can swap the pseudo-terminal for a fake.
//! - [`pty`] is the production backend: `<shell> -c <command>` inside a
//!   pseudo-terminal, in its own process group.
//! - [`output`] and [`input`] copy bytes between a session and the
//!   controlling terminal on dedicated threads.
//! - [`lifecycle`] is the pure runner state machine; [`runner`] is the
//!   async shell that drives it.

pub mod backend;
pub mod input;
pub mod lifecycle;
pub mod output;
pub mod pty;
pub mod runner;

pub use backend::{ExitWaiter, KillOutcome, OutputEnd, Session, SessionBackend};
pub use lifecycle::{RunnerCommand, RunnerCore, RunnerEvent, RunnerState, RunnerStatus, RunnerStep};
pub use output::{OutputSink, StdoutSink};
pub use pty::{kill_process_group, PtyBackend};
pub use runner::Runner;
