// src/exec/backend.rs

//! Pluggable session backend abstraction.
//!
//! The runner asks a `SessionBackend` to start the command and to kill a
//! process group; it never touches the OS directly. Production uses
//! [`PtyBackend`](super::pty::PtyBackend). Tests provide a backend that
//! simulates processes with in-memory pipes.

use std::any::Any;
use std::fmt;
use std::io::{Read, Write};

use crate::errors::Result;
use crate::types::CommandSpec;

/// Blocking wait for the child to exit; yields its exit code if known.
pub type ExitWaiter = Box<dyn FnOnce() -> std::io::Result<Option<u32>> + Send>;

/// One live invocation of the command.
///
/// `output` reaches end-of-file (or an error) once every process holding
/// the other side has exited. `wait` reaps the leader; until it runs the
/// process group id cannot be reused. `guard` keeps backend resources (e.g. the
/// pseudo-terminal master) alive until the output has been drained.
pub struct Session {
    pub pid: u32,
    pub pgid: i32,
    pub output: Box<dyn Read + Send>,
    pub input: Box<dyn Write + Send>,
    pub wait: ExitWaiter,
    pub guard: Option<Box<dyn Any + Send>>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("pid", &self.pid)
            .field("pgid", &self.pgid)
            .finish_non_exhaustive()
    }
}

/// How a session's output copy ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputEnd {
    pub bytes_copied: u64,
}

/// Result of killing a process group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillOutcome {
    Killed,
    /// The group no longer exists (the command exited on its own).
    AlreadyExited,
}

/// Trait abstracting how the command is started and stopped.
pub trait SessionBackend: Send {
    /// Start the command as the leader of a new process group.
    fn spawn(&mut self, command: &CommandSpec) -> Result<Session>;

    /// Send SIGKILL to every process in the group.
    ///
    /// A group that is already gone is not an error.
    fn kill_group(&mut self, pgid: i32) -> Result<KillOutcome>;
}
