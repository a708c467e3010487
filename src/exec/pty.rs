// src/exec/pty.rs

use std::path::PathBuf;

use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use portable_pty::{native_pty_system, CommandBuilder, PtySize};
use tracing::debug;

use crate::errors::{Result, WatchptyError};
use crate::exec::backend::{ExitWaiter, KillOutcome, Session, SessionBackend};
use crate::types::CommandSpec;

/// Production backend: runs `<shell> -c <command>` in a fresh
/// pseudo-terminal.
///
/// The child becomes a session leader on the terminal's slave side, so its
/// process group id equals its pid.
#[derive(Debug, Clone)]
pub struct PtyBackend {
    shell: PathBuf,
    cwd: Option<PathBuf>,
    size: PtySize,
}

impl PtyBackend {
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
            cwd: None,
            size: PtySize::default(),
        }
    }

    /// Run the command in `cwd` instead of the current directory.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

impl SessionBackend for PtyBackend {
    fn spawn(&mut self, command: &CommandSpec) -> Result<Session> {
        let pair = native_pty_system()
            .openpty(self.size)
            .map_err(|e| pty_error("allocating pseudo-terminal", e))?;

        let output = pair
            .master
            .try_clone_reader()
            .map_err(|e| pty_error("opening pseudo-terminal reader", e))?;
        let input = pair
            .master
            .take_writer()
            .map_err(|e| pty_error("opening pseudo-terminal writer", e))?;

        let cwd = match &self.cwd {
            Some(cwd) => cwd.clone(),
            None => std::env::current_dir()?,
        };

        let mut cmd = CommandBuilder::new(&self.shell);
        cmd.arg("-c");
        cmd.arg(command.as_str());
        cmd.cwd(cwd);

        let mut child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| pty_error("spawning command", e))?;
        // Only the child may hold the slave side, or the reader never sees EOF.
        drop(pair.slave);

        let pid = child.process_id().ok_or_else(|| {
            WatchptyError::Pty("spawned command has no process id".to_string())
        })?;
        debug!(pid, shell = %self.shell.display(), "spawned command in pseudo-terminal");

        let wait: ExitWaiter = Box::new(move || {
            child
                .wait()
                .map(|status| Some(status.exit_code()))
        });

        Ok(Session {
            pid,
            pgid: pid as i32,
            output,
            input,
            wait,
            guard: Some(Box::new(pair.master)),
        })
    }

    fn kill_group(&mut self, pgid: i32) -> Result<KillOutcome> {
        kill_process_group(pgid)
    }
}

/// SIGKILL a whole process group.
///
/// `ESRCH` (no such group) means the command already exited and is
/// reported as [`KillOutcome::AlreadyExited`]; every other failure is an
/// error.
pub fn kill_process_group(pgid: i32) -> Result<KillOutcome> {
    match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        Ok(()) => Ok(KillOutcome::Killed),
        Err(Errno::ESRCH) => Ok(KillOutcome::AlreadyExited),
        Err(source) => Err(WatchptyError::Kill { pgid, source }),
    }
}

fn pty_error(context: &str, err: anyhow::Error) -> WatchptyError {
    WatchptyError::Pty(format!("{context}: {err:#}"))
}
