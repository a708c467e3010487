use std::collections::HashMap;
use std::io::{self, Write};
use std::os::unix::net::UnixStream;
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};

use watchpty::errors::{Result, WatchptyError};
use watchpty::exec::{ExitWaiter, KillOutcome, Session, SessionBackend};
use watchpty::types::CommandSpec;

/// Exit code reported for a killed fake process (128 + SIGKILL).
pub const KILLED_EXIT_CODE: u32 = 137;

struct FakeProcess {
    /// Dropping the peer end gives the runner's output copier EOF.
    _peer: UnixStream,
    exit_tx: std_mpsc::Sender<u32>,
}

#[derive(Default)]
struct FakeState {
    spawn_count: i32,
    greeting: Vec<u8>,
    spawned: Vec<(String, i32)>,
    live: HashMap<i32, FakeProcess>,
    kills: Vec<(i32, KillOutcome)>,
    input: HashMap<i32, Vec<u8>>,
    reaped: Vec<i32>,
    /// Output handles held by processes that escaped their group.
    strays: HashMap<i32, UnixStream>,
    leave_strays: bool,
    fail_kills: bool,
    fail_spawns: bool,
}

/// A session backend that:
/// - "spawns" a process by handing out one end of a socket pair
/// - writes a fixed greeting as the process's output
/// - "kills" a group by closing the other end and reporting exit 137
/// - records when a process is reaped through its exit waiter
///
/// Clones share state, so a test can keep one and give one to the runner.
#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every spawned process writes `greeting` as soon as it starts.
    pub fn with_output(self, greeting: &str) -> Self {
        self.state.lock().unwrap().greeting = greeting.as_bytes().to_vec();
        self
    }

    /// Every spawned process leaves behind a stray that keeps its output
    /// open after the group is killed, like a `setsid` background job.
    pub fn with_stray_process(self) -> Self {
        self.state.lock().unwrap().leave_strays = true;
        self
    }

    /// Every kill fails with an error that is not "no such process".
    pub fn failing_kills(self) -> Self {
        self.state.lock().unwrap().fail_kills = true;
        self
    }

    /// Every spawn fails as if no pseudo-terminal could be allocated.
    pub fn failing_spawns(self) -> Self {
        self.state.lock().unwrap().fail_spawns = true;
        self
    }

    /// `(command, pgid)` for every spawn, in order.
    pub fn spawned(&self) -> Vec<(String, i32)> {
        self.state.lock().unwrap().spawned.clone()
    }

    pub fn spawned_pgids(&self) -> Vec<i32> {
        self.spawned().into_iter().map(|(_, pgid)| pgid).collect()
    }

    pub fn kills(&self) -> Vec<(i32, KillOutcome)> {
        self.state.lock().unwrap().kills.clone()
    }

    pub fn is_alive(&self, pgid: i32) -> bool {
        self.state.lock().unwrap().live.contains_key(&pgid)
    }

    /// Make a process exit on its own with `code`.
    pub fn exit(&self, pgid: i32, code: u32) {
        let process = self.state.lock().unwrap().live.remove(&pgid);
        if let Some(process) = process {
            let _ = process.exit_tx.send(code);
        }
    }

    /// Process groups whose leader has been reaped, in order.
    pub fn reaped(&self) -> Vec<i32> {
        self.state.lock().unwrap().reaped.clone()
    }

    /// Write to the output of the stray left behind by `pgid`.
    pub fn write_stray(&self, pgid: i32, text: &str) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        match state.strays.get_mut(&pgid) {
            Some(stray) => stray.write_all(text.as_bytes()),
            None => Err(io::Error::new(io::ErrorKind::NotFound, "no stray process")),
        }
    }

    /// Let the stray left behind by `pgid` exit, closing its output.
    pub fn end_stray(&self, pgid: i32) {
        self.state.lock().unwrap().strays.remove(&pgid);
    }

    /// Everything forwarded to the process's input so far.
    pub fn input_for(&self, pgid: i32) -> String {
        let state = self.state.lock().unwrap();
        state
            .input
            .get(&pgid)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default()
    }
}

impl SessionBackend for FakeBackend {
    fn spawn(&mut self, command: &CommandSpec) -> Result<Session> {
        let mut state = self.state.lock().unwrap();
        if state.fail_spawns {
            return Err(WatchptyError::Pty("fake pseudo-terminal unavailable".to_string()));
        }

        state.spawn_count += 1;
        let pgid = 1000 + state.spawn_count;

        let (output, mut peer) = UnixStream::pair()?;
        peer.write_all(&state.greeting)?;

        if state.leave_strays {
            let stray = peer.try_clone()?;
            state.strays.insert(pgid, stray);
        }

        let (exit_tx, exit_rx) = std_mpsc::channel();
        state.live.insert(pgid, FakeProcess { _peer: peer, exit_tx });
        state.spawned.push((command.to_string(), pgid));

        let input = FakeInput {
            pgid,
            state: Arc::clone(&self.state),
        };
        let reap_state = Arc::clone(&self.state);
        let wait: ExitWaiter = Box::new(move || {
            let code = exit_rx.recv().ok();
            reap_state.lock().unwrap().reaped.push(pgid);
            Ok(code)
        });

        Ok(Session {
            pid: pgid as u32,
            pgid,
            output: Box::new(output),
            input: Box::new(input),
            wait,
            guard: None,
        })
    }

    fn kill_group(&mut self, pgid: i32) -> Result<KillOutcome> {
        let mut state = self.state.lock().unwrap();
        if state.fail_kills {
            return Err(WatchptyError::Other(anyhow::anyhow!(
                "fake kill of process group {pgid} refused"
            )));
        }

        let outcome = match state.live.remove(&pgid) {
            Some(process) => {
                let _ = process.exit_tx.send(KILLED_EXIT_CODE);
                KillOutcome::Killed
            }
            None => KillOutcome::AlreadyExited,
        };
        state.kills.push((pgid, outcome));
        Ok(outcome)
    }
}

struct FakeInput {
    pgid: i32,
    state: Arc<Mutex<FakeState>>,
}

impl Write for FakeInput {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        state
            .input
            .entry(self.pgid)
            .or_default()
            .extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
