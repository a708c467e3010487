// src/exec/output.rs

use std::any::Any;
use std::io::{ErrorKind, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use tokio::sync::oneshot;
use tracing::debug;

use crate::errors::Result;
use crate::exec::backend::{ExitWaiter, OutputEnd};

/// Where child output goes.
///
/// Each session asks for its own writer; production hands out stdout.
pub trait OutputSink: Send + Sync + 'static {
    fn writer(&self) -> Box<dyn Write + Send>;
}

/// The controlling terminal's standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn writer(&self) -> Box<dyn Write + Send> {
        Box::new(std::io::stdout())
    }
}

/// Copy `reader` into `writer` until end-of-file or an error, flushing
/// after every chunk. Returns the number of bytes copied.
///
/// A read error ends the copy quietly: on Linux the pseudo-terminal master
/// reports `EIO` once the child side has closed.
pub fn copy_output(reader: &mut dyn Read, writer: &mut dyn Write) -> u64 {
    copy_output_until(reader, writer, &AtomicBool::new(false))
}

/// Like [`copy_output`], but stops before writing anything once `detached`
/// is set.
pub fn copy_output_until(
    reader: &mut dyn Read,
    writer: &mut dyn Write,
    detached: &AtomicBool,
) -> u64 {
    let mut buf = [0u8; 8192];
    let mut total = 0u64;

    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if detached.load(Ordering::Acquire) {
                    debug!(dropped = n, "output detached from terminal");
                    break;
                }
                if let Err(err) = writer.write_all(&buf[..n]).and_then(|()| writer.flush()) {
                    debug!(error = %err, "terminal output write failed");
                    break;
                }
                total += n as u64;
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => {
                debug!(error = %err, "command output closed");
                break;
            }
        }
    }

    total
}

/// Handle to one session's output thread.
#[derive(Debug)]
pub struct OutputCopier {
    pub closed: oneshot::Receiver<OutputEnd>,
    detached: Arc<AtomicBool>,
}

impl OutputCopier {
    /// Stop forwarding this session's output. Bytes the thread reads from
    /// now on are dropped and the thread ends.
    pub fn detach(&self) {
        self.detached.store(true, Ordering::Release);
    }
}

/// Spawn the thread that drains one session's output into `sink`.
///
/// The thread does not reap the child: the session's [`ExitWaiter`] stays
/// with the caller (see [`spawn_reaper`]) so the process group id remains
/// reserved until the group has been killed.
pub fn spawn_output_copier(
    generation: u64,
    mut output: Box<dyn Read + Send>,
    mut sink: Box<dyn Write + Send>,
    guard: Option<Box<dyn Any + Send>>,
) -> Result<OutputCopier> {
    let (closed_tx, closed) = oneshot::channel();
    let detached = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&detached);

    thread::Builder::new()
        .name(format!("pty-output-{generation}"))
        .spawn(move || {
            let bytes_copied = copy_output_until(&mut output, &mut sink, &flag);
            drop(guard);

            debug!(generation, bytes_copied, "output copy finished");
            let _ = closed_tx.send(OutputEnd { bytes_copied });
        })?;

    Ok(OutputCopier { closed, detached })
}

/// Wait for a killed session's leader on a detached thread and log how it
/// ended.
pub fn spawn_reaper(generation: u64, wait: ExitWaiter) -> Result<()> {
    thread::Builder::new()
        .name(format!("pty-reap-{generation}"))
        .spawn(move || match wait() {
            Ok(code) => debug!(generation, ?code, "command reaped"),
            Err(err) => debug!(generation, error = %err, "waiting for command failed"),
        })?;

    Ok(())
}
