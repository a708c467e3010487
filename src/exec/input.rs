// src/exec/input.rs

use std::io::{ErrorKind, Read, Write};
use std::sync::mpsc as std_mpsc;
use std::thread;

use tokio::sync::mpsc;
use tracing::debug;

use crate::errors::Result;

/// Start the one reader of the controlling terminal's stdin.
///
/// Chunks go to whichever session is active at the time. The thread is
/// detached; it ends on end-of-file, a read error, or when the receiver is
/// dropped and the next chunk arrives.
pub fn spawn_stdin_pump() -> Result<mpsc::Receiver<Vec<u8>>> {
    let (tx, rx) = mpsc::channel(16);

    thread::Builder::new()
        .name("stdin-pump".to_string())
        .spawn(move || {
            let mut stdin = std::io::stdin();
            let mut buf = [0u8; 4096];
            loop {
                match stdin.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.blocking_send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                    Err(err) => {
                        debug!(error = %err, "stdin read failed");
                        break;
                    }
                }
            }
            debug!("stdin pump finished");
        })?;

    Ok(rx)
}

/// Handle to one session's input writer thread.
///
/// Dropping it ends the thread.
#[derive(Debug)]
pub struct InputForwarder {
    tx: std_mpsc::Sender<Vec<u8>>,
}

impl InputForwarder {
    /// Queue a chunk for the session. Returns `false` if the writer thread
    /// has already given up.
    pub fn forward(&self, chunk: Vec<u8>) -> bool {
        self.tx.send(chunk).is_ok()
    }
}

/// Spawn the thread that writes forwarded input into a session.
///
/// Write failures are expected once the command exits and only end the
/// thread.
pub fn spawn_input_forwarder(
    generation: u64,
    mut writer: Box<dyn Write + Send>,
) -> Result<InputForwarder> {
    let (tx, rx) = std_mpsc::channel::<Vec<u8>>();

    thread::Builder::new()
        .name(format!("pty-input-{generation}"))
        .spawn(move || {
            for chunk in rx {
                if let Err(err) = writer.write_all(&chunk).and_then(|()| writer.flush()) {
                    debug!(generation, error = %err, "forwarding input failed");
                    break;
                }
            }
        })?;

    Ok(InputForwarder { tx })
}
