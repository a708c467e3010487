// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;
pub mod watch;

use tracing::debug;

use crate::config::Settings;
use crate::engine::{spawn_signal_listener, App};
use crate::errors::Result;
use crate::exec::input::spawn_stdin_pump;
use crate::exec::{PtyBackend, StdoutSink};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - the pseudo-terminal backend and stdout sink
/// - the single stdin reader
/// - file watcher, command runner and coordinator
/// - SIGINT / SIGTERM handling
///
/// Returns once a termination signal has been fully drained, or with the
/// first fatal error.
pub async fn run(settings: Settings) -> Result<()> {
    let backend = PtyBackend::new(settings.shell.clone());
    let input = spawn_stdin_pump()?;

    let app = App::new(settings, backend, StdoutSink).with_input(input);
    let _signals = spawn_signal_listener(app.shutdown_sender())?;

    debug!("signal handlers installed");
    app.run().await
}
