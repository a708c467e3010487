// src/logging.rs

//! Logging setup for `watchpty` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--debug` / `--log-level` CLI flags (already folded into
//!    [`Settings::log_level`](crate::config::Settings))
//! 2. `WATCHPTY_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`
//!
//! Logs are sent to STDERR; STDOUT belongs to the child's terminal output.

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

/// Environment variable consulted when no level is given on the CLI.
pub const LOG_ENV: &str = "WATCHPTY_LOG";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env_value = std::env::var(LOG_ENV).ok();
    let level = resolve_level(cli_level, env_value.as_deref());

    fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;

    Ok(())
}

/// Pick the effective level from the CLI value and the environment value.
///
/// Unparseable environment values fall back to INFO.
pub fn resolve_level(cli_level: Option<LogLevel>, env_value: Option<&str>) -> Level {
    cli_level.map(Level::from).unwrap_or_else(|| {
        env_value
            .and_then(|s| s.trim().parse::<Level>().ok())
            .unwrap_or(Level::INFO)
    })
}
