// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `watchpty`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "watchpty",
    version,
    about = "Restart a command inside a pseudo-terminal whenever files change.",
    long_about = None
)]
pub struct CliArgs {
    /// Directory tree to watch for modifications.
    ///
    /// Hidden directories (names starting with `.`) are skipped.
    #[arg(short = 'w', long = "watch", value_name = "PATH", default_value = ".")]
    pub watch: PathBuf,

    /// Verbose logging of watch events and lifecycle transitions (formerly `-debug`).
    ///
    /// Shorthand for `--log-level debug`.
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WATCHPTY_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Shell used to run the command (`<shell> -c <command>`).
    #[arg(long, value_name = "PATH", default_value = "/bin/sh")]
    pub shell: PathBuf,

    /// The command to run; arguments are joined with a single space.
    #[arg(
        value_name = "COMMAND",
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
