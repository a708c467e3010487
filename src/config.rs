// src/config.rs

//! Immutable runtime settings.
//!
//! There is no config file: [`Settings`] is derived from [`CliArgs`] once,
//! validated, and handed to each component when it is constructed.

use std::path::PathBuf;

use crate::cli::{CliArgs, LogLevel};
use crate::errors::{Result, WatchptyError};
use crate::types::CommandSpec;

#[derive(Debug, Clone)]
pub struct Settings {
    pub command: CommandSpec,
    pub watch_root: PathBuf,
    pub shell: PathBuf,
    /// `None` defers to `WATCHPTY_LOG` / the default level.
    pub log_level: Option<LogLevel>,
}

impl Settings {
    /// Validate CLI arguments into settings.
    ///
    /// Fails if the command is blank or the watch root is not a directory.
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let command = CommandSpec::from_args(&args.command);
        if command.is_empty() {
            return Err(WatchptyError::ConfigError(
                "no command given to run".to_string(),
            ));
        }

        if !args.watch.is_dir() {
            return Err(WatchptyError::ConfigError(format!(
                "watch root {:?} is not a directory",
                args.watch
            )));
        }

        let log_level = if args.debug {
            Some(LogLevel::Debug)
        } else {
            args.log_level
        };

        Ok(Settings {
            command,
            watch_root: args.watch.clone(),
            shell: args.shell.clone(),
            log_level,
        })
    }

    /// Settings for the given command and root, with default shell and
    /// log level. Used by embedders and tests that skip the CLI.
    pub fn new(command: impl Into<CommandSpec>, watch_root: impl Into<PathBuf>) -> Self {
        Settings {
            command: command.into(),
            watch_root: watch_root.into(),
            shell: PathBuf::from("/bin/sh"),
            log_level: None,
        }
    }
}
