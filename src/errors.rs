// src/errors.rs

//! Crate-wide error type.
//!
//! Components classify errors where they happen: recoverable ones are
//! logged and dropped, anything that reaches one of these variants is sent
//! to the coordinator as fatal.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchptyError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to open file watcher: {0}")]
    Subscribe(#[source] notify::Error),

    #[error("failed to walk {path:?}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to watch {path:?}: {source}")]
    Register {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("pseudo-terminal error: {0}")]
    Pty(String),

    #[error("failed to kill process group {pgid}: {source}")]
    Kill {
        pgid: i32,
        #[source]
        source: nix::errno::Errno,
    },

    #[error("failed to listen for {signal}: {source}")]
    SignalHandler {
        signal: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} exited without acknowledging shutdown")]
    ComponentLost(&'static str),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, WatchptyError>;
