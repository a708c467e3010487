// src/engine/mod.rs

//! Lifecycle coordination for watchpty.
//!
//! This module ties together:
//! - the control signals shared by the watcher and the runner
//! - the shutdown listener that turns SIGINT/SIGTERM (or a fatal error)
//!   into stop signals
//! - the coordinator that waits for every component to confirm
//! - [`App`], which wires a backend, a sink and a watch root into a
//!   running system

pub mod app;
pub mod channels;
pub mod coordinator;
pub mod shutdown;
pub mod signals;

pub use app::App;
pub use channels::{
    control_channels, restart_channel, CoordinatorEndpoints, RestartOutcome, RestartSender,
    RunnerEndpoints, WatcherEndpoints,
};
pub use coordinator::Coordinator;
pub use shutdown::{shutdown_listener, StopSignals};
pub use signals::spawn_signal_listener;
