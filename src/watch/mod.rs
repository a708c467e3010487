// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Walking the watch root once to build the watched directory set,
//!   skipping hidden directories.
//! - Registering each directory with a `notify` watcher (non-recursively).
//! - Turning content-write events into restart requests.
//!
//! The watched set is a snapshot: directories created later are not picked
//! up.

pub mod events;
pub mod walk;
pub mod watcher;

pub use events::{handle_event, is_content_write, EventDisposition, WatchStats};
pub use walk::{collect_watch_dirs, is_hidden_dir_name};
pub use watcher::{consume_events, run_watcher};
