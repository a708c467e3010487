// src/watch/watcher.rs

use std::path::PathBuf;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::engine::channels::{RestartSender, WatcherEndpoints};
use crate::errors::{Result, WatchptyError};
use crate::watch::events::{handle_event, WatchStats};
use crate::watch::walk::collect_watch_dirs;

/// Run the filesystem watcher until told to stop.
///
/// Sends `watcher-done` after the subscription is closed. A setup failure
/// is reported on the fatal channel instead, and `watcher-done` is dropped.
pub async fn run_watcher(root: PathBuf, endpoints: WatcherEndpoints) {
    let WatcherEndpoints {
        restart,
        stop_rx,
        done_tx,
        fatal_tx,
    } = endpoints;

    match watch(root, &restart, stop_rx).await {
        Ok(stats) => {
            debug!(?stats, "stopping watch");
            if done_tx.send(()).is_err() {
                debug!("coordinator gone before watcher-done");
            }
        }
        Err(err) => {
            error!(error = %err, "file watcher failed");
            let _ = fatal_tx.send(err).await;
        }
    }
}

async fn watch(
    root: PathBuf,
    restart: &RestartSender,
    stop_rx: oneshot::Receiver<()>,
) -> Result<WatchStats> {
    // Channel from the blocking notify callback into the async world.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            // The receiver only goes away during shutdown.
            let _ = event_tx.send(res);
        },
        Config::default(),
    )
    .map_err(WatchptyError::Subscribe)?;

    let walk_root = root.clone();
    let dirs = tokio::task::spawn_blocking(move || collect_watch_dirs(&walk_root))
        .await
        .map_err(anyhow::Error::from)??;

    for dir in &dirs {
        info!("watching {}", dir.display());
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|source| WatchptyError::Register {
                path: dir.clone(),
                source,
            })?;
    }

    info!(root = %root.display(), dirs = dirs.len(), "file watcher started");

    let stats = consume_events(event_rx, restart, stop_rx).await;

    // Dropping the watcher closes the subscription.
    drop(watcher);
    Ok(stats)
}

/// Consume subscription items until `stop_rx` fires (or its sender is
/// dropped).
///
/// Events and errors share one channel, so they are serviced in arrival
/// order. A closed event channel just leaves the loop waiting for stop.
pub async fn consume_events(
    mut events: mpsc::UnboundedReceiver<notify::Result<Event>>,
    restart: &RestartSender,
    mut stop_rx: oneshot::Receiver<()>,
) -> WatchStats {
    let mut stats = WatchStats::default();

    loop {
        tokio::select! {
            res = &mut stop_rx => {
                if res.is_err() {
                    debug!("stop-watcher sender dropped; stopping");
                }
                break;
            }
            Some(res) = events.recv() => {
                handle_event(res, restart, &mut stats);
            }
        }
    }

    stats
}
