// src/watch/events.rs

//! Classification of raw `notify` events.

use notify::event::ModifyKind;
use notify::{Event, EventKind};
use tracing::{debug, info, warn};

use crate::engine::channels::{RestartOutcome, RestartSender};

/// Whether the event kind means "file content written".
///
/// Backends that cannot tell what kind of modification happened report
/// `Modify(Any)`; that is treated as a write too.
pub fn is_content_write(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any)
    )
}

/// What the watcher did with one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    Restart(RestartOutcome),
    Ignored,
    Error,
}

/// Running totals kept by the event loop, logged when it ends.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WatchStats {
    pub restarts_sent: usize,
    pub restarts_coalesced: usize,
    pub ignored: usize,
    pub errors: usize,
}

/// Handle one item from the subscription.
///
/// Writes request a restart. Everything else, subscription errors included,
/// is only logged at debug level.
pub fn handle_event(
    res: notify::Result<Event>,
    restart: &RestartSender,
    stats: &mut WatchStats,
) -> EventDisposition {
    match res {
        Err(err) => {
            debug!(error = %err, "file watch error");
            stats.errors += 1;
            EventDisposition::Error
        }
        Ok(event) if is_content_write(&event.kind) => {
            for path in &event.paths {
                info!("modified file: {}", path.display());
            }

            let outcome = restart.notify();
            match outcome {
                RestartOutcome::Sent => stats.restarts_sent += 1,
                RestartOutcome::Coalesced => {
                    debug!("restart already pending; coalescing");
                    stats.restarts_coalesced += 1;
                }
                RestartOutcome::Closed => warn!("runner no longer accepts restarts"),
            }
            EventDisposition::Restart(outcome)
        }
        Ok(event) => {
            debug!(?event, "event");
            stats.ignored += 1;
            EventDisposition::Ignored
        }
    }
}
