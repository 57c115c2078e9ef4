//! Per-path damper and the delivery loop that feeds it.

use std::path::Path;
use std::time::Duration;

use notify::event::{MetadataKind, ModifyKind};
use notify::{Event, EventKind};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use super::callback::{ReloadQueue, ReloadRequest};

/// Debounce state of one watched path.
///
/// Idle until the first change arms the deadline; every further change
/// pushes it back. [`settle`](Self::settle) returns the path to idle.
#[derive(Debug)]
pub(crate) struct PathDamper {
    delay: Duration,
    deadline: Option<Instant>,
}

impl PathDamper {
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Record a change. Returns `true` if this armed an idle damper.
    pub(crate) fn touch(&mut self) -> bool {
        let was_idle = self.deadline.is_none();
        self.deadline = Some(Instant::now() + self.delay);
        was_idle
    }

    pub(crate) fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub(crate) fn settle(&mut self) {
        self.deadline = None;
    }
}

/// Whether a raw notify event should count as a change.
///
/// Access events and access-time updates are produced by the reload
/// itself (reading files) and would loop forever. Other metadata changes,
/// such as a `touch` moving the mtime, do count.
pub(crate) fn is_relevant(event: &Event) -> bool {
    let kind_matters = !matches!(
        event.kind,
        EventKind::Access(_) | EventKind::Modify(ModifyKind::Metadata(MetadataKind::AccessTime))
    );
    kind_matters && (event.paths.is_empty() || event.paths.iter().any(|p| !is_temp_file(p)))
}

/// Editor swap/backup files and dotfiles.
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

/// Delivery loop for one watched path.
///
/// Runs until the event channel closes (watcher dropped) or the task is
/// aborted. Each settled burst enqueues one copy of `request`.
pub(crate) async fn deliver(
    mut events: mpsc::UnboundedReceiver<notify::Result<Event>>,
    delay: Duration,
    request: ReloadRequest,
    queue: ReloadQueue,
) {
    let mut damper = PathDamper::new(delay);
    loop {
        let deadline = damper.deadline();
        tokio::select! {
            received = events.recv() => match received {
                Some(Ok(event)) => {
                    if is_relevant(&event) && damper.touch() {
                        debug!(repository = %request.repository, tag = %request.tag, "change detected, damper armed");
                    }
                }
                Some(Err(e)) => {
                    warn!(repository = %request.repository, tag = %request.tag, error = %e, "filesystem watcher error");
                }
                None => break,
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                damper.settle();
                debug!(repository = %request.repository, tag = %request.tag, "path settled, requesting reload");
                if !queue.enqueue(request.clone()) {
                    break;
                }
            }
        }
    }
}
