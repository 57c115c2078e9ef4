//! Cross-path callback damper.
//!
//! Collects reload requests from every watched path. The first request arms
//! a timer, each later one resets it; when it fires, each distinct
//! repository in the batch is reloaded exactly once.

use std::time::Duration;

use indexmap::IndexSet;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// A settled change on one watched path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadRequest {
    pub repository: String,
    /// Watched directory relative to the repository root ("" for the root).
    pub tag: String,
}

/// Sending half of the callback damper.
#[derive(Debug, Clone)]
pub struct ReloadQueue {
    tx: mpsc::UnboundedSender<ReloadRequest>,
}

impl ReloadQueue {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ReloadRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Returns `false` once the damper has shut down.
    pub fn enqueue(&self, request: ReloadRequest) -> bool {
        self.tx.send(request).is_ok()
    }
}

/// Run the damper until every [`ReloadQueue`] is dropped.
///
/// `execute` is called once per distinct repository id per batch, in the
/// order the repositories were first requested.
pub async fn run_callback_damper<F>(
    mut requests: mpsc::UnboundedReceiver<ReloadRequest>,
    delay: Duration,
    mut execute: F,
) where
    F: FnMut(&str),
{
    while let Some(first) = requests.recv().await {
        let mut batch: IndexSet<String> = IndexSet::new();
        batch.insert(first.repository);
        let mut deadline = Instant::now() + delay;
        let mut closed = false;

        loop {
            tokio::select! {
                next = requests.recv() => match next {
                    Some(request) => {
                        batch.insert(request.repository);
                        deadline = Instant::now() + delay;
                    }
                    None => {
                        closed = true;
                        break;
                    }
                },
                _ = sleep_until(deadline) => break,
            }
        }

        debug!(repositories = batch.len(), "callback damper fired");
        for repository in batch.drain(..) {
            execute(&repository);
        }

        if closed {
            break;
        }
    }
}
