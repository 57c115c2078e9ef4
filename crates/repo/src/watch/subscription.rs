//! One `notify` watch on one directory, plus its delivery task.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::Result;

use super::callback::{ReloadQueue, ReloadRequest};
use super::damper::deliver;

/// A live directory watch owned by a repository.
///
/// Dropping (or [`close`](Self::close)-ing) releases the filesystem
/// subscription and aborts the delivery task; an armed damper is abandoned.
pub struct WatchSubscription {
    path: PathBuf,
    request: ReloadRequest,
    watcher: Option<RecommendedWatcher>,
    task: JoinHandle<()>,
}

impl WatchSubscription {
    /// Watch `path` (non-recursively) and deliver settled changes to `queue`.
    pub fn open(
        runtime: &Handle,
        path: &Path,
        repository: &str,
        tag: &str,
        delay: Duration,
        queue: ReloadQueue,
    ) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let _ = tx.send(res);
        })?;
        watcher.watch(path, RecursiveMode::NonRecursive)?;

        let request = ReloadRequest {
            repository: repository.to_string(),
            tag: tag.to_string(),
        };
        let task = runtime.spawn(deliver(rx, delay, request.clone(), queue));

        debug!(repository = %repository, path = %path.display(), "watching directory");
        Ok(Self {
            path: path.to_path_buf(),
            request,
            watcher: Some(watcher),
            task,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn repository(&self) -> &str {
        &self.request.repository
    }

    /// Watched directory relative to the repository root ("" for the root).
    pub fn tag(&self) -> &str {
        &self.request.tag
    }

    /// Same as dropping the subscription.
    pub fn close(self) {}
}

impl Drop for WatchSubscription {
    fn drop(&mut self) {
        self.task.abort();
        self.watcher.take();
        debug!(repository = %self.request.repository, path = %self.path.display(), "closed watch");
    }
}
