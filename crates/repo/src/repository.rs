//! A single registered repository: its root, parsers, and the published
//! resource set.

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use parking_lot::{Mutex, RwLock};
use tiered_core::VariantKey;
use tokio::runtime::Handle;
use tracing::{info, warn};

use crate::error::Result;
use crate::loader::{self, LoadOutcome, LoadResult};
use crate::overlay::overlay_defaults;
use crate::registry::ParserRegistry;
use crate::resource::Resource;
use crate::set::ResourceSet;
use crate::watch::{ReloadQueue, WatchSubscription};

/// Called (on a blocking task) after every successful publish.
pub type ReloadListener = Arc<dyn Fn() + Send + Sync>;

/// What a repository needs to (re)attach its directory watches.
#[derive(Clone)]
pub(crate) struct WatchContext {
    pub(crate) queue: ReloadQueue,
    pub(crate) file_damper: Duration,
}

/// Result of one successful reload.
#[derive(Debug, Clone)]
pub struct ReloadReport {
    pub generation: u64,
    pub merged: usize,
    pub results: Vec<LoadResult>,
}

/// A repository of records of type `R`, loaded from one root directory.
///
/// Readers get lock-free access to the currently published set; reloads
/// build a fresh set and swap it in whole.
pub struct Repository<R: Resource> {
    id: String,
    root: PathBuf,
    parsers: ParserRegistry<R>,
    active: ArcSwap<ResourceSet<R>>,
    /// Serializes reloads; holds the last published generation.
    reload_lock: Mutex<u64>,
    on_reload: RwLock<Option<ReloadListener>>,
    /// Keyed by directory relative to the root ("" for the root).
    watches: Mutex<BTreeMap<PathBuf, WatchSubscription>>,
    runtime: Handle,
    watch: Option<WatchContext>,
}

impl<R: Resource> Repository<R> {
    /// Create and perform the initial load. Fails if the root is unreadable.
    pub(crate) fn open(
        id: &str,
        root: &Path,
        parsers: ParserRegistry<R>,
        runtime: Handle,
        watch: Option<WatchContext>,
    ) -> Result<Self> {
        let repo = Self {
            id: id.to_string(),
            root: root.to_path_buf(),
            parsers,
            active: ArcSwap::from_pointee(ResourceSet::empty()),
            reload_lock: Mutex::new(0),
            on_reload: RwLock::new(None),
            watches: Mutex::new(BTreeMap::new()),
            runtime,
            watch,
        };
        repo.reload()?;
        Ok(repo)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn parsers(&self) -> &ParserRegistry<R> {
        &self.parsers
    }

    /// Best match for `resource_id` under `selector`; `None` if nothing matches.
    pub fn resolve(&self, resource_id: &str, selector: &VariantKey) -> Option<Arc<R>> {
        self.active.load().resolve(resource_id, selector).cloned()
    }

    /// The complete currently published set, for consistent multi-lookups.
    pub fn snapshot(&self) -> Arc<ResourceSet<R>> {
        self.active.load_full()
    }

    pub fn generation(&self) -> u64 {
        self.active.load().generation()
    }

    pub fn set_on_reload(&self, listener: ReloadListener) {
        *self.on_reload.write() = Some(listener);
    }

    pub fn clear_on_reload(&self) {
        *self.on_reload.write() = None;
    }

    /// Full reload: load, overlay, publish.
    ///
    /// On error the previously published set stays active. Blocks on
    /// filesystem I/O and on any reload already in progress.
    pub fn reload(&self) -> Result<ReloadReport> {
        let mut generation = self.reload_lock.lock();

        let LoadOutcome {
            mut staging,
            watch_dirs,
            results,
        } = match loader::load(&self.root, &self.parsers) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(repository = %self.id, error = %e, "reload failed, keeping previous resources");
                return Err(e);
            }
        };

        let merged = overlay_defaults(&mut staging);
        *generation += 1;
        let set = staging.freeze(*generation);
        info!(
            repository = %self.id,
            generation = *generation,
            ids = set.len(),
            resources = set.resource_count(),
            "published resources"
        );
        self.active.store(Arc::new(set));

        self.rewatch(&watch_dirs);
        self.notify_listener();

        Ok(ReloadReport {
            generation: *generation,
            merged,
            results,
        })
    }

    /// Bring the watches in line with `watch_dirs` plus the root.
    ///
    /// Subscriptions for directories still wanted are kept as they are, so
    /// a damper armed during the reload still fires afterwards.
    fn rewatch(&self, watch_dirs: &BTreeSet<PathBuf>) {
        let Some(ctx) = &self.watch else {
            return;
        };

        let mut wanted = watch_dirs.clone();
        wanted.insert(PathBuf::new());

        let mut watches = self.watches.lock();
        watches.retain(|rel, _| wanted.contains(rel));

        for rel in wanted {
            if watches.contains_key(&rel) {
                continue;
            }
            let path = if rel.as_os_str().is_empty() {
                self.root.clone()
            } else {
                self.root.join(&rel)
            };
            let tag = rel.to_string_lossy().into_owned();
            match WatchSubscription::open(
                &self.runtime,
                &path,
                &self.id,
                &tag,
                ctx.file_damper,
                ctx.queue.clone(),
            ) {
                Ok(sub) => {
                    watches.insert(rel, sub);
                }
                Err(e) => {
                    warn!(repository = %self.id, path = %path.display(), error = %e, "error adding watch");
                }
            }
        }
    }

    fn notify_listener(&self) {
        if let Some(listener) = self.on_reload.read().clone() {
            self.runtime.spawn_blocking(move || listener());
        }
    }

    /// Directories currently watched, absolute.
    pub fn watched_paths(&self) -> Vec<PathBuf> {
        self.watches
            .lock()
            .values()
            .map(|w| w.path().to_path_buf())
            .collect()
    }

    /// Close every watch. The published set keeps being served.
    pub fn close_watches(&self) {
        self.watches.lock().clear();
    }

    /// Diagnostic dump of the published set.
    pub fn summary(&self) -> serde_json::Value {
        let set = self.snapshot();
        let resources: serde_json::Map<String, serde_json::Value> = set
            .ids()
            .map(|id| {
                let variants: Vec<serde_json::Value> = set
                    .variants(id)
                    .into_iter()
                    .map(|r| {
                        serde_json::json!({
                            "key": r.key().variant.to_string(),
                            "path": r.key().path,
                            "mod_time": r.key().mod_time,
                        })
                    })
                    .collect();
                (id.to_string(), serde_json::Value::Array(variants))
            })
            .collect();

        serde_json::json!({
            "id": self.id,
            "root": self.root,
            "generation": set.generation(),
            "watches": self.watches.lock().len(),
            "resources": resources,
        })
    }
}

// ── Type-erased handle ────────────────────────────────────────

/// What the coordinator needs from a repository regardless of record type.
pub(crate) trait ManagedRepository: Send + Sync {
    fn reload(&self) -> Result<ReloadReport>;
    fn set_on_reload(&self, listener: ReloadListener);
    fn close_watches(&self);
    fn summary(&self) -> serde_json::Value;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<R: Resource> ManagedRepository for Repository<R> {
    fn reload(&self) -> Result<ReloadReport> {
        Repository::reload(self)
    }

    fn set_on_reload(&self, listener: ReloadListener) {
        Repository::set_on_reload(self, listener)
    }

    fn close_watches(&self) {
        Repository::close_watches(self)
    }

    fn summary(&self) -> serde_json::Value {
        Repository::summary(self)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
