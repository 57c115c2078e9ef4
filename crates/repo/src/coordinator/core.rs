use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tiered_core::{RepoConfig, VariantKey};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::{RepoError, Result};
use crate::registry::ParserRegistry;
use crate::repository::{ManagedRepository, ReloadListener, ReloadReport, Repository, WatchContext};
use crate::resource::Resource;
use crate::watch::{run_callback_damper, ReloadQueue};

struct Shared {
    config: RepoConfig,
    runtime: Handle,
    repositories: RwLock<HashMap<String, Arc<dyn ManagedRepository>>>,
    /// `None` when watching is disabled.
    queue: Option<ReloadQueue>,
}

/// Owns every registered repository and the callback damper task.
///
/// Dropping the coordinator stops the damper and closes all watches;
/// repository handles already handed out keep serving their last set.
pub struct Coordinator {
    shared: Arc<Shared>,
    damper_task: Option<JoinHandle<()>>,
}

impl Coordinator {
    /// Create a coordinator on the current tokio runtime.
    pub fn new(config: RepoConfig) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| RepoError::NoRuntime)?;
        Self::with_runtime(config, runtime)
    }

    /// Create a coordinator whose background work runs on `runtime`.
    pub fn with_runtime(config: RepoConfig, runtime: Handle) -> Result<Self> {
        config.validate()?;

        let (queue, requests) = if config.watch {
            let (queue, requests) = ReloadQueue::channel();
            (Some(queue), Some(requests))
        } else {
            (None, None)
        };
        let callback_damper = config.callback_damper();

        let shared = Arc::new(Shared {
            config,
            runtime: runtime.clone(),
            repositories: RwLock::new(HashMap::new()),
            queue,
        });

        let damper_task = requests.map(|requests| {
            let weak = Arc::downgrade(&shared);
            runtime.spawn(run_callback_damper(requests, callback_damper, move |id: &str| {
                execute_reload(&weak, id)
            }))
        });

        Ok(Self {
            shared,
            damper_task,
        })
    }

    pub fn config(&self) -> &RepoConfig {
        &self.shared.config
    }

    /// Register a repository and perform its initial load.
    ///
    /// Blocks on filesystem I/O. Fails if `repository_id` is taken or the
    /// root cannot be read.
    pub fn register<R: Resource>(
        &self,
        repository_id: &str,
        root: impl AsRef<Path>,
        parsers: ParserRegistry<R>,
    ) -> Result<Arc<Repository<R>>> {
        if self.shared.repositories.read().contains_key(repository_id) {
            return Err(RepoError::AlreadyRegistered(repository_id.to_string()));
        }

        let watch = self.shared.queue.as_ref().map(|queue| WatchContext {
            queue: queue.clone(),
            file_damper: self.shared.config.file_damper(),
        });
        let repo = Arc::new(Repository::open(
            repository_id,
            root.as_ref(),
            parsers,
            self.shared.runtime.clone(),
            watch,
        )?);

        match self.shared.repositories.write().entry(repository_id.to_string()) {
            Entry::Occupied(_) => {
                repo.close_watches();
                return Err(RepoError::AlreadyRegistered(repository_id.to_string()));
            }
            Entry::Vacant(slot) => {
                slot.insert(repo.clone());
            }
        }

        info!(
            repository = %repository_id,
            root = %repo.root().display(),
            parsers = repo.parsers().len(),
            "registered repository"
        );
        Ok(repo)
    }

    /// Register a repository where every id in `ids` shares one parser.
    pub fn register_homogeneous<R, I, S, F>(
        &self,
        repository_id: &str,
        root: impl AsRef<Path>,
        ids: I,
        parser: F,
    ) -> Result<Arc<Repository<R>>>
    where
        R: Resource,
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&tiered_core::Key) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        self.register(repository_id, root, ParserRegistry::homogeneous(ids, parser))
    }

    /// Typed handle to a registered repository.
    pub fn repository<R: Resource>(&self, repository_id: &str) -> Result<Arc<Repository<R>>> {
        let repo = self.managed(repository_id)?;
        repo.into_any()
            .downcast::<Repository<R>>()
            .map_err(|_| RepoError::TypeMismatch {
                id: repository_id.to_string(),
                expected: std::any::type_name::<R>(),
            })
    }

    /// Best match for `resource_id` in `repository_id` under `selector`.
    ///
    /// `None` when nothing matches, including unknown repositories and
    /// repositories holding a different record type.
    pub fn resolve<R: Resource>(
        &self,
        repository_id: &str,
        resource_id: &str,
        selector: &VariantKey,
    ) -> Option<Arc<R>> {
        match self.repository::<R>(repository_id) {
            Ok(repo) => repo.resolve(resource_id, selector),
            Err(e) => {
                debug!(repository = %repository_id, error = %e, "resolve on unavailable repository");
                None
            }
        }
    }

    /// Install the listener called after every successful reload of
    /// `repository_id`. Replaces any previous listener.
    pub fn set_on_reload<F>(&self, repository_id: &str, listener: F) -> Result<()>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let listener: ReloadListener = Arc::new(listener);
        self.managed(repository_id)?.set_on_reload(listener);
        Ok(())
    }

    /// Manual full reload. Blocks on filesystem I/O.
    pub fn reload(&self, repository_id: &str) -> Result<ReloadReport> {
        self.managed(repository_id)?.reload()
    }

    /// Close the repository's watches and forget it.
    pub fn unregister(&self, repository_id: &str) -> Result<()> {
        let repo = self
            .shared
            .repositories
            .write()
            .remove(repository_id)
            .ok_or_else(|| RepoError::RepositoryNotFound(repository_id.to_string()))?;
        repo.close_watches();
        info!(repository = %repository_id, "unregistered repository");
        Ok(())
    }

    /// Registered repository ids, sorted.
    pub fn repository_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.shared.repositories.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Diagnostic dump of every registered repository.
    pub fn summary(&self) -> serde_json::Value {
        let repositories = self.shared.repositories.read();
        let mut ids: Vec<&String> = repositories.keys().collect();
        ids.sort();
        let entries: Vec<serde_json::Value> = ids.into_iter().map(|id| repositories[id].summary()).collect();
        serde_json::json!({
            "profile": self.shared.config.profile_label(),
            "watch": self.shared.config.watch,
            "repositories": entries,
        })
    }

    fn managed(&self, repository_id: &str) -> Result<Arc<dyn ManagedRepository>> {
        self.shared
            .repositories
            .read()
            .get(repository_id)
            .cloned()
            .ok_or_else(|| RepoError::RepositoryNotFound(repository_id.to_string()))
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        if let Some(task) = self.damper_task.take() {
            task.abort();
        }
        for repo in self.shared.repositories.read().values() {
            repo.close_watches();
        }
    }
}

/// Callback damper action: reload one repository on a blocking thread.
fn execute_reload(shared: &Weak<Shared>, repository_id: &str) {
    let Some(shared) = shared.upgrade() else {
        return;
    };
    let Some(repo) = shared.repositories.read().get(repository_id).cloned() else {
        debug!(repository = %repository_id, "reload requested for unregistered repository");
        return;
    };

    let id = repository_id.to_string();
    shared.runtime.spawn_blocking(move || {
        if let Err(e) = repo.reload() {
            debug!(repository = %id, error = %e, "watch-triggered reload failed");
        }
    });
}
