//! [`load`]: build a staging set from a repository root.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tiered_core::{Key, VariantKey};
use tracing::{debug, info, warn};

use crate::error::{RepoError, Result};
use crate::registry::ParserRegistry;
use crate::resource::Resource;
use crate::set::StagingSet;

use super::report::LoadResult;

/// Everything one load pass produced.
pub struct LoadOutcome<R> {
    /// Parsed records, not yet overlaid.
    pub staging: StagingSet<R>,
    /// Directories (relative to the root) to watch: every key directory
    /// whose name parses, plus the parent directory of every matched
    /// nested id.
    pub watch_dirs: BTreeSet<PathBuf>,
    /// One entry per skipped directory and per file attempted.
    pub results: Vec<LoadResult>,
}

impl<R> LoadOutcome<R> {
    pub fn loaded_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_loaded()).count()
    }
}

/// Load every registered resource from every key directory under `root`.
///
/// Only failure to enumerate `root` itself is an error; everything below
/// that is reported in [`LoadOutcome::results`] and skipped.
pub fn load<R: Resource>(root: &Path, registry: &ParserRegistry<R>) -> Result<LoadOutcome<R>> {
    let unreadable = |source: io::Error| RepoError::RootUnreadable {
        path: root.to_path_buf(),
        source,
    };

    let mut key_dirs = Vec::new();
    for entry in fs::read_dir(root).map_err(unreadable)? {
        let entry = entry.map_err(unreadable)?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => key_dirs.push((name, path)),
            Err(raw) => {
                warn!(dir = ?raw, "skipping directory with non UTF-8 name");
            }
        }
    }
    // read_dir order is platform-dependent; sort so duplicate resolution is stable.
    key_dirs.sort();

    let mut outcome = LoadOutcome {
        staging: StagingSet::new(),
        watch_dirs: BTreeSet::new(),
        results: Vec::new(),
    };

    for (name, dir) in key_dirs {
        match VariantKey::parse(&name) {
            Ok(variant) => {
                // Watched even when empty, so files added later are seen.
                outcome.watch_dirs.insert(PathBuf::from(&name));
                load_key_dir(&dir, &name, &variant, registry, &mut outcome);
            }
            Err(e) => {
                warn!(dir = %name, error = %e, "skipping directory");
                outcome.results.push(LoadResult::skipped(dir, e.to_string()));
            }
        }
    }

    info!(
        root = %root.display(),
        ids = outcome.staging.len(),
        loaded = outcome.loaded_count(),
        "loaded repository root"
    );
    Ok(outcome)
}

/// Load all registered ids present in one key directory (e.g. `com es _`).
fn load_key_dir<R: Resource>(
    dir: &Path,
    name: &str,
    variant: &VariantKey,
    registry: &ParserRegistry<R>,
    outcome: &mut LoadOutcome<R>,
) {
    for (id, parser) in registry.iter() {
        let path = dir.join(id);
        let meta = match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => continue,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => {
                warn!(dir = %name, file = %id, error = %e, "cannot stat resource, file skipped");
                outcome.results.push(LoadResult::failed(path, e));
                continue;
            }
        };

        let mod_time: DateTime<Utc> = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH).into();
        let key = Key::new(id, path.clone(), mod_time, variant.clone());

        let record = match parser(&key) {
            Ok(record) => record,
            Err(e) => {
                warn!(dir = %name, file = %id, error = %e, "error parsing resource, file skipped");
                outcome.results.push(LoadResult::failed(path, format!("{e:#}")));
                continue;
            }
        };

        if record.id() != id || record.key().variant != *variant {
            warn!(
                dir = %name,
                file = %id,
                returned_id = %record.id(),
                returned_key = %record.key().variant,
                "parser returned a record under a different key, file skipped"
            );
            outcome.results.push(LoadResult::failed(
                path,
                format!("parser returned key {:?} ({})", record.id(), record.key().variant),
            ));
            continue;
        }

        if outcome.staging.insert(record).is_err() {
            warn!(dir = %name, file = %id, key = %variant, "variant already loaded, skipping duplicate");
            outcome
                .results
                .push(LoadResult::skipped(path, format!("duplicate variant {variant}")));
            continue;
        }

        debug!(dir = %name, file = %id, "loaded resource");
        outcome.results.push(LoadResult::loaded(path, id, variant));
        if let Some(parent) = Path::new(id).parent().filter(|p| !p.as_os_str().is_empty()) {
            outcome.watch_dirs.insert(Path::new(name).join(parent));
        }
    }
}
