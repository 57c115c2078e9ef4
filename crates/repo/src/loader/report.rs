//! Per-entry load results.

use std::path::PathBuf;

use tiered_core::VariantKey;

/// Outcome of one directory or file visited by the loader.
#[derive(Debug, Clone)]
pub struct LoadResult {
    /// Key directory or resource file the result is about.
    pub path: PathBuf,
    pub status: LoadStatus,
}

/// Status of a single load attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// Resource parsed and staged.
    Loaded { id: String, variant: VariantKey },
    /// Directory or file ignored (bad key name, duplicate variant).
    Skipped { reason: String },
    /// The file exists but could not be read or parsed.
    Failed { error: String },
}

impl LoadResult {
    pub(super) fn loaded(path: PathBuf, id: &str, variant: &VariantKey) -> Self {
        Self {
            path,
            status: LoadStatus::Loaded {
                id: id.to_string(),
                variant: variant.clone(),
            },
        }
    }

    pub(super) fn skipped(path: PathBuf, reason: impl Into<String>) -> Self {
        Self {
            path,
            status: LoadStatus::Skipped {
                reason: reason.into(),
            },
        }
    }

    pub(super) fn failed(path: PathBuf, error: impl ToString) -> Self {
        Self {
            path,
            status: LoadStatus::Failed {
                error: error.to_string(),
            },
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.status, LoadStatus::Loaded { .. })
    }
}
