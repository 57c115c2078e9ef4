//! Error type for repository registration, loading, and watching.

use std::path::PathBuf;

use tiered_core::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// The repository root could not be enumerated. Fatal for a reload;
    /// the previously published set stays active.
    #[error("cannot read repository root {}: {source}", path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("Repository already registered: {0}")]
    AlreadyRegistered(String),

    /// The repository exists but holds a different record type.
    #[error("Repository {id} does not hold records of type {expected}")]
    TypeMismatch { id: String, expected: &'static str },

    #[error("no tokio runtime available; create the coordinator inside a runtime")]
    NoRuntime,
}

/// Result alias for repository operations.
pub type Result<T> = std::result::Result<T, RepoError>;
