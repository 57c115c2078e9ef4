//! Hierarchically keyed resource repositories with hot reload.
//!
//! This crate provides:
//! - Directory loader over `<domain> <language> <version>` key directories
//! - Fill-only overlay of the default variant onto every other variant
//! - Five-probe best-match resolution against an atomically published set
//! - Filesystem watching with per-path and cross-path dampers
//! - A [`Coordinator`] owning repositories and their reload pipeline

pub mod coordinator;
pub mod error;
pub mod loader;
pub mod overlay;
pub mod registry;
pub mod repository;
pub mod resource;
pub mod set;
pub mod watch;

pub use coordinator::Coordinator;
pub use error::{RepoError, Result};
pub use registry::{Parser, ParserRegistry};
pub use repository::{ReloadListener, ReloadReport, Repository};
pub use resource::{read_text, Document, Overlay, Resource, TextDocument};
pub use set::ResourceSet;
pub use tiered_core::{Key, RepoConfig, VariantKey};
