//! Registry of repositories and owner of the shared callback damper.
//!
//! A [`Coordinator`] is an explicit object: create one per process (or per
//! test), register repositories on it, and resolve through it or through
//! the [`Repository`](crate::repository::Repository) handles it returns.

mod core;


pub use self::core::Coordinator;
