//! Directory loader: one pass over a repository root.
//!
//! Each immediate subdirectory named `<domain> <language> <version>` is a
//! key directory. Every registered resource id is looked up inside every key
//! directory; files that exist are parsed into the staging set. Bad
//! directory names and parser failures are reported per entry and skipped.

mod core;
mod report;


pub use self::core::{load, LoadOutcome};
pub use self::report::{LoadResult, LoadStatus};
