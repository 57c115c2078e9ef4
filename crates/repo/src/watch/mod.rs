//! Filesystem watching with two nested dampers.
//!
//! ```text
//! notify event ─► PathDamper (T1, per directory) ─► ReloadQueue
//!                                                      │
//!             reload once per repository ◄─ callback damper (T2, shared)
//! ```
//!
//! A reload follows the last change within T1 + T2, and a burst touching
//! many directories of one repository collapses into a single reload.

mod callback;
mod damper;
mod subscription;


pub use self::callback::{run_callback_damper, ReloadQueue, ReloadRequest};
pub use self::subscription::WatchSubscription;
