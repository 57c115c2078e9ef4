pub mod config;
pub mod error;
pub mod key;

pub use config::RepoConfig;
pub use error::*;
pub use key::{Key, VariantKey, UNSET};
