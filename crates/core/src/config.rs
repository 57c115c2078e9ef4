use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key).as_deref() {
        Some("1") | Some("true") | Some("yes") | Some("on") => true,
        Some("0") | Some("false") | Some("no") | Some("off") => false,
        _ => default,
    }
}

/// Quiet period per watched directory before a reload is requested (T1).
pub const DEFAULT_FILE_DAMPER_MS: u64 = 3000;
/// Quiet period across all requests before reloads execute (T2).
pub const DEFAULT_CALLBACK_DAMPER_MS: u64 = 1000;

// ── RepoConfig ────────────────────────────────────────────────

/// Runtime settings for repository loading and hot-reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfig {
    /// Active profile name (empty = default).
    pub profile: String,
    /// Attach filesystem watchers at registration and after every reload.
    pub watch: bool,
    /// Per-path damper in milliseconds.
    pub file_damper_ms: u64,
    /// Cross-path callback damper in milliseconds.
    pub callback_damper_ms: u64,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            profile: String::new(),
            watch: true,
            file_damper_ms: DEFAULT_FILE_DAMPER_MS,
            callback_damper_ms: DEFAULT_CALLBACK_DAMPER_MS,
        }
    }
}

impl RepoConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `TIERED_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_opt("TIERED_PROFILE").unwrap_or_default().to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            watch: profiled_env_bool(p, "TIERED_WATCH", true),
            file_damper_ms: profiled_env_u64(p, "TIERED_FILE_DAMPER_MS", DEFAULT_FILE_DAMPER_MS),
            callback_damper_ms: profiled_env_u64(
                p,
                "TIERED_CALLBACK_DAMPER_MS",
                DEFAULT_CALLBACK_DAMPER_MS,
            ),
        }
    }

    /// Config without filesystem watching, for one-shot loads and tests.
    pub fn unwatched() -> Self {
        Self {
            watch: false,
            ..Self::default()
        }
    }

    pub fn with_dampers(mut self, file: Duration, callback: Duration) -> Self {
        self.file_damper_ms = u64::try_from(file.as_millis()).unwrap_or(u64::MAX);
        self.callback_damper_ms = u64::try_from(callback.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn file_damper(&self) -> Duration {
        Duration::from_millis(self.file_damper_ms)
    }

    pub fn callback_damper(&self) -> Duration {
        Duration::from_millis(self.callback_damper_ms)
    }

    /// Reject damper settings that would turn debouncing into a busy loop.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.watch && (self.file_damper_ms == 0 || self.callback_damper_ms == 0) {
            return Err(CoreError::Config(format!(
                "dampers must be non-zero when watching (file={}ms, callback={}ms)",
                self.file_damper_ms, self.callback_damper_ms
            )));
        }
        Ok(())
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Repository config loaded (profile: {}):", self.profile_label());
        tracing::info!("  watch:            {}", self.watch);
        tracing::info!("  file damper:      {}ms", self.file_damper_ms);
        tracing::info!("  callback damper:  {}ms", self.callback_damper_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_damper_constants() {
        let cfg = RepoConfig::default();
        assert!(cfg.watch);
        assert_eq!(cfg.file_damper(), Duration::from_secs(3));
        assert_eq!(cfg.callback_damper(), Duration::from_secs(1));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_damper_rejected_only_when_watching() {
        let cfg = RepoConfig::default().with_dampers(Duration::ZERO, Duration::from_millis(5));
        assert!(matches!(cfg.validate(), Err(CoreError::Config(_))));

        let cfg = RepoConfig {
            watch: false,
            ..cfg
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn oversized_damper_saturates() {
        let cfg = RepoConfig::default().with_dampers(Duration::MAX, Duration::from_millis(1500));
        assert_eq!(cfg.file_damper_ms, u64::MAX);
        assert_eq!(cfg.callback_damper_ms, 1500);
    }

    #[test]
    fn profiled_lookup_prefers_prefixed_key() {
        // Unique key names so parallel tests don't race on the environment.
        env::set_var("CFGTEST_TIERED_FILE_DAMPER_MS", "250");
        let cfg = RepoConfig::for_profile("cfgtest");
        assert_eq!(cfg.profile, "CFGTEST");
        assert_eq!(cfg.file_damper_ms, 250);
        env::remove_var("CFGTEST_TIERED_FILE_DAMPER_MS");
    }
}
