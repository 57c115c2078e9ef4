//! Resource keys and the key-directory name parser.
//!
//! A repository root holds one directory per variant, named
//! `<domain> <language> <version>` where `_` stands for "unset":
//!
//! ```text
//! _ _ _          default variant
//! com _ _        domain only
//! com es _       domain + language
//! co.uk _ v2     domain + version
//! ```

use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::KeyError;

/// Placeholder token for an unset key part.
pub const UNSET: &str = "_";

static KEY_DIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<domain>_|\S+)\s(?P<language>_|\S+)\s(?P<version>_|[a-zA-Z0-9\-]*)$")
        .expect("key directory pattern is valid")
});

// ── VariantKey ────────────────────────────────────────────────

/// The (domain, language, version) triple addressing one variant of a resource.
///
/// Empty strings mean "unset". The all-empty key is the default variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariantKey {
    pub domain: String,
    pub language: String,
    pub version: String,
}

impl VariantKey {
    pub fn new(
        domain: impl Into<String>,
        language: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            language: language.into(),
            version: version.into(),
        }
    }

    /// Parse a key directory name such as `com es _`.
    pub fn parse(dir_name: &str) -> Result<Self, KeyError> {
        let caps = KEY_DIR
            .captures(dir_name)
            .ok_or_else(|| KeyError::Unparseable(dir_name.to_string()))?;

        let token = |name: &str| -> String {
            match caps.name(name).map(|m| m.as_str()) {
                Some(UNSET) | None => String::new(),
                Some(v) => v.to_string(),
            }
        };

        Ok(Self {
            domain: token("domain"),
            language: token("language"),
            version: token("version"),
        })
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// True for the default variant (`_ _ _`).
    pub fn is_default(&self) -> bool {
        self.domain.is_empty() && self.language.is_empty() && self.version.is_empty()
    }

    /// The five lookup keys tried by the resolver, most specific first.
    pub fn fallbacks(&self) -> [VariantKey; 5] {
        [
            VariantKey::new(&self.domain, &self.language, &self.version),
            VariantKey::new(&self.domain, "", &self.version),
            VariantKey::new(&self.domain, "", ""),
            VariantKey::new("", "", &self.version),
            VariantKey::default(),
        ]
    }
}

impl fmt::Display for VariantKey {
    /// Renders the key back into its directory-name form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let part = |s: &str| if s.is_empty() { UNSET.to_string() } else { s.to_string() };
        write!(
            f,
            "{} {} {}",
            part(&self.domain),
            part(&self.language),
            part(&self.version)
        )
    }
}

// ── Key ───────────────────────────────────────────────────────

/// Identity and provenance of one loaded resource file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    /// Resource id, the file path relative to its key directory (e.g. `help/info.ini`).
    pub id: String,
    /// Full path of the source file.
    pub path: PathBuf,
    /// Modification time; after overlay, the newest of the variant and its default.
    pub mod_time: DateTime<Utc>,
    pub variant: VariantKey,
}

impl Key {
    pub fn new(
        id: impl Into<String>,
        path: impl Into<PathBuf>,
        mod_time: DateTime<Utc>,
        variant: VariantKey,
    ) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            mod_time,
            variant,
        }
    }

    pub fn domain(&self) -> &str {
        &self.variant.domain
    }

    pub fn language(&self) -> &str {
        &self.variant.language
    }

    pub fn version(&self) -> &str {
        &self.variant.version
    }

    pub fn is_default(&self) -> bool {
        self.variant.is_default()
    }
}
