//! Resource id → parser registry.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tiered_core::Key;

/// Turns one file (described by its [`Key`]) into a record.
pub type Parser<R> = Arc<dyn Fn(&Key) -> anyhow::Result<R> + Send + Sync>;

/// Maps resource ids (file paths relative to a key directory) to parsers.
pub struct ParserRegistry<R> {
    parsers: BTreeMap<String, Parser<R>>,
}

impl<R> ParserRegistry<R> {
    pub fn new() -> Self {
        Self {
            parsers: BTreeMap::new(),
        }
    }

    /// Registry where every listed id shares one parser.
    pub fn homogeneous<I, S, F>(ids: I, parser: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&Key) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        let parser: Parser<R> = Arc::new(parser);
        let parsers = ids
            .into_iter()
            .map(|id| (id.into(), Arc::clone(&parser)))
            .collect();
        Self { parsers }
    }

    /// Register `parser` for `id`, replacing any previous entry.
    pub fn insert<F>(&mut self, id: impl Into<String>, parser: F)
    where
        F: Fn(&Key) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        self.parsers.insert(id.into(), Arc::new(parser));
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with<F>(mut self, id: impl Into<String>, parser: F) -> Self
    where
        F: Fn(&Key) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        self.insert(id, parser);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Parser<R>)> {
        self.parsers.iter().map(|(id, p)| (id.as_str(), p))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.parsers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}

impl<R> Default for ParserRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for ParserRegistry<R> {
    fn clone(&self) -> Self {
        Self {
            parsers: self.parsers.clone(),
        }
    }
}

impl<R> fmt::Debug for ParserRegistry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.parsers.keys()).finish()
    }
}
