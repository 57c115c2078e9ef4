//! Staging and published resource sets, and the five-probe resolver.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use tiered_core::VariantKey;

use crate::resource::Resource;

// ── StagingSet ────────────────────────────────────────────────

/// Mutable set built by one reload, before overlay and publish.
pub struct StagingSet<R> {
    pub(crate) entries: IndexMap<String, Vec<R>>,
}

impl<R: Resource> StagingSet<R> {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Add a record under its id.
    ///
    /// Returns the record back if the id already holds a variant with the
    /// same (domain, language, version).
    pub fn insert(&mut self, record: R) -> Result<(), R> {
        let variants = self.entries.entry(record.id().to_string()).or_default();
        if variants
            .iter()
            .any(|existing| existing.key().variant == record.key().variant)
        {
            return Err(record);
        }
        variants.push(record);
        Ok(())
    }

    pub fn variants(&self, id: &str) -> &[R] {
        self.entries.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Freeze into an immutable, indexed set.
    pub fn freeze(self, generation: u64) -> ResourceSet<R> {
        let entries = self
            .entries
            .into_iter()
            .map(|(id, variants)| {
                let by_key = variants
                    .into_iter()
                    .map(|r| (r.key().variant.clone(), Arc::new(r)))
                    .collect();
                (id, by_key)
            })
            .collect();
        ResourceSet {
            generation,
            entries,
        }
    }
}

impl<R: Resource> Default for StagingSet<R> {
    fn default() -> Self {
        Self::new()
    }
}

// ── ResourceSet ───────────────────────────────────────────────

/// Immutable, published set of records: id → variant key → record.
pub struct ResourceSet<R> {
    generation: u64,
    entries: IndexMap<String, HashMap<VariantKey, Arc<R>>>,
}

impl<R: Resource> ResourceSet<R> {
    /// The set served before the first successful load.
    pub fn empty() -> Self {
        Self {
            generation: 0,
            entries: IndexMap::new(),
        }
    }

    /// Reload cycle that produced this set (0 = never loaded).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Best match for `id` under `selector`.
    ///
    /// Probes, first hit wins: `(D, L, V)`, `(D, _, V)`, `(D, _, _)`,
    /// `(_, _, V)`, `(_, _, _)`. A set holding only e.g. `(_, L, _)` for
    /// an id has no match for any selector other than that exact key.
    pub fn resolve(&self, id: &str, selector: &VariantKey) -> Option<&Arc<R>> {
        let variants = self.entries.get(id)?;
        selector
            .fallbacks()
            .iter()
            .find_map(|probe| variants.get(probe))
    }

    /// Exact variant lookup, no fallback.
    pub fn get(&self, id: &str, variant: &VariantKey) -> Option<&Arc<R>> {
        self.entries.get(id)?.get(variant)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// All variants loaded for `id`, sorted by key.
    pub fn variants(&self, id: &str) -> Vec<&Arc<R>> {
        let mut variants: Vec<_> = self
            .entries
            .get(id)
            .map(|m| m.values().collect())
            .unwrap_or_default();
        variants.sort_by(|a, b| a.key().variant.cmp(&b.key().variant));
        variants
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Number of distinct resource ids.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of records across all ids and variants.
    pub fn resource_count(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }
}
