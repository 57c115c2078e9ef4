//! Record capability traits.
//!
//! Every record served by a repository implements [`Resource`] (key and
//! payload accessors) and [`Overlay`] (fill-only inheritance from the
//! default variant). Field kinds opt into inheritance by implementing
//! [`Overlay`]:
//!
//! - `String`: filled when empty.
//! - `Option<T>` (collections, maps, any optional value): filled when `None`.
//! - nested structs: implement [`Overlay`] by delegating to each field.
//!
//! Numeric and boolean fields have no impl and are never inherited.

use std::fs;

use tiered_core::Key;

/// Fill-only merge against a base value.
///
/// Implementations must only ever fill unset parts of `self`; a value
/// that is already set is never replaced.
pub trait Overlay {
    fn overlay(&mut self, base: &Self);
}

impl Overlay for String {
    fn overlay(&mut self, base: &Self) {
        if self.is_empty() && !base.is_empty() {
            self.clone_from(base);
        }
    }
}

impl<T: Clone> Overlay for Option<T> {
    fn overlay(&mut self, base: &Self) {
        if self.is_none() && base.is_some() {
            self.clone_from(base);
        }
    }
}

/// A parsed record together with the key it was loaded under.
///
/// `overlay` must not touch the key; the merger adjusts `mod_time` itself.
pub trait Resource: Overlay + Send + Sync + 'static {
    type Payload: ?Sized;

    fn key(&self) -> &Key;

    fn key_mut(&mut self) -> &mut Key;

    fn payload(&self) -> &Self::Payload;

    fn id(&self) -> &str {
        &self.key().id
    }
}

// ── Document ──────────────────────────────────────────────────

/// Generic record: a key plus a parsed body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document<T> {
    pub key: Key,
    pub body: T,
}

impl<T> Document<T> {
    pub fn new(key: Key, body: T) -> Self {
        Self { key, body }
    }
}

impl<T: Overlay> Overlay for Document<T> {
    fn overlay(&mut self, base: &Self) {
        self.body.overlay(&base.body);
    }
}

impl<T> Resource for Document<T>
where
    T: Overlay + Send + Sync + 'static,
{
    type Payload = T;

    fn key(&self) -> &Key {
        &self.key
    }

    fn key_mut(&mut self) -> &mut Key {
        &mut self.key
    }

    fn payload(&self) -> &T {
        &self.body
    }
}

/// Plain-text document whose body is the whole file.
pub type TextDocument = Document<String>;

/// Parser for [`TextDocument`]: reads the file as UTF-8.
pub fn read_text(key: &Key) -> anyhow::Result<TextDocument> {
    let body = fs::read_to_string(&key.path)?;
    Ok(Document::new(key.clone(), body))
}
