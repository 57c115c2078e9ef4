//! End-to-end load, overlay and resolve over a structured record type.

use std::fs;
use std::path::Path;

use anyhow::Context;
use tempfile::TempDir;
use tiered_repo::{Coordinator, Key, Overlay, ParserRegistry, RepoConfig, Resource, VariantKey};

#[derive(Debug, Clone)]
struct Page {
    key: Key,
    title: String,
    keywords: Option<Vec<String>>,
    weight: u32,
}

impl Overlay for Page {
    fn overlay(&mut self, base: &Self) {
        self.title.overlay(&base.title);
        self.keywords.overlay(&base.keywords);
    }
}

impl Resource for Page {
    type Payload = str;

    fn key(&self) -> &Key {
        &self.key
    }

    fn key_mut(&mut self) -> &mut Key {
        &mut self.key
    }

    fn payload(&self) -> &str {
        &self.title
    }
}

/// `name = value` lines; unknown names are errors.
fn parse_page(key: &Key) -> anyhow::Result<Page> {
    let text = fs::read_to_string(&key.path)?;
    let mut page = Page {
        key: key.clone(),
        title: String::new(),
        keywords: None,
        weight: 0,
    };
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let (name, value) = line.split_once('=').context("expected name = value")?;
        let value = value.trim();
        match name.trim() {
            "title" => page.title = value.to_string(),
            "keywords" => page.keywords = Some(value.split(',').map(|k| k.trim().to_string()).collect()),
            "weight" => page.weight = value.parse()?,
            other => anyhow::bail!("unknown field {other:?}"),
        }
    }
    Ok(page)
}

fn write(root: &Path, key_dir: &str, id: &str, body: &str) {
    let path = root.join(key_dir).join(id);
    fs::create_dir_all(path.parent().unwrap()).expect("create key dir");
    fs::write(path, body).expect("write resource");
}

fn pages() -> ParserRegistry<Page> {
    ParserRegistry::homogeneous(["index.page", "about.page", "legal.page"], parse_page)
}

fn catalog(root: &Path) {
    write(root, "_ _ _", "index.page", "title = Home\nkeywords = shop, books\nweight = 10\n");
    write(root, "com _ _", "index.page", "weight = 3\n");
    write(root, "com es _", "index.page", "title = Inicio\n");
    write(root, "com es v2", "index.page", "keywords = libros\n");
    write(root, "_ _ _", "about.page", "title = About\n");
    write(root, "_ fr _", "legal.page", "title = Mentions\n");
    write(root, "_ _ _", "broken.page", "title = never registered\n");
    write(root, "com de _", "about.page", "colour = red\n");
    fs::create_dir_all(root.join("not a key dir")).unwrap();
}

#[tokio::test]
async fn variants_inherit_unset_fields_from_the_default() {
    let tmp = TempDir::new().expect("create tempdir");
    catalog(tmp.path());

    let coordinator = Coordinator::new(RepoConfig::unwatched()).unwrap();
    let repo = coordinator.register("pages", tmp.path(), pages()).unwrap();

    let com = repo.resolve("index.page", &VariantKey::default().with_domain("com")).unwrap();
    assert_eq!(com.title, "Home");
    assert_eq!(com.keywords.as_deref(), Some(&["shop".to_string(), "books".to_string()][..]));
    assert_eq!(com.weight, 3);

    let com_es = repo
        .resolve("index.page", &VariantKey::new("com", "es", ""))
        .unwrap();
    assert_eq!(com_es.title, "Inicio");
    assert_eq!(com_es.weight, 0, "numeric fields are never inherited");
    assert_eq!(com_es.key().variant, VariantKey::new("com", "es", ""));

    let v2 = repo.resolve("index.page", &VariantKey::new("com", "es", "v2")).unwrap();
    assert_eq!(v2.title, "Home", "inherits from the default, not from `com es _`");
    assert_eq!(v2.keywords.as_deref(), Some(&["libros".to_string()][..]));
}

#[tokio::test]
async fn probes_fall_back_from_most_to_least_specific() {
    let tmp = TempDir::new().expect("create tempdir");
    catalog(tmp.path());

    let coordinator = Coordinator::new(RepoConfig::unwatched()).unwrap();
    let repo = coordinator.register("pages", tmp.path(), pages()).unwrap();

    let resolved = |selector: VariantKey| {
        repo.resolve("index.page", &selector)
            .map(|p| p.key().variant.to_string())
    };
    assert_eq!(resolved(VariantKey::new("com", "es", "v2")).as_deref(), Some("com es v2"));
    assert_eq!(resolved(VariantKey::new("com", "es", "v9")).as_deref(), Some("com es _"));
    assert_eq!(resolved(VariantKey::new("com", "it", "v2")).as_deref(), Some("com _ _"));
    assert_eq!(resolved(VariantKey::new("org", "es", "v2")).as_deref(), Some("_ _ _"));
    assert_eq!(resolved(VariantKey::default()).as_deref(), Some("_ _ _"));
}

#[tokio::test]
async fn language_only_variant_is_not_reachable_without_a_default() {
    let tmp = TempDir::new().expect("create tempdir");
    catalog(tmp.path());

    let coordinator = Coordinator::new(RepoConfig::unwatched()).unwrap();
    let repo = coordinator.register("pages", tmp.path(), pages()).unwrap();

    assert!(repo.resolve("legal.page", &VariantKey::new("com", "fr", "")).is_none());
    assert!(repo.resolve("legal.page", &VariantKey::default().with_language("fr")).is_none());
    assert_eq!(repo.snapshot().variants("legal.page").len(), 1);
}

#[tokio::test]
async fn bad_entries_are_reported_and_skipped() {
    let tmp = TempDir::new().expect("create tempdir");
    catalog(tmp.path());

    let coordinator = Coordinator::new(RepoConfig::unwatched()).unwrap();
    coordinator.register("pages", tmp.path(), pages()).unwrap();
    let report = coordinator.reload("pages").unwrap();

    let loaded = report.results.iter().filter(|r| r.is_loaded()).count();
    assert_eq!(loaded, 6);

    let failed: Vec<_> = report
        .results
        .iter()
        .filter(|r| matches!(r.status, tiered_repo::loader::LoadStatus::Failed { .. }))
        .collect();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].path.ends_with("com de _/about.page"));

    let skipped: Vec<_> = report
        .results
        .iter()
        .filter(|r| matches!(r.status, tiered_repo::loader::LoadStatus::Skipped { .. }))
        .collect();
    assert_eq!(skipped.len(), 1);
    assert!(skipped[0].path.ends_with("not a key dir"));

    let about = coordinator
        .resolve::<Page>("pages", "about.page", &VariantKey::new("com", "de", ""))
        .unwrap();
    assert_eq!(about.key().variant, VariantKey::default(), "failed variant falls back");

    let summary = coordinator.summary();
    assert_eq!(summary["repositories"][0]["id"], "pages");
    assert_eq!(summary["repositories"][0]["generation"], 2);
}
