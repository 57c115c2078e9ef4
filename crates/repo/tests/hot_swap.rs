//! Publish atomicity under concurrent readers and overlapping reloads.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tempfile::TempDir;
use tiered_repo::{read_text, Coordinator, RepoConfig, Repository, TextDocument};

const IDS: [&str; 4] = ["a.txt", "b.txt", "c/d.txt", "e.txt"];
const KEY_DIRS: [&str; 3] = ["_ _ _", "com _ _", "com es _"];

/// Every file gets the same marker, so one published set carries one marker.
fn write_marker(root: &Path, marker: u64) {
    for dir in KEY_DIRS {
        for id in IDS {
            let path = root.join(dir).join(id);
            fs::create_dir_all(path.parent().unwrap()).expect("create dir");
            fs::write(path, marker.to_string()).expect("write marker");
        }
    }
}

fn snapshot_markers(repo: &Repository<TextDocument>) -> (u64, Vec<u64>) {
    let set = repo.snapshot();
    let markers = set
        .ids()
        .flat_map(|id| set.variants(id))
        .map(|doc| doc.body.parse().expect("numeric marker"))
        .collect();
    (set.generation(), markers)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_never_observe_a_mixed_set() {
    let tmp = TempDir::new().expect("create tempdir");
    write_marker(tmp.path(), 0);

    let coordinator = Coordinator::new(RepoConfig::unwatched()).unwrap();
    let repo = coordinator
        .register_homogeneous("markers", tmp.path(), IDS, read_text)
        .unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..3)
        .map(|_| {
            let repo = Arc::clone(&repo);
            let stop = Arc::clone(&stop);
            tokio::task::spawn_blocking(move || {
                let mut last_generation = 0;
                let mut observed = 0usize;
                while !stop.load(Ordering::Relaxed) {
                    let (generation, markers) = snapshot_markers(&repo);
                    assert!(generation >= last_generation, "generation went backwards");
                    assert_eq!(markers.len(), IDS.len() * KEY_DIRS.len());
                    assert!(
                        markers.iter().all(|m| *m == generation - 1),
                        "generation {generation} mixes markers {markers:?}"
                    );
                    last_generation = generation;
                    observed += 1;
                }
                observed
            })
        })
        .collect();

    for round in 1..=20u64 {
        write_marker(tmp.path(), round);
        let report = coordinator.reload("markers").unwrap();
        assert_eq!(report.generation, round + 1);
    }

    stop.store(true, Ordering::Relaxed);
    for reader in readers {
        assert!(reader.await.expect("reader panicked") > 0);
    }

    let (generation, markers) = snapshot_markers(&repo);
    assert_eq!(generation, 21);
    assert!(markers.iter().all(|m| *m == 20));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_reloads_are_serialized() {
    let tmp = TempDir::new().expect("create tempdir");
    write_marker(tmp.path(), 7);

    let coordinator = Coordinator::new(RepoConfig::unwatched()).unwrap();
    let repo = coordinator
        .register_homogeneous("markers", tmp.path(), IDS, read_text)
        .unwrap();

    let reloads: Vec<_> = (0..8)
        .map(|_| {
            let repo = Arc::clone(&repo);
            tokio::task::spawn_blocking(move || repo.reload().expect("reload").generation)
        })
        .collect();

    let mut generations = Vec::new();
    for reload in reloads {
        generations.push(reload.await.expect("reload task"));
    }
    generations.sort_unstable();

    assert_eq!(generations, (2..=9).collect::<Vec<u64>>(), "each reload gets its own generation");
    assert_eq!(repo.generation(), 9);
}
