//! End-to-end scenarios driven through the [`Engine`] facade against a real
//! temp-directory storage root, with real JPEG/PNG content so thumbnailing
//! and metadata extraction run for real.

use mediabucket::{
    BucketError, Destination, DestinationRegistry, Engine, PublishOptions, Settings,
};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

struct Fixture {
    _root: TempDir,
    staging: TempDir,
    engine: Engine,
    root_path: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
        let root = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        let root_path = root.path().to_path_buf();
        let settings = Settings::new(&root_path);
        let registry = DestinationRegistry::new(vec![
            Destination::new("wall"),
            Destination::new("desk"),
            Destination::new("archive").headless(),
        ]);
        let engine = Engine::new(settings, registry);
        Self {
            _root: root,
            staging,
            engine,
            root_path,
        }
    }

    /// Write a decodable image into the staging area. Distinct dimensions
    /// give distinct encoded bytes, so canonical-slot content is checkable.
    fn stage_image(&self, name: &str, side: u32) -> PathBuf {
        let path = self.staging.path().join(name);
        image::RgbImage::from_pixel(side, side, image::Rgb([90, 120, 200]))
            .save(&path)
            .unwrap();
        path
    }

    fn bucket_path(&self, dest: &str, filename: &str) -> PathBuf {
        self.root_path.join(dest).join(filename)
    }

    fn canonical_path(&self, dest: &str, ext: &str) -> PathBuf {
        self.root_path.join(format!("{dest}.{ext}"))
    }

    /// Upload a fresh image and return its stored filename.
    fn upload_image(&self, dest: &str, name: &str, side: u32) -> String {
        let src = self.stage_image(name, side);
        self.engine.upload(dest, &src, None).unwrap()
    }

    /// Publish a bucket-resident file through the engine.
    fn publish_bucketed(&self, dest: &str, filename: &str) {
        let source = self.bucket_path(dest, filename);
        self.engine
            .publish(
                source.to_str().unwrap(),
                dest,
                None,
                PublishOptions::default(),
            )
            .unwrap();
    }
}

fn read(path: &Path) -> Vec<u8> {
    fs::read(path).unwrap()
}

#[test]
fn upload_stores_asset_sidecar_and_thumbnail() {
    let fx = Fixture::new();
    let src = fx.stage_image("sunset.jpg", 8);
    let mut meta = Map::new();
    meta.insert("prompt".to_string(), json!("a sunset"));

    let stored = fx.engine.upload("wall", &src, Some(&meta)).unwrap();
    assert_eq!(stored, "sunset.jpg");

    assert!(fx.bucket_path("wall", "sunset.jpg").is_file());
    assert!(fx.root_path.join("wall/sunset.jpg.json").is_file());
    assert!(fx.root_path.join("wall/thumbnails/sunset.jpg").is_file());

    let listing = fx.engine.list_items("wall").unwrap();
    assert_eq!(listing.sequence, vec!["sunset.jpg"]);

    let sidecar: Value =
        serde_json::from_slice(&read(&fx.root_path.join("wall/sunset.jpg.json"))).unwrap();
    assert_eq!(sidecar["prompt"], json!("a sunset"));
}

#[test]
fn upload_collision_gets_a_unique_name() {
    let fx = Fixture::new();
    let first = fx.upload_image("wall", "dup.jpg", 4);
    let second = fx.upload_image("wall", "dup.jpg", 6);

    assert_eq!(first, "dup.jpg");
    assert_ne!(second, "dup.jpg");
    assert!(second.ends_with(".jpg"));

    let listing = fx.engine.list_items("wall").unwrap();
    assert_eq!(listing.sequence.len(), 2);
    assert!(fx.bucket_path("wall", &second).is_file());
}

#[test]
fn upload_to_unknown_destination_fails() {
    let fx = Fixture::new();
    let src = fx.stage_image("x.jpg", 4);
    assert!(matches!(
        fx.engine.upload("nowhere", &src, None),
        Err(BucketError::DestinationNotFound(_))
    ));
}

#[test]
fn upload_rejects_disallowed_extension() {
    let fx = Fixture::new();
    let src = fx.staging.path().join("notes.txt");
    fs::write(&src, b"not media").unwrap();
    assert!(matches!(
        fx.engine.upload("wall", &src, None),
        Err(BucketError::InvalidInput(_))
    ));
}

#[test]
fn publish_bucketed_file_fills_canonical_slot_and_history() {
    let fx = Fixture::new();
    let name = fx.upload_image("wall", "one.jpg", 8);
    fx.publish_bucketed("wall", &name);

    let canonical = fx.canonical_path("wall", "jpg");
    assert!(canonical.is_file());
    assert_eq!(read(&canonical), read(&fx.bucket_path("wall", &name)));

    // Extraction fills the canonical sidecar when no metadata came along.
    let sidecar: Value =
        serde_json::from_slice(&read(&fx.root_path.join("wall.jpg.json"))).unwrap();
    assert_eq!(sidecar["width"], json!(8));
    assert_eq!(sidecar["height"], json!(8));

    let info = fx.engine.published_info("wall").unwrap();
    assert_eq!(info.stack_size, 1);
    assert_eq!(info.pointer, 0);
    assert_eq!(info.current.unwrap().filename, name);
    assert!(!info.can_undo);
    assert!(!info.can_redo);

    // A pre-existing local file is not re-appended to the bucket.
    let listing = fx.engine.list_items("wall").unwrap();
    assert_eq!(listing.sequence.len(), 1);
}

#[test]
fn publish_fresh_file_with_bucketing_requested() {
    let fx = Fixture::new();
    let src = fx.stage_image("fresh.jpg", 8);

    let outcome = fx
        .engine
        .publish(
            src.to_str().unwrap(),
            "wall",
            None,
            PublishOptions {
                skip_bucket: Some(false),
                ..Default::default()
            },
        )
        .unwrap();

    assert_eq!(outcome.filename, "fresh.jpg");
    assert!(fx.bucket_path("wall", "fresh.jpg").is_file());
    assert_eq!(
        fx.engine.list_items("wall").unwrap().sequence,
        vec!["fresh.jpg"]
    );
    // Canonical slot mirrors the bucket-resident copy.
    assert_eq!(
        read(&fx.canonical_path("wall", "jpg")),
        read(&fx.bucket_path("wall", "fresh.jpg"))
    );
}

#[test]
fn publish_missing_source_fails() {
    let fx = Fixture::new();
    let err = fx
        .engine
        .publish(
            "/no/such/file.jpg",
            "wall",
            None,
            PublishOptions::default(),
        )
        .unwrap_err();
    assert!(matches!(err, BucketError::NotFound(_)));
}

#[test]
fn publish_different_extension_replaces_prior_canonical_file() {
    let fx = Fixture::new();
    let jpg = fx.upload_image("wall", "a.jpg", 8);
    fx.publish_bucketed("wall", &jpg);
    assert!(fx.canonical_path("wall", "jpg").is_file());

    let png = fx.upload_image("wall", "b.png", 8);
    fx.publish_bucketed("wall", &png);

    assert!(fx.canonical_path("wall", "png").is_file());
    assert!(!fx.canonical_path("wall", "jpg").exists());
    assert!(!fx.root_path.join("wall.jpg.json").exists());
}

#[test]
fn blank_publish_shows_the_sentinel() {
    let fx = Fixture::new();
    fx.engine
        .publish(
            "unused",
            "wall",
            None,
            PublishOptions {
                blank: true,
                ..Default::default()
            },
        )
        .unwrap();

    let sentinel = fx.root_path.join("blank.jpg");
    assert!(sentinel.is_file());
    assert_eq!(
        read(&fx.canonical_path("wall", "jpg")),
        read(&sentinel)
    );
    // The sentinel is displayed, never bucketed.
    assert!(fx.engine.list_items("wall").unwrap().sequence.is_empty());
}

#[test]
fn headless_destination_buckets_but_never_displays() {
    let fx = Fixture::new();
    let name = fx.upload_image("archive", "kept.jpg", 8);
    fx.publish_bucketed("archive", &name);

    assert!(!fx.canonical_path("archive", "jpg").exists());
    let info = fx.engine.published_info("archive").unwrap();
    assert_eq!(info.stack_size, 0);
    assert!(!info.can_undo);
}

#[test]
fn undo_and_redo_navigate_the_canonical_slot() {
    let fx = Fixture::new();
    for (name, side) in [("a.jpg", 6), ("b.jpg", 8), ("c.jpg", 10)] {
        let stored = fx.upload_image("wall", name, side);
        fx.publish_bucketed("wall", &stored);
    }

    let info = fx.engine.published_info("wall").unwrap();
    assert_eq!(info.stack_size, 3);
    assert_eq!(info.current.unwrap().filename, "c.jpg");

    let outcome = fx.engine.undo("wall").unwrap();
    assert_eq!(outcome.filename, "b.jpg");
    assert_eq!(
        read(&fx.canonical_path("wall", "jpg")),
        read(&fx.bucket_path("wall", "b.jpg"))
    );

    // Navigation moved the pointer without growing the stack.
    let info = fx.engine.published_info("wall").unwrap();
    assert_eq!(info.stack_size, 3);
    assert_eq!(info.pointer, 1);
    assert!(info.can_undo);
    assert!(info.can_redo);

    let outcome = fx.engine.redo("wall").unwrap();
    assert_eq!(outcome.filename, "c.jpg");
    assert_eq!(
        read(&fx.canonical_path("wall", "jpg")),
        read(&fx.bucket_path("wall", "c.jpg"))
    );
}

#[test]
fn undo_stops_at_the_oldest_entry() {
    let fx = Fixture::new();
    for name in ["a.jpg", "b.jpg"] {
        let stored = fx.upload_image("wall", name, 6);
        fx.publish_bucketed("wall", &stored);
    }

    fx.engine.undo("wall").unwrap();
    assert!(matches!(
        fx.engine.undo("wall"),
        Err(BucketError::AtOldest)
    ));
    // The failed step left the pointer where it was.
    assert_eq!(fx.engine.published_info("wall").unwrap().pointer, 1);
}

#[test]
fn redo_without_an_undo_fails() {
    let fx = Fixture::new();
    let stored = fx.upload_image("wall", "a.jpg", 6);
    fx.publish_bucketed("wall", &stored);
    assert!(matches!(
        fx.engine.redo("wall"),
        Err(BucketError::AtNewest)
    ));
}

#[test]
fn undo_on_a_destination_with_no_history_fails() {
    let fx = Fixture::new();
    fx.engine.create_bucket("wall").unwrap();
    assert!(matches!(
        fx.engine.undo("wall"),
        Err(BucketError::NoHistory(_))
    ));
}

#[test]
fn publish_after_undo_drops_entries_older_than_the_pointer() {
    let fx = Fixture::new();
    for name in ["a.jpg", "b.jpg", "c.jpg"] {
        let stored = fx.upload_image("wall", name, 6);
        fx.publish_bucketed("wall", &stored);
    }
    fx.engine.undo("wall").unwrap(); // pointing at b.jpg

    let stored = fx.upload_image("wall", "d.jpg", 6);
    fx.publish_bucketed("wall", &stored);

    let info = fx.engine.published_info("wall").unwrap();
    assert_eq!(info.stack_size, 3); // a.jpg fell off
    assert_eq!(info.pointer, 0);
    assert_eq!(info.current.unwrap().filename, "d.jpg");

    let undone = fx.engine.undo("wall").unwrap();
    assert_eq!(undone.filename, "c.jpg");
}

#[test]
fn batch_undo_keeps_destinations_independent() {
    let fx = Fixture::new();
    for dest in ["wall", "desk"] {
        let stored = fx.upload_image(dest, "a.jpg", 6);
        fx.publish_bucketed(dest, &stored);
        let stored = fx.upload_image(dest, "b.jpg", 8);
        fx.publish_bucketed(dest, &stored);
    }
    // Drain wall's history so its undo fails while desk's succeeds.
    fx.engine.undo("wall").unwrap();

    let result = fx
        .engine
        .undo_for_targets(&["wall".to_string(), "desk".to_string()]);
    assert_eq!(result.succeeded, 1);
    assert_eq!(result.failed, 1);
    assert!(!result.outcomes["wall"].success);
    let desk = &result.outcomes["desk"];
    assert!(desk.success);
    assert_eq!(desk.filename.as_deref(), Some("a.jpg"));

    // Desk's canonical slot actually moved.
    assert_eq!(
        read(&fx.canonical_path("desk", "jpg")),
        read(&fx.bucket_path("desk", "a.jpg"))
    );
}

#[test]
fn undo_to_a_purged_asset_fails_but_keeps_the_pointer() {
    let fx = Fixture::new();
    for name in ["a.jpg", "b.jpg"] {
        let stored = fx.upload_image("wall", name, 6);
        fx.publish_bucketed("wall", &stored);
    }
    fx.engine.delete_item("wall", "a.jpg").unwrap();

    assert!(matches!(
        fx.engine.undo("wall"),
        Err(BucketError::NotFound(_))
    ));
    assert_eq!(fx.engine.published_info("wall").unwrap().pointer, 1);
}

#[test]
fn favorites_survive_purge() {
    let fx = Fixture::new();
    let keep = fx.upload_image("wall", "keep.jpg", 6);
    let gone = fx.upload_image("wall", "gone.jpg", 6);
    fx.engine.favorite("wall", &keep).unwrap();

    let report = fx.engine.purge("wall", false).unwrap();
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 0);

    let listing = fx.engine.list_items("wall").unwrap();
    assert_eq!(listing.sequence, vec![keep.clone()]);
    assert_eq!(listing.favorites, vec![keep.clone()]);
    assert!(fx.bucket_path("wall", &keep).is_file());
    assert!(!fx.bucket_path("wall", &gone).exists());
    assert!(!fx.root_path.join("wall/thumbnails").join(&gone).exists());
}

#[test]
fn purge_with_favorites_included_empties_the_bucket() {
    let fx = Fixture::new();
    let a = fx.upload_image("wall", "a.jpg", 6);
    fx.upload_image("wall", "b.jpg", 6);
    fx.engine.favorite("wall", &a).unwrap();

    let report = fx.engine.purge("wall", true).unwrap();
    assert_eq!(report.succeeded, 2);

    let listing = fx.engine.list_items("wall").unwrap();
    assert!(listing.sequence.is_empty());
    assert!(listing.favorites.is_empty());
}

#[test]
fn reindex_rebuilds_the_sequence_from_disk() {
    let fx = Fixture::new();
    fx.engine.create_bucket("wall").unwrap();
    let dir = fx.root_path.join("wall");
    for name in ["zebra.jpg", "apple.jpg", "mango.png"] {
        image::RgbImage::from_pixel(4, 4, image::Rgb([1, 2, 3]))
            .save(dir.join(name))
            .unwrap();
    }
    fs::write(dir.join("stray.txt"), b"ignored").unwrap();

    let report = fx.engine.reindex("wall", false).unwrap();
    assert_eq!(report.failed, 0);

    let listing = fx.engine.list_items("wall").unwrap();
    assert_eq!(listing.sequence, vec!["apple.jpg", "mango.png", "zebra.jpg"]);
    // Sidecars and thumbnails were generated for the discovered files.
    assert!(dir.join("apple.jpg.json").is_file());
    assert!(dir.join("thumbnails/apple.jpg").is_file());
}

#[test]
fn reindex_drops_favorites_for_vanished_files() {
    let fx = Fixture::new();
    let name = fx.upload_image("wall", "gone.jpg", 6);
    fx.engine.favorite("wall", &name).unwrap();
    fs::remove_file(fx.bucket_path("wall", &name)).unwrap();

    fx.engine.reindex("wall", false).unwrap();
    let listing = fx.engine.list_items("wall").unwrap();
    assert!(listing.sequence.is_empty());
    assert!(listing.favorites.is_empty());
}

#[test]
fn reorder_wraps_around_the_ends() {
    let fx = Fixture::new();
    for name in ["a.jpg", "b.jpg", "c.jpg"] {
        fx.upload_image("wall", name, 4);
    }

    fx.engine.move_up("wall", "a.jpg").unwrap();
    assert_eq!(
        fx.engine.list_items("wall").unwrap().sequence,
        vec!["b.jpg", "c.jpg", "a.jpg"]
    );

    fx.engine.move_down("wall", "a.jpg").unwrap();
    assert_eq!(
        fx.engine.list_items("wall").unwrap().sequence,
        vec!["a.jpg", "b.jpg", "c.jpg"]
    );
}

#[test]
fn copy_and_move_between_buckets() {
    let fx = Fixture::new();
    let name = fx.upload_image("wall", "shared.jpg", 6);

    let copied = fx.engine.copy_item("wall", &name, "desk").unwrap();
    assert!(fx.bucket_path("desk", &copied).is_file());
    assert!(fx.bucket_path("wall", &name).is_file());

    let moved = fx.engine.move_item("wall", &name, "desk").unwrap();
    assert!(fx.bucket_path("desk", &moved).is_file());
    assert!(!fx.bucket_path("wall", &name).exists());
    assert!(fx.engine.list_items("wall").unwrap().sequence.is_empty());
    assert_eq!(fx.engine.list_items("desk").unwrap().sequence.len(), 2);
}

#[test]
fn delete_missing_item_fails() {
    let fx = Fixture::new();
    fx.engine.create_bucket("wall").unwrap();
    assert!(matches!(
        fx.engine.delete_item("wall", "ghost.jpg"),
        Err(BucketError::NotFound(_))
    ));
}

#[test]
fn concurrent_uploads_keep_the_document_consistent() {
    let fx = Arc::new(Fixture::new());
    let mut handles = Vec::new();
    for i in 0..8 {
        let fx = fx.clone();
        handles.push(std::thread::spawn(move || {
            let name = format!("img-{i}.jpg");
            let stored = fx.upload_image("wall", &name, 4);
            if i % 2 == 0 {
                fx.engine.favorite("wall", &stored).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let listing = fx.engine.list_items("wall").unwrap();
    assert_eq!(listing.sequence.len(), 8);
    assert_eq!(listing.favorites.len(), 4);
    for favorite in &listing.favorites {
        assert!(listing.sequence.contains(favorite));
    }
}
