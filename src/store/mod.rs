//! # Bucket Storage Layer
//!
//! [`BucketStore`] owns each destination's ordered, favoritable collection
//! of media assets and the raw file operations over it. The split-brain
//! model mirrors the rest of the crate's storage philosophy:
//!
//! 1. **Truth**: asset files inside `<root>/<dest>/`.
//! 2. **Document**: one `bucket.json` per destination carrying `sequence`,
//!    `favorites` and the embedded publish state.
//!
//! The document is not continuously reconciled against the directory; the
//! maintenance layer's `reindex` re-derives it on demand.
//!
//! ## Locking
//!
//! Every load → mutate → save cycle on `bucket.json` runs under that
//! destination's mutex from the shared [`locks::LockRegistry`]. Mutating
//! operations therefore serialize per destination while destinations stay
//! independent. See `locks.rs`.
//!
//! ## Storage Layout
//!
//! ```text
//! <root>/<dest>/
//! ├── bucket.json              # metadata document
//! ├── thumbnails/<stem>.jpg    # previews
//! ├── <file>                   # asset
//! └── <file>.json              # sidecar
//! ```

use crate::config::{DestinationRegistry, Settings};
use crate::error::{BucketError, Result};
use crate::media::{self, ThumbnailGenerator};
use crate::model::BucketMetadata;
use crate::sidecar;
use chrono::Utc;
use rand::Rng;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod locks;

use locks::LockRegistry;

pub struct BucketStore {
    settings: Settings,
    registry: Arc<DestinationRegistry>,
    locks: Arc<LockRegistry>,
    thumbnailer: Arc<dyn ThumbnailGenerator>,
}

impl BucketStore {
    pub fn new(
        settings: Settings,
        registry: Arc<DestinationRegistry>,
        locks: Arc<LockRegistry>,
        thumbnailer: Arc<dyn ThumbnailGenerator>,
    ) -> Self {
        Self {
            settings,
            registry,
            locks,
            thumbnailer,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // --- Paths ---

    pub fn bucket_dir(&self, dest: &str) -> PathBuf {
        self.settings.root.join(dest)
    }

    pub fn asset_path(&self, dest: &str, filename: &str) -> PathBuf {
        self.bucket_dir(dest).join(filename)
    }

    pub fn thumbnails_dir(&self, dest: &str) -> PathBuf {
        self.bucket_dir(dest).join("thumbnails")
    }

    pub fn thumbnail_path(&self, dest: &str, filename: &str) -> PathBuf {
        let stem = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(filename);
        self.thumbnails_dir(dest).join(format!("{stem}.jpg"))
    }

    fn meta_path(&self, dest: &str) -> PathBuf {
        self.bucket_dir(dest).join("bucket.json")
    }

    fn ensure_dir(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    // --- Metadata document I/O ---

    fn read_meta_unlocked(&self, dest: &str) -> Result<BucketMetadata> {
        let path = self.meta_path(dest);
        if !path.exists() {
            // Missing bucket is not an error: buckets are created lazily.
            return Ok(BucketMetadata::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write_meta_unlocked(&self, dest: &str, meta: &BucketMetadata) -> Result<()> {
        self.ensure_dir(&self.bucket_dir(dest))?;
        let content = serde_json::to_string_pretty(meta)?;
        fs::write(self.meta_path(dest), content)?;
        Ok(())
    }

    /// Read a destination's metadata document. Returns a fresh empty
    /// document when none exists yet.
    pub fn load_meta(&self, dest: &str) -> Result<BucketMetadata> {
        self.registry.get(dest)?;
        let lock = self.locks.for_destination(dest);
        let _guard = lock.lock();
        self.read_meta_unlocked(dest)
    }

    /// Persist the full metadata document, creating the bucket directory if
    /// absent.
    pub fn save_meta(&self, dest: &str, meta: &BucketMetadata) -> Result<()> {
        self.registry.get(dest)?;
        let lock = self.locks.for_destination(dest);
        let _guard = lock.lock();
        self.write_meta_unlocked(dest, meta)
    }

    /// Run one exclusive load → mutate → save cycle for a destination.
    /// The closure's side effects on disk happen under the same lock.
    pub fn with_meta_mut<T>(
        &self,
        dest: &str,
        f: impl FnOnce(&mut BucketMetadata) -> Result<T>,
    ) -> Result<T> {
        self.registry.get(dest)?;
        let lock = self.locks.for_destination(dest);
        let _guard = lock.lock();
        let mut meta = self.read_meta_unlocked(dest)?;
        let out = f(&mut meta)?;
        self.write_meta_unlocked(dest, &meta)?;
        Ok(out)
    }

    /// Explicitly create a bucket: directory plus empty metadata document.
    /// Idempotent; an existing document is left untouched.
    pub fn create_bucket(&self, dest: &str) -> Result<()> {
        self.with_meta_mut(dest, |_meta| Ok(()))
    }

    // --- Item operations ---

    /// Copy a file into the bucket, register it in `sequence`, carry over
    /// (or write) its sidecar, and generate a thumbnail. Returns the stored
    /// path; the stored filename may differ from the source name when a
    /// collision forced a unique rename.
    pub fn append_asset(
        &self,
        dest: &str,
        source: &Path,
        metadata: Option<&Map<String, Value>>,
    ) -> Result<PathBuf> {
        let destination = self.registry.get(dest)?;
        if !destination.has_bucket {
            return Err(BucketError::InvalidInput(format!(
                "destination has no bucket: {dest}"
            )));
        }
        if !source.is_file() {
            return Err(BucketError::NotFound(source.display().to_string()));
        }
        if !media::is_allowed(source) {
            return Err(BucketError::InvalidInput(format!(
                "extension not allowed: {}",
                source.display()
            )));
        }

        let filename = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                BucketError::InvalidInput(format!("bad filename: {}", source.display()))
            })?
            .to_string();

        let stored = self.with_meta_mut(dest, |meta| {
            // Buckets are created lazily; the first append must not assume
            // the directory exists.
            let dir = self.bucket_dir(dest);
            self.ensure_dir(&dir)?;

            let mut target = dir.join(&filename);
            if target.exists() {
                let unique = unique_name(&filename);
                tracing::debug!(dest, from = %filename, to = %unique, "Name collision, renaming");
                target = dir.join(unique);
            }

            fs::copy(source, &target)?;
            match metadata {
                Some(map) => sidecar::write(&target, map)?,
                None => sidecar::copy(source, &target)?,
            }

            let stored_name = target
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(&filename)
                .to_string();
            meta.sequence.push(stored_name);
            Ok(target)
        })?;

        // Thumbnail failure is non-fatal: the asset is already in the bucket.
        if let Err(err) = self.generate_thumbnail(dest, &stored) {
            tracing::warn!(dest, asset = %stored.display(), %err, "Thumbnail generation failed");
        }

        Ok(stored)
    }

    /// Generate and persist a thumbnail for a bucket-resident asset.
    pub fn generate_thumbnail(&self, dest: &str, asset: &Path) -> Result<()> {
        let bytes = self.thumbnailer.generate(asset)?;
        let filename = asset
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| BucketError::InvalidInput(format!("bad path: {}", asset.display())))?;
        self.ensure_dir(&self.thumbnails_dir(dest))?;
        fs::write(self.thumbnail_path(dest, filename), bytes)?;
        Ok(())
    }

    /// Remove an asset's file, sidecar and thumbnail, and drop it from
    /// `sequence` and `favorites`. Missing files are tolerated; an asset
    /// that is neither on disk nor in the sequence is NotFound.
    pub fn delete_asset(&self, dest: &str, filename: &str) -> Result<()> {
        self.with_meta_mut(dest, |meta| {
            let was_listed = meta.remove(filename);

            let path = self.asset_path(dest, filename);
            let existed = path.exists();
            if existed {
                fs::remove_file(&path)?;
            }
            sidecar::remove(&path)?;
            let thumb = self.thumbnail_path(dest, filename);
            if thumb.exists() {
                fs::remove_file(thumb)?;
            }

            if !was_listed && !existed {
                return Err(BucketError::NotFound(filename.to_string()));
            }
            Ok(())
        })
    }

    /// Mark a sequence member as favorite. Unknown filenames are NotFound.
    pub fn favorite(&self, dest: &str, filename: &str) -> Result<()> {
        self.with_meta_mut(dest, |meta| {
            if !meta.contains(filename) {
                return Err(BucketError::NotFound(filename.to_string()));
            }
            meta.add_favorite(filename);
            Ok(())
        })
    }

    /// Drop a filename from favorites. A no-op when absent.
    pub fn unfavorite(&self, dest: &str, filename: &str) -> Result<()> {
        self.with_meta_mut(dest, |meta| {
            meta.remove_favorite(filename);
            Ok(())
        })
    }

    /// Swap an item with its predecessor. The first element wraps to the
    /// end of the sequence.
    pub fn move_up(&self, dest: &str, filename: &str) -> Result<()> {
        self.with_meta_mut(dest, |meta| {
            let idx = position(meta, filename)?;
            if meta.sequence.len() < 2 {
                return Ok(());
            }
            if idx == 0 {
                let first = meta.sequence.remove(0);
                meta.sequence.push(first);
            } else {
                meta.sequence.swap(idx, idx - 1);
            }
            Ok(())
        })
    }

    /// Swap an item with its successor. The last element wraps to the front
    /// of the sequence.
    pub fn move_down(&self, dest: &str, filename: &str) -> Result<()> {
        self.with_meta_mut(dest, |meta| {
            let idx = position(meta, filename)?;
            let len = meta.sequence.len();
            if len < 2 {
                return Ok(());
            }
            if idx == len - 1 {
                let last = meta.sequence.remove(len - 1);
                meta.sequence.insert(0, last);
            } else {
                meta.sequence.swap(idx, idx + 1);
            }
            Ok(())
        })
    }

    /// Pure read of the full metadata document.
    pub fn list_items(&self, dest: &str) -> Result<BucketMetadata> {
        self.load_meta(dest)
    }

    // --- Cross-bucket transfer ---

    /// Copy an asset (and its sidecar) from one destination's bucket into
    /// another's. Returns the stored filename in the target bucket.
    pub fn copy_item(&self, src_dest: &str, filename: &str, dst_dest: &str) -> Result<String> {
        self.registry.get(src_dest)?;
        let source = self.asset_path(src_dest, filename);
        if !source.is_file() {
            return Err(BucketError::NotFound(filename.to_string()));
        }
        let stored = self.append_asset(dst_dest, &source, None)?;
        Ok(stored
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(filename)
            .to_string())
    }

    /// Move an asset between buckets: copy into the target, then delete
    /// from the source.
    pub fn move_item(&self, src_dest: &str, filename: &str, dst_dest: &str) -> Result<String> {
        let stored = self.copy_item(src_dest, filename, dst_dest)?;
        self.delete_asset(src_dest, filename)?;
        Ok(stored)
    }
}

fn position(meta: &BucketMetadata, filename: &str) -> Result<usize> {
    meta.sequence
        .iter()
        .position(|f| f == filename)
        .ok_or_else(|| BucketError::NotFound(filename.to_string()))
}

/// Collision-free name: UTC timestamp plus a short random suffix, keeping
/// the original extension.
fn unique_name(original: &str) -> String {
    let ext = Path::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("bin");
    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    let suffix: String = rand::thread_rng()
        .sample_iter(rand::distributions::Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!("{stamp}_{suffix}.{ext}")
}
