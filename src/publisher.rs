//! # Publisher
//!
//! Orchestrates "make asset X the currently displayed item for destination
//! D". A publish runs these steps in order:
//!
//! 1. `blank` swaps the source for the black sentinel image and forces
//!    `skip_bucket`.
//! 2. Remote URLs are downloaded; non-JPEG raster downloads are re-encoded
//!    as JPEG for format consistency. The temp file is dropped after use.
//! 3. An unset `skip_bucket` defaults to `true` for pre-existing local
//!    files and `false` otherwise: fresh content is bucketed by default,
//!    republishing an already-bucketed file does not re-add it.
//! 4. Unless skipped, the asset is appended to the bucket and the
//!    bucket-resident copy becomes the publish source.
//! 5. Headless destinations stop here (successfully).
//! 6. The source is copied to the canonical slot `<root>/<dest>.<ext>` and
//!    its mtime is touched explicitly so filesystem watchers fire even for
//!    byte-identical content.
//! 7. The canonical sidecar is written from caller metadata, or from
//!    format-specific extraction when no metadata was supplied.
//! 8. Unless this is history navigation, a new history entry is pushed.
//! 9. Unless silenced, the overlay notifier receives a display event.
//!
//! Failures are fail-fast with no rollback of steps already completed.

use crate::config::DestinationRegistry;
use crate::download;
use crate::error::{BucketError, Result};
use crate::history::PublishHistoryManager;
use crate::media::{self, MediaKind};
use crate::model::HistoryEntry;
use crate::notify::{DisplayEvent, OverlayNotifier};
use crate::sidecar;
use crate::store::BucketStore;
use chrono::{DateTime, Utc};
use filetime::FileTime;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const BLANK_SENTINEL: &str = "blank.jpg";

#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    /// When unset, resolved from the source kind (step 3).
    pub skip_bucket: Option<bool>,
    /// Suppress the overlay notification.
    pub silent: bool,
    /// Publish the black sentinel instead of `source`.
    pub blank: bool,
    /// Set exclusively by undo/redo callers: update the canonical slot and
    /// sidecar without growing the history stack.
    pub is_history_navigation: bool,
}

#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub filename: String,
    pub published_at: DateTime<Utc>,
}

pub struct Publisher {
    store: Arc<BucketStore>,
    history: Arc<PublishHistoryManager>,
    registry: Arc<DestinationRegistry>,
    notifier: Arc<dyn OverlayNotifier>,
}

impl Publisher {
    pub fn new(
        store: Arc<BucketStore>,
        history: Arc<PublishHistoryManager>,
        registry: Arc<DestinationRegistry>,
        notifier: Arc<dyn OverlayNotifier>,
    ) -> Self {
        Self {
            store,
            history,
            registry,
            notifier,
        }
    }

    pub fn publish(
        &self,
        source: &str,
        dest: &str,
        metadata: Option<Map<String, Value>>,
        opts: PublishOptions,
    ) -> Result<PublishOutcome> {
        let destination = self.registry.get(dest)?.clone();

        // Steps 1-3: resolve the local source path and the skip_bucket
        // flag. The two holders keep temp files alive until the canonical
        // copy is done; they are deleted on drop.
        let mut _downloaded: Option<download::Download> = None;
        let mut _reencoded: Option<tempfile::NamedTempFile> = None;
        let (mut source_path, skip_bucket) = if opts.blank {
            (self.ensure_blank_sentinel()?, true)
        } else if download::is_url(source) {
            let fetched = download::fetch(source)?;
            let path = self.normalize_download(&fetched, &mut _reencoded)?;
            _downloaded = Some(fetched);
            (path, opts.skip_bucket.unwrap_or(false))
        } else {
            let path = PathBuf::from(source);
            if !path.is_file() {
                return Err(BucketError::NotFound(source.to_string()));
            }
            (path, opts.skip_bucket.unwrap_or(true))
        };

        // Step 4: bucket the asset; the bucket-resident copy becomes the
        // publish source so the canonical slot always mirrors a member.
        if !skip_bucket && destination.has_bucket {
            source_path = self
                .store
                .append_asset(dest, &source_path, metadata.as_ref())?;
        }

        let filename = file_name_of(&source_path)?;
        let published_at = Utc::now();

        // Step 5: headless destinations have no canonical slot, history or
        // overlay; the (possibly bucketed) publish still succeeded.
        if destination.headless {
            return Ok(PublishOutcome {
                filename,
                published_at,
            });
        }

        // Step 6: canonical slot.
        let canonical = self.write_canonical(dest, &source_path)?;

        // Step 7: canonical sidecar. `write_canonical` cleared the prior
        // one, so the slot's sidecar always describes the asset just
        // copied in.
        match &metadata {
            Some(map) => sidecar::write(&canonical, map)?,
            None => {
                if let Some(kind) = MediaKind::from_path(&canonical) {
                    let extracted = kind.extract_metadata(&canonical);
                    if !extracted.is_empty() {
                        sidecar::write(&canonical, &extracted)?;
                    }
                }
            }
        }

        // Step 8: push history unless navigating, then record what is
        // published. Seeding derives a legacy entry from a recorded
        // filename with an empty stack, so the record must not precede
        // the push.
        if !opts.is_history_navigation {
            let mut entry = HistoryEntry::new(filename.clone());
            entry.published_at = published_at;
            if !skip_bucket && destination.has_bucket {
                entry.raw_url = Some(format!("/buckets/{dest}/{filename}"));
                entry.thumbnail_url = Some(format!(
                    "/buckets/{dest}/thumbnails/{}.jpg",
                    stem_of(&filename)
                ));
            }
            if let Some(map) = &metadata {
                entry.metadata = map.clone();
            }
            self.history.push_new_image(dest, entry)?;
        }

        self.store.with_meta_mut(dest, |meta| {
            let published = meta.published_meta_mut();
            published.filename = Some(filename.clone());
            published.published_at = Some(published_at);
            Ok(())
        })?;

        // Step 9: overlay notification.
        if !opts.silent {
            let settings = self.store.settings();
            self.notifier.display(DisplayEvent {
                destination_ids: vec![dest.to_string()],
                template: settings.overlay_template.clone(),
                substitutions: overlay_substitutions(metadata.as_ref()),
                duration_ms: settings.overlay_duration_ms,
            });
        }

        tracing::info!(dest, filename, "Published");
        Ok(PublishOutcome {
            filename,
            published_at,
        })
    }

    /// Re-encode a downloaded non-JPEG raster image as JPEG, passing video
    /// and JPEG downloads through unchanged.
    fn normalize_download(
        &self,
        fetched: &download::Download,
        keep: &mut Option<tempfile::NamedTempFile>,
    ) -> Result<PathBuf> {
        let is_raster = media::IMAGE_EXTENSIONS.contains(&fetched.ext.as_str());
        if !is_raster || fetched.ext == "jpg" || fetched.ext == "jpeg" {
            let path = fetched.path().to_path_buf();
            return Ok(path);
        }

        let reencoded = tempfile::Builder::new()
            .prefix("mediabucket-")
            .suffix(".jpg")
            .tempfile()?;
        media::image::reencode_as_jpeg(fetched.path(), reencoded.path())?;
        let path = reencoded.path().to_path_buf();
        *keep = Some(reencoded);
        Ok(path)
    }

    /// Copy the source over the canonical slot, clearing canonical files of
    /// other extensions so exactly one remains, and touch its mtime.
    fn write_canonical(&self, dest: &str, source: &Path) -> Result<PathBuf> {
        let ext = media::extension_of(source).ok_or_else(|| {
            BucketError::InvalidInput(format!("source has no extension: {}", source.display()))
        })?;
        let root = &self.store.settings().root;
        fs::create_dir_all(root)?;

        for other in media::ALLOWED_EXTENSIONS {
            if *other == ext {
                continue;
            }
            let stale = root.join(format!("{dest}.{other}"));
            if stale.exists() {
                fs::remove_file(&stale)?;
            }
            sidecar::remove(&stale)?;
        }

        let canonical = root.join(format!("{dest}.{ext}"));
        // The prior sidecar described the prior asset.
        sidecar::remove(&canonical)?;
        fs::copy(source, &canonical)?;
        filetime::set_file_mtime(&canonical, FileTime::now())?;
        Ok(canonical)
    }

    /// Create the black sentinel image on first use.
    fn ensure_blank_sentinel(&self) -> Result<PathBuf> {
        let root = &self.store.settings().root;
        let path = root.join(BLANK_SENTINEL);
        if !path.exists() {
            fs::create_dir_all(root)?;
            image::RgbImage::new(1, 32)
                .save_with_format(&path, image::ImageFormat::Jpeg)
                .map_err(|e| BucketError::External(format!("sentinel encode failed: {e}")))?;
        }
        Ok(path)
    }
}

fn file_name_of(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| BucketError::InvalidInput(format!("bad path: {}", path.display())))
}

fn stem_of(filename: &str) -> &str {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
}

/// Build overlay substitutions from publish metadata: prompt, workflow,
/// seed and dimensions when present.
fn overlay_substitutions(metadata: Option<&Map<String, Value>>) -> HashMap<String, String> {
    let mut subs = HashMap::new();
    let Some(map) = metadata else {
        return subs;
    };

    for key in ["prompt", "workflow", "seed"] {
        if let Some(value) = map.get(key) {
            subs.insert(key.to_string(), stringify(value));
        }
    }
    if let (Some(w), Some(h)) = (map.get("width"), map.get("height")) {
        subs.insert("dimensions".to_string(), format!("{}x{}", stringify(w), stringify(h)));
    }
    subs
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
