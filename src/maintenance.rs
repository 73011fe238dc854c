//! # Bucket Maintenance
//!
//! Batch reconciliation over a destination's bucket: `purge` (bulk delete
//! with favorite retention and orphan-thumbnail sweep), `reindex` (re-derive
//! the metadata document from the directory listing, regenerating sidecars
//! and thumbnails), and `extract_metadata` (one asset's sidecar from
//! format-specific extraction).
//!
//! All batch operations are best-effort: a failure on one item is recorded
//! in the report and processing continues; cross-destination sweeps keep
//! independent failure domains per destination.

use crate::config::DestinationRegistry;
use crate::error::Result;
use crate::media::{self, MediaKind};
use crate::sidecar;
use crate::store::BucketStore;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Per-item outcome of a batch operation.
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub filename: String,
    pub success: bool,
    pub error: Option<String>,
}

impl ItemOutcome {
    fn ok(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            success: true,
            error: None,
        }
    }

    fn failed(filename: impl Into<String>, error: impl ToString) -> Self {
        Self {
            filename: filename.into(),
            success: false,
            error: Some(error.to_string()),
        }
    }
}

/// Result of one batch operation over a single destination.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub items: Vec<ItemOutcome>,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchReport {
    fn push(&mut self, outcome: ItemOutcome) {
        if outcome.success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.items.push(outcome);
    }
}

/// Result of a sweep across every registered destination.
#[derive(Debug, Default)]
pub struct SweepSummary {
    pub reports: HashMap<String, BatchReport>,
    pub errors: HashMap<String, String>,
}

pub struct BucketMaintenance {
    store: Arc<BucketStore>,
    registry: Arc<DestinationRegistry>,
}

impl BucketMaintenance {
    pub fn new(store: Arc<BucketStore>, registry: Arc<DestinationRegistry>) -> Self {
        Self { store, registry }
    }

    /// Delete every sequence member (file, sidecar, thumbnail) except
    /// favorites when `include_favorites` is false, then sweep the
    /// thumbnails directory for orphans whose stem has no surviving member.
    pub fn purge(&self, dest: &str, include_favorites: bool) -> Result<BatchReport> {
        let mut report = BatchReport::default();
        self.store.with_meta_mut(dest, |meta| {
            for filename in meta.sequence.clone() {
                if !include_favorites && meta.is_favorite(&filename) {
                    continue;
                }
                match self.remove_asset_files(dest, &filename) {
                    Ok(()) => {
                        meta.remove(&filename);
                        report.push(ItemOutcome::ok(&filename));
                    }
                    Err(err) => {
                        tracing::warn!(dest, filename, %err, "Purge item failed");
                        report.push(ItemOutcome::failed(&filename, &err));
                    }
                }
            }

            self.sweep_orphan_thumbnails(dest, &meta.sequence);
            Ok(())
        })?;
        Ok(report)
    }

    fn remove_asset_files(&self, dest: &str, filename: &str) -> Result<()> {
        let path = self.store.asset_path(dest, filename);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        sidecar::remove(&path)?;
        let thumb = self.store.thumbnail_path(dest, filename);
        if thumb.exists() {
            fs::remove_file(thumb)?;
        }
        Ok(())
    }

    /// Delete thumbnails whose stem matches no surviving sequence member.
    fn sweep_orphan_thumbnails(&self, dest: &str, sequence: &[String]) {
        let surviving: HashSet<String> = sequence
            .iter()
            .filter_map(|f| {
                Path::new(f)
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::to_string)
            })
            .collect();

        let dir = self.store.thumbnails_dir(dest);
        let entries = match fs::read_dir(&dir) {
            Ok(e) => e,
            Err(_) => return, // no thumbnails directory yet
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
            if !surviving.contains(stem) {
                if let Err(err) = fs::remove_file(&path) {
                    tracing::warn!(dest, thumb = %path.display(), %err, "Orphan sweep failed");
                }
            }
        }
    }

    /// Recompute `sequence` from the directory listing (allowed extensions,
    /// sorted by name), intersect `favorites` with it, and regenerate
    /// sidecars/thumbnails: all of them when `rebuild_all`, otherwise only
    /// the missing ones.
    pub fn reindex(&self, dest: &str, rebuild_all: bool) -> Result<BatchReport> {
        let mut report = BatchReport::default();
        self.store.with_meta_mut(dest, |meta| {
            let dir = self.store.bucket_dir(dest);
            let mut listing = Vec::new();
            if dir.exists() {
                for entry in fs::read_dir(&dir)?.flatten() {
                    let path = entry.path();
                    if path.is_file() && media::is_allowed(&path) {
                        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                            listing.push(name.to_string());
                        }
                    }
                }
            }
            listing.sort();

            meta.sequence = listing;
            meta.retain_valid_favorites();

            for filename in meta.sequence.clone() {
                let path = self.store.asset_path(dest, &filename);
                let mut errors = Vec::new();

                match self.extract_metadata(&path, rebuild_all) {
                    Ok(_) => {}
                    Err(err) => errors.push(err.to_string()),
                }

                let thumb = self.store.thumbnail_path(dest, &filename);
                if rebuild_all || !thumb.exists() {
                    if let Err(err) = self.store.generate_thumbnail(dest, &path) {
                        // Thumbnail failure stays non-fatal, same as append.
                        tracing::debug!(dest, filename, %err, "Reindex thumbnail skipped");
                    }
                }

                if errors.is_empty() {
                    report.push(ItemOutcome::ok(&filename));
                } else {
                    report.push(ItemOutcome::failed(&filename, errors.join("; ")));
                }
            }
            Ok(())
        })?;
        Ok(report)
    }

    /// Ensure an asset has a sidecar. A no-op when one exists and
    /// `force_rebuild` is false; otherwise runs format-specific extraction
    /// and merges the result, preserving unrelated existing keys. Returns
    /// whether a sidecar was written.
    pub fn extract_metadata(&self, path: &Path, force_rebuild: bool) -> Result<bool> {
        if sidecar::exists(path) && !force_rebuild {
            return Ok(false);
        }
        let Some(kind) = MediaKind::from_path(path) else {
            return Ok(false);
        };
        let extracted = kind.extract_metadata(path);
        if extracted.is_empty() {
            return Ok(false);
        }
        sidecar::merge(path, &extracted)?;
        Ok(true)
    }

    /// Reindex every registered destination. One destination's failure is
    /// recorded and never aborts the rest.
    pub fn reindex_all(&self, rebuild_all: bool) -> SweepSummary {
        let mut summary = SweepSummary::default();
        for dest in self.registry.ids() {
            match self.reindex(dest, rebuild_all) {
                Ok(report) => {
                    summary.reports.insert(dest.to_string(), report);
                }
                Err(err) => {
                    tracing::warn!(dest, %err, "Reindex failed");
                    summary.errors.insert(dest.to_string(), err.to_string());
                }
            }
        }
        summary
    }
}
