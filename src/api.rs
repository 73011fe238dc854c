//! # Engine Facade
//!
//! [`Engine`] is the single entry point for consumers (the HTTP layer, a
//! background worker, tests). It constructs and wires the components
//! (store, history manager, publisher, maintenance) around one shared lock
//! registry and the injected collaborator traits, then exposes the public
//! surface as thin delegations.
//!
//! The one piece of logic that lives here is history navigation: `undo` and
//! `redo` move the pointer via the history manager, then re-publish the
//! pointed-at bucket file with `is_history_navigation = true` so the
//! canonical slot and sidecar update without growing the stack. If the
//! pointed-at file was since purged, the re-publish fails with `NotFound`
//! and the pointer stays at its new position; there is no skip-and-retry.

use crate::config::{DestinationRegistry, Settings};
use crate::error::{BucketError, Result};
use crate::history::{BatchNavResult, PublishHistoryManager, StackInfo};
use crate::maintenance::{BatchReport, BucketMaintenance, SweepSummary};
use crate::media::{ImageThumbnailer, ThumbnailGenerator};
use crate::model::BucketMetadata;
use crate::notify::{NullNotifier, OverlayNotifier};
use crate::publisher::{PublishOptions, PublishOutcome, Publisher};
use crate::store::locks::LockRegistry;
use crate::store::BucketStore;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

pub struct Engine {
    registry: Arc<DestinationRegistry>,
    store: Arc<BucketStore>,
    history: Arc<PublishHistoryManager>,
    publisher: Publisher,
    maintenance: BucketMaintenance,
}

impl Engine {
    /// Build an engine with the production collaborators: image-crate
    /// thumbnails and no overlay.
    pub fn new(settings: Settings, registry: DestinationRegistry) -> Self {
        let thumbnailer = Arc::new(ImageThumbnailer::new(settings.thumbnail_size));
        Self::with_collaborators(settings, registry, thumbnailer, Arc::new(NullNotifier))
    }

    /// Build an engine with injected collaborators.
    pub fn with_collaborators(
        settings: Settings,
        registry: DestinationRegistry,
        thumbnailer: Arc<dyn ThumbnailGenerator>,
        notifier: Arc<dyn OverlayNotifier>,
    ) -> Self {
        let registry = Arc::new(registry);
        let locks = Arc::new(LockRegistry::new());
        let max_history = settings.max_history;
        let store = Arc::new(BucketStore::new(
            settings,
            registry.clone(),
            locks,
            thumbnailer,
        ));
        let history = Arc::new(PublishHistoryManager::new(store.clone(), max_history));
        let publisher = Publisher::new(
            store.clone(),
            history.clone(),
            registry.clone(),
            notifier,
        );
        let maintenance = BucketMaintenance::new(store.clone(), registry.clone());
        Self {
            registry,
            store,
            history,
            publisher,
            maintenance,
        }
    }

    pub fn registry(&self) -> &DestinationRegistry {
        &self.registry
    }

    // --- Buckets & items ---

    pub fn create_bucket(&self, dest: &str) -> Result<()> {
        self.store.create_bucket(dest)
    }

    pub fn list_items(&self, dest: &str) -> Result<BucketMetadata> {
        self.store.list_items(dest)
    }

    /// Upload: append a local file to a destination's bucket.
    pub fn upload(
        &self,
        dest: &str,
        source: &Path,
        metadata: Option<&Map<String, Value>>,
    ) -> Result<String> {
        let stored = self.store.append_asset(dest, source, metadata)?;
        stored
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| BucketError::InvalidInput(format!("bad path: {}", stored.display())))
    }

    pub fn favorite(&self, dest: &str, filename: &str) -> Result<()> {
        self.store.favorite(dest, filename)
    }

    pub fn unfavorite(&self, dest: &str, filename: &str) -> Result<()> {
        self.store.unfavorite(dest, filename)
    }

    pub fn delete_item(&self, dest: &str, filename: &str) -> Result<()> {
        self.store.delete_asset(dest, filename)
    }

    pub fn move_up(&self, dest: &str, filename: &str) -> Result<()> {
        self.store.move_up(dest, filename)
    }

    pub fn move_down(&self, dest: &str, filename: &str) -> Result<()> {
        self.store.move_down(dest, filename)
    }

    pub fn copy_item(&self, src_dest: &str, filename: &str, dst_dest: &str) -> Result<String> {
        self.store.copy_item(src_dest, filename, dst_dest)
    }

    pub fn move_item(&self, src_dest: &str, filename: &str, dst_dest: &str) -> Result<String> {
        self.store.move_item(src_dest, filename, dst_dest)
    }

    // --- Publishing ---

    pub fn publish(
        &self,
        source: &str,
        dest: &str,
        metadata: Option<Map<String, Value>>,
        opts: PublishOptions,
    ) -> Result<PublishOutcome> {
        self.publisher.publish(source, dest, metadata, opts)
    }

    /// Pointer/size/current/can_undo/can_redo for a destination.
    pub fn published_info(&self, dest: &str) -> Result<StackInfo> {
        self.history.get_stack_info(dest)
    }

    /// Step one entry back in publish history and re-display it.
    pub fn undo(&self, dest: &str) -> Result<PublishOutcome> {
        let info = self.history.undo(dest)?;
        self.navigate_to(dest, &info)
    }

    /// Step one entry forward in publish history and re-display it.
    pub fn redo(&self, dest: &str) -> Result<PublishOutcome> {
        let info = self.history.redo(dest)?;
        self.navigate_to(dest, &info)
    }

    /// Undo across several destinations with independent failure domains.
    pub fn undo_for_targets(&self, dests: &[String]) -> BatchNavResult {
        let mut result = self.history.undo_for_targets(dests);
        self.navigate_batch(&mut result);
        result
    }

    /// Redo across several destinations with independent failure domains.
    pub fn redo_for_targets(&self, dests: &[String]) -> BatchNavResult {
        let mut result = self.history.redo_for_targets(dests);
        self.navigate_batch(&mut result);
        result
    }

    fn navigate_to(&self, dest: &str, info: &StackInfo) -> Result<PublishOutcome> {
        let entry = info
            .current
            .as_ref()
            .ok_or_else(|| BucketError::NoHistory(dest.to_string()))?;
        let source = self.store.asset_path(dest, &entry.filename);
        let source = source
            .to_str()
            .ok_or_else(|| BucketError::InvalidInput(format!("bad path: {}", source.display())))?
            .to_string();
        self.publisher.publish(
            &source,
            dest,
            Some(entry.metadata.clone()),
            PublishOptions {
                skip_bucket: Some(true),
                is_history_navigation: true,
                ..Default::default()
            },
        )
    }

    fn navigate_batch(&self, result: &mut BatchNavResult) {
        for (dest, info) in std::mem::take(&mut result.navigations) {
            if let Err(err) = self.navigate_to(&dest, &info) {
                tracing::warn!(dest, %err, "History navigation publish failed");
                result.downgrade(&dest, &err);
            }
        }
    }

    // --- Maintenance ---

    pub fn purge(&self, dest: &str, include_favorites: bool) -> Result<BatchReport> {
        self.maintenance.purge(dest, include_favorites)
    }

    pub fn reindex(&self, dest: &str, rebuild_all: bool) -> Result<BatchReport> {
        self.maintenance.reindex(dest, rebuild_all)
    }

    pub fn reindex_all(&self, rebuild_all: bool) -> SweepSummary {
        self.maintenance.reindex_all(rebuild_all)
    }

    pub fn extract_metadata(&self, path: &Path, force_rebuild: bool) -> Result<bool> {
        self.maintenance.extract_metadata(path, force_rebuild)
    }
}
