//! # Publish History Manager
//!
//! Bounded undo/redo navigation over a destination's past publishes. The
//! state is a single newest-first stack plus a cursor, persisted inside
//! `bucket.json` as `published_meta.history_stack` / `current_pointer`:
//!
//! ```text
//! stack:   [newest, ..., oldest]     (index 0 = most recent publish)
//! pointer: 0 = at newest; len-1 = at oldest
//! ```
//!
//! Rules:
//! - A genuine publish pushes a new entry: if the pointer has moved off the
//!   newest entry, the stack is first truncated to `stack[..=pointer]`;
//!   then the entry is inserted at index 0, the stack is trimmed to
//!   `max_entries` oldest-first, and the pointer resets to 0.
//! - `undo` / `redo` move only the pointer; stack contents never change.
//! - A stackless bucket that already records a published file is seeded
//!   with one entry derived from it, so the first undo has somewhere to
//!   land before a second real publish happens.
//!
//! Entries are not validated against current bucket contents: an entry can
//! reference a file later purged, in which case navigation succeeds at the
//! pointer level and the subsequent re-publish fails with NotFound.

use crate::error::{BucketError, Result};
use crate::model::{HistoryEntry, PublishedMeta};
use crate::store::BucketStore;
use std::collections::HashMap;
use std::sync::Arc;

/// Snapshot of a destination's history state after an operation.
#[derive(Debug, Clone)]
pub struct StackInfo {
    pub current: Option<HistoryEntry>,
    pub pointer: usize,
    pub stack_size: usize,
    pub can_undo: bool,
    pub can_redo: bool,
}

impl StackInfo {
    fn from_published(published: &PublishedMeta) -> Self {
        let size = published.history_stack.len();
        let pointer = published.current_pointer;
        Self {
            current: published.history_stack.get(pointer).cloned(),
            pointer,
            stack_size: size,
            can_undo: size > 0 && pointer < size - 1,
            can_redo: pointer > 0,
        }
    }
}

/// Per-destination outcome of a batch undo/redo.
#[derive(Debug, Clone)]
pub struct TargetOutcome {
    pub success: bool,
    pub filename: Option<String>,
    pub error: Option<String>,
    pub can_undo: bool,
    pub can_redo: bool,
}

/// Aggregate result of a batch undo/redo across destinations.
#[derive(Debug, Default)]
pub struct BatchNavResult {
    pub outcomes: HashMap<String, TargetOutcome>,
    pub succeeded: usize,
    pub failed: usize,
    /// Post-navigation stack snapshots for the successful destinations,
    /// taken under each destination's lock. The facade publishes from
    /// these; re-reading the document later could observe a concurrent
    /// pointer move.
    pub(crate) navigations: Vec<(String, StackInfo)>,
}

impl BatchNavResult {
    pub(crate) fn record(&mut self, dest: &str, result: Result<StackInfo>) {
        match result {
            Ok(info) => {
                self.succeeded += 1;
                self.outcomes.insert(
                    dest.to_string(),
                    TargetOutcome {
                        success: true,
                        filename: info.current.as_ref().map(|e| e.filename.clone()),
                        error: None,
                        can_undo: info.can_undo,
                        can_redo: info.can_redo,
                    },
                );
                self.navigations.push((dest.to_string(), info));
            }
            Err(err) => {
                self.failed += 1;
                self.outcomes.insert(
                    dest.to_string(),
                    TargetOutcome {
                        success: false,
                        filename: None,
                        error: Some(err.to_string()),
                        can_undo: false,
                        can_redo: false,
                    },
                );
            }
        }
    }

    /// Replace a previously-successful outcome with a failure (used when a
    /// later step, e.g. the history-navigation publish, fails).
    pub(crate) fn downgrade(&mut self, dest: &str, err: &BucketError) {
        if let Some(outcome) = self.outcomes.get_mut(dest) {
            if outcome.success {
                self.succeeded -= 1;
                self.failed += 1;
            }
            outcome.success = false;
            outcome.filename = None;
            outcome.error = Some(err.to_string());
        }
    }
}

pub struct PublishHistoryManager {
    store: Arc<BucketStore>,
    max_entries: usize,
}

impl PublishHistoryManager {
    pub fn new(store: Arc<BucketStore>, max_entries: usize) -> Self {
        Self { store, max_entries }
    }

    /// Record a genuine publish. When the pointer sits below the newest
    /// entry (an undo happened), entries older than the pointer are dropped
    /// first; then the entry is inserted at index 0, the stack is trimmed
    /// to `max_entries`, and the pointer resets to the newest entry.
    pub fn push_new_image(&self, dest: &str, entry: HistoryEntry) -> Result<StackInfo> {
        let max = self.max_entries;
        self.store.with_meta_mut(dest, |meta| {
            let published = meta.published_meta_mut();
            seed_if_stackless(published);

            // Pointer at 0 means no undo is in effect; the stack must
            // accumulate untouched.
            if published.current_pointer > 0 {
                published
                    .history_stack
                    .truncate(published.current_pointer + 1);
            }

            published.history_stack.insert(0, entry);
            if published.history_stack.len() > max {
                published.history_stack.truncate(max);
            }
            published.current_pointer = 0;

            tracing::debug!(
                dest,
                stack_size = published.history_stack.len(),
                "History entry pushed"
            );
            Ok(StackInfo::from_published(published))
        })
    }

    /// Step the pointer one entry older. Fails on an empty stack or when
    /// already at the oldest entry; failures leave the document untouched.
    pub fn undo(&self, dest: &str) -> Result<StackInfo> {
        self.store.with_meta_mut(dest, |meta| {
            let published = meta.published_meta_mut();
            seed_if_stackless(published);

            let len = published.history_stack.len();
            if len == 0 {
                return Err(BucketError::NoHistory(dest.to_string()));
            }
            if published.current_pointer >= len - 1 {
                return Err(BucketError::AtOldest);
            }
            published.current_pointer += 1;

            tracing::debug!(dest, pointer = published.current_pointer, "Undo");
            Ok(StackInfo::from_published(published))
        })
    }

    /// Step the pointer one entry newer. Fails on an empty stack or when
    /// already at the newest entry; failures leave the document untouched.
    pub fn redo(&self, dest: &str) -> Result<StackInfo> {
        self.store.with_meta_mut(dest, |meta| {
            let published = meta.published_meta_mut();
            seed_if_stackless(published);

            if published.history_stack.is_empty() {
                return Err(BucketError::NoHistory(dest.to_string()));
            }
            if published.current_pointer == 0 {
                return Err(BucketError::AtNewest);
            }
            published.current_pointer -= 1;

            tracing::debug!(dest, pointer = published.current_pointer, "Redo");
            Ok(StackInfo::from_published(published))
        })
    }

    /// Pure read of pointer/size/current/can_undo/can_redo. Seeding is
    /// applied to the returned view but not persisted.
    pub fn get_stack_info(&self, dest: &str) -> Result<StackInfo> {
        let meta = self.store.load_meta(dest)?;
        let mut published = meta.published_meta.unwrap_or_default();
        seed_if_stackless(&mut published);
        Ok(StackInfo::from_published(&published))
    }

    /// Apply `undo` to each destination independently: one destination's
    /// failure never blocks or rolls back the others.
    pub fn undo_for_targets(&self, dests: &[String]) -> BatchNavResult {
        let mut result = BatchNavResult::default();
        for dest in dests {
            result.record(dest, self.undo(dest));
        }
        result
    }

    /// Apply `redo` to each destination independently.
    pub fn redo_for_targets(&self, dests: &[String]) -> BatchNavResult {
        let mut result = BatchNavResult::default();
        for dest in dests {
            result.record(dest, self.redo(dest));
        }
        result
    }
}

/// Give undo something to land on: a bucket that already records a
/// published file but has no stack gets one entry derived from it.
fn seed_if_stackless(published: &mut PublishedMeta) {
    if !published.history_stack.is_empty() {
        return;
    }
    if let Some(filename) = published.filename.clone() {
        let mut entry = HistoryEntry::new(filename);
        if let Some(at) = published.published_at {
            entry.published_at = at;
        }
        published.history_stack.push(entry);
        published.current_pointer = 0;
    }
}
