//! # Domain Model: Bucket Metadata and Publish History
//!
//! One [`BucketMetadata`] document is persisted per destination as
//! `bucket.json` inside that destination's bucket directory. It carries:
//!
//! - `sequence`: the ordered list of asset filenames in the bucket.
//! - `favorites`: the subset of `sequence` protected from non-destructive
//!   purge. Stored as a JSON array for stable round-trips, treated as a set
//!   in code.
//! - `published_meta`: what is currently displayed, plus the bounded
//!   newest-first [`HistoryEntry`] stack and its cursor.
//!
//! ## Invariants
//!
//! - `favorites ⊆ sequence` after every store mutation.
//! - When `history_stack` is non-empty, `0 <= current_pointer < len`.
//! - Index 0 of `history_stack` is the newest entry.
//!
//! ## Legacy documents
//!
//! Buckets written before publish history existed have no `published_meta`
//! and may lack `favorites` entirely; every field beyond `sequence` is
//! deserialization-optional so old documents load cleanly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One persisted step of publish history. Newest entry is index 0.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub filename: String,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub raw_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl HistoryEntry {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            published_at: Utc::now(),
            raw_url: None,
            thumbnail_url: None,
            metadata: Map::new(),
        }
    }
}

/// Currently-published state for a destination, embedded in [`BucketMetadata`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PublishedMeta {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub history_stack: Vec<HistoryEntry>,
    #[serde(default)]
    pub current_pointer: usize,
}

/// The per-destination metadata document (`bucket.json`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BucketMetadata {
    #[serde(default)]
    pub sequence: Vec<String>,
    #[serde(default)]
    pub favorites: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_meta: Option<PublishedMeta>,
}

impl BucketMetadata {
    pub fn is_favorite(&self, filename: &str) -> bool {
        self.favorites.iter().any(|f| f == filename)
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.sequence.iter().any(|f| f == filename)
    }

    /// Add to favorites, deduplicating. Caller is responsible for checking
    /// sequence membership first.
    pub fn add_favorite(&mut self, filename: &str) {
        if !self.is_favorite(filename) {
            self.favorites.push(filename.to_string());
        }
    }

    pub fn remove_favorite(&mut self, filename: &str) {
        self.favorites.retain(|f| f != filename);
    }

    /// Drop a filename from both lists. Returns true if it was in `sequence`.
    pub fn remove(&mut self, filename: &str) -> bool {
        let was_present = self.contains(filename);
        self.sequence.retain(|f| f != filename);
        self.remove_favorite(filename);
        was_present
    }

    /// Re-establish `favorites ⊆ sequence` after a bulk sequence rewrite.
    pub fn retain_valid_favorites(&mut self) {
        let sequence = &self.sequence;
        self.favorites.retain(|f| sequence.contains(f));
    }

    /// Access the published state, creating an empty one on first use.
    pub fn published_meta_mut(&mut self) -> &mut PublishedMeta {
        self.published_meta.get_or_insert_with(PublishedMeta::default)
    }
}
