//! # Configuration
//!
//! Two read-only inputs configure the engine:
//!
//! - [`Settings`]: storage root plus tuning knobs (history depth, thumbnail
//!   size, overlay defaults). A plain serde struct with compiled defaults;
//!   callers construct it directly or load it from a JSON file.
//! - [`DestinationRegistry`]: the set of known destinations and their
//!   capability flags. The engine never mutates it; unknown destination ids
//!   fail lookups with [`BucketError::DestinationNotFound`].

use crate::error::{BucketError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

fn default_max_history() -> usize {
    99
}

fn default_thumbnail_size() -> u32 {
    256
}

fn default_overlay_template() -> String {
    "published".to_string()
}

fn default_overlay_duration_ms() -> u64 {
    8_000
}

/// Engine-wide settings. All paths under `root` follow the fixed on-disk
/// layout: `<root>/<dest>/` for buckets, `<root>/<dest>.<ext>` for the
/// canonical slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Storage root for all destinations.
    pub root: PathBuf,

    /// Maximum publish-history entries kept per destination.
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Square dimension of generated thumbnails, in pixels.
    #[serde(default = "default_thumbnail_size")]
    pub thumbnail_size: u32,

    /// Overlay template name sent with display notifications.
    #[serde(default = "default_overlay_template")]
    pub overlay_template: String,

    /// How long the overlay shows a display notification.
    #[serde(default = "default_overlay_duration_ms")]
    pub overlay_duration_ms: u64,
}

impl Settings {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_history: default_max_history(),
            thumbnail_size: default_thumbnail_size(),
            overlay_template: default_overlay_template(),
            overlay_duration_ms: default_overlay_duration_ms(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// A named publish target with its capability flags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Destination {
    pub id: String,
    /// Whether this destination keeps a bucket of assets.
    #[serde(default = "crate::config::default_true")]
    pub has_bucket: bool,
    /// Headless destinations accept bucket writes but have no canonical
    /// display slot and receive no overlay notifications.
    #[serde(default)]
    pub headless: bool,
}

pub(crate) fn default_true() -> bool {
    true
}

impl Destination {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            has_bucket: true,
            headless: false,
        }
    }

    pub fn headless(mut self) -> Self {
        self.headless = true;
        self
    }
}

/// Read-only lookup of known destinations.
#[derive(Debug, Clone, Default)]
pub struct DestinationRegistry {
    destinations: HashMap<String, Destination>,
}

impl DestinationRegistry {
    pub fn new(destinations: Vec<Destination>) -> Self {
        Self {
            destinations: destinations.into_iter().map(|d| (d.id.clone(), d)).collect(),
        }
    }

    /// Load a registry from a JSON array of destination records.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let destinations: Vec<Destination> = serde_json::from_str(&content)?;
        Ok(Self::new(destinations))
    }

    pub fn get(&self, id: &str) -> Result<&Destination> {
        self.destinations
            .get(id)
            .ok_or_else(|| BucketError::DestinationNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.destinations.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.destinations.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }
}
