//! # Media Kinds and Metadata Extraction
//!
//! Every asset is classified once, at the point its path is first seen, into
//! a [`MediaKind`]. All format-specific behavior (metadata extraction,
//! thumbnailability, canonical-slot handling) dispatches on that kind rather
//! than re-inspecting the extension at each call site.
//!
//! Extraction contracts:
//! - Image: decoded header (dimensions, format) plus an EXIF tag map.
//! - Video: mp4/mov container probe (dimensions, fps, duration, frames).
//! - Unsupported or unreadable input yields an empty map, never an error.

use serde_json::{Map, Value};
use std::path::Path;

pub mod image;
pub mod thumbnail;
pub mod video;

pub use thumbnail::{ImageThumbnailer, ThumbnailGenerator};

/// Extensions accepted into a bucket.
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "mp4", "mov"];

/// Image subset of [`ALLOWED_EXTENSIONS`].
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Extensions treated as video for probing. Wider than the bucket set:
/// webm/mkv sources can be probed even though buckets never store them.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "webm", "mkv"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify a path by extension. Returns `None` for non-media files.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = extension_of(path)?;
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    /// Run format-specific metadata extraction for this kind.
    /// Unreadable input degrades to an empty map.
    pub fn extract_metadata(&self, path: &Path) -> Map<String, Value> {
        match self {
            MediaKind::Image => image::extract_metadata(path),
            MediaKind::Video => video::extract_metadata(path),
        }
    }
}

/// Lowercased extension of a path, if any.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Whether a filename is eligible for bucket membership.
pub fn is_allowed(path: &Path) -> bool {
    extension_of(path)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_extension() {
        assert_eq!(MediaKind::from_path(Path::new("a.JPG")), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_path(Path::new("a.webp")), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_path(Path::new("a.mov")), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_path(Path::new("clip.mkv")), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_path(Path::new("notes.txt")), None);
        assert_eq!(MediaKind::from_path(Path::new("no_ext")), None);
    }

    #[test]
    fn bucket_membership_is_narrower_than_probing() {
        assert!(is_allowed(Path::new("a.mp4")));
        assert!(!is_allowed(Path::new("a.mkv")));
        assert!(!is_allowed(Path::new("a.json")));
    }
}
