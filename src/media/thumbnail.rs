//! Thumbnail generation behind a trait seam.
//!
//! The store and maintenance layers only know the [`ThumbnailGenerator`]
//! contract: asset path in, JPEG bytes out. Production uses
//! [`ImageThumbnailer`]; tests inject fakes. Generation failure is always
//! non-fatal to the calling operation: callers log and move on.

use crate::error::{BucketError, Result};
use crate::media::MediaKind;
use std::io::Cursor;
use std::path::Path;

/// Produces a fixed-square JPEG preview for an asset.
pub trait ThumbnailGenerator: Send + Sync {
    fn generate(&self, asset: &Path) -> Result<Vec<u8>>;
}

/// Image-crate backed generator. Crops to a centered square and scales to
/// the configured dimension.
///
/// Video inputs are rejected: still extraction would need a decoder stack,
/// and a missing thumbnail is already an accepted outcome for callers.
pub struct ImageThumbnailer {
    size: u32,
}

impl ImageThumbnailer {
    pub fn new(size: u32) -> Self {
        Self { size }
    }
}

impl ThumbnailGenerator for ImageThumbnailer {
    fn generate(&self, asset: &Path) -> Result<Vec<u8>> {
        match MediaKind::from_path(asset) {
            Some(MediaKind::Image) => {}
            Some(MediaKind::Video) => {
                return Err(BucketError::External(
                    "video thumbnail extraction is not supported".to_string(),
                ))
            }
            None => {
                return Err(BucketError::InvalidInput(format!(
                    "not a media file: {}",
                    asset.display()
                )))
            }
        }

        let img = image::open(asset)
            .map_err(|e| BucketError::External(format!("thumbnail decode failed: {e}")))?;
        let thumb = img.resize_to_fill(self.size, self.size, image::imageops::FilterType::Triangle);

        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(thumb.to_rgb8())
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
            .map_err(|e| BucketError::External(format!("thumbnail encode failed: {e}")))?;
        Ok(bytes)
    }
}
