//! Image metadata extraction and JPEG normalization.

use crate::error::{BucketError, Result};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Extract an image's header info and EXIF tag map.
///
/// Returns an empty map when the file cannot be decoded; extraction is a
/// best-effort enrichment step and never fails the calling operation.
pub fn extract_metadata(path: &Path) -> Map<String, Value> {
    let mut meta = Map::new();

    match image::image_dimensions(path) {
        Ok((width, height)) => {
            meta.insert("width".into(), Value::from(width));
            meta.insert("height".into(), Value::from(height));
        }
        Err(err) => {
            tracing::debug!(path = %path.display(), %err, "Image header decode failed");
            return meta;
        }
    }

    if let Some(ext) = crate::media::extension_of(path) {
        meta.insert("format".into(), Value::String(ext));
    }

    for (tag, value) in read_exif_tags(path) {
        meta.insert(tag, Value::String(value));
    }

    meta
}

/// Read EXIF fields from the primary IFD as display strings.
/// Files without EXIF (e.g. PNG screenshots) yield an empty list.
fn read_exif_tags(path: &Path) -> Vec<(String, String)> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return Vec::new(),
    };
    let mut reader = BufReader::new(file);
    let exif = match exif::Reader::new().read_from_container(&mut reader) {
        Ok(e) => e,
        Err(_) => return Vec::new(),
    };

    exif.fields()
        .filter(|field| field.ifd_num == exif::In::PRIMARY)
        .map(|field| {
            (
                field.tag.to_string(),
                field.display_value().with_unit(&exif).to_string(),
            )
        })
        .collect()
}

/// Decode a raster image and re-encode it as JPEG at `dst`.
///
/// Used to normalize downloaded PNG/WebP sources so canonical slots stay
/// format-consistent. Alpha is flattened since JPEG has no alpha channel.
pub fn reencode_as_jpeg(src: &Path, dst: &Path) -> Result<()> {
    let img = image::open(src)
        .map_err(|e| BucketError::External(format!("image decode failed: {e}")))?;
    image::DynamicImage::ImageRgb8(img.to_rgb8())
        .save_with_format(dst, image::ImageFormat::Jpeg)
        .map_err(|e| BucketError::External(format!("jpeg encode failed: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_png(path: &Path, w: u32, h: u32) {
        let img = image::RgbImage::from_pixel(w, h, image::Rgb([10, 20, 30]));
        img.save_with_format(path, image::ImageFormat::Png).unwrap();
    }

    #[test]
    fn extracts_dimensions_from_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frame.png");
        write_png(&path, 64, 48);

        let meta = extract_metadata(&path);
        assert_eq!(meta.get("width"), Some(&Value::from(64)));
        assert_eq!(meta.get("height"), Some(&Value::from(48)));
        assert_eq!(meta.get("format"), Some(&Value::from("png")));
    }

    #[test]
    fn unreadable_file_yields_empty_map() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("garbage.jpg");
        std::fs::write(&path, b"not an image").unwrap();
        assert!(extract_metadata(&path).is_empty());
    }

    #[test]
    fn missing_file_yields_empty_map() {
        assert!(extract_metadata(Path::new("/no/such/file.jpg")).is_empty());
    }

    #[test]
    fn reencodes_png_to_jpeg() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("in.png");
        let dst = dir.path().join("out.jpg");
        write_png(&src, 32, 32);

        reencode_as_jpeg(&src, &dst).unwrap();

        let (w, h) = image::image_dimensions(&dst).unwrap();
        assert_eq!((w, h), (32, 32));
        let format = image::ImageFormat::from_path(&dst).unwrap();
        assert_eq!(format, image::ImageFormat::Jpeg);
    }

    #[test]
    fn reencode_rejects_non_image() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("bad.png");
        std::fs::write(&src, b"zzz").unwrap();
        let dst = dir.path().join("out.jpg");
        assert!(matches!(
            reencode_as_jpeg(&src, &dst),
            Err(BucketError::External(_))
        ));
    }
}
