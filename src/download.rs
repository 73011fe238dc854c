//! Remote source fetching for the publisher.
//!
//! A publish source given as an `http(s)` URL is downloaded to a managed
//! temp file first. The extension is resolved in order: URL path, then the
//! `Content-Type` header (video → `.mp4`, known image types, default
//! `.jpg`), then byte sniffing. Download failures map to
//! [`BucketError::External`].

use crate::error::{BucketError, Result};
use crate::media;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// A downloaded publish source. The temp file is deleted on drop.
pub struct Download {
    file: NamedTempFile,
    pub ext: String,
}

impl Download {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Whether a publish source string is a remote URL rather than a local path.
pub fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Fetch a remote source into a temp file with a resolved extension.
pub fn fetch(url: &str) -> Result<Download> {
    let response = reqwest::blocking::get(url)
        .map_err(|e| BucketError::External(format!("download failed: {e}")))?;
    if !response.status().is_success() {
        return Err(BucketError::External(format!(
            "download failed: {} returned {}",
            url,
            response.status()
        )));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let bytes = response
        .bytes()
        .map_err(|e| BucketError::External(format!("download read failed: {e}")))?;

    let ext = resolve_extension(url, content_type.as_deref(), &bytes);

    let mut file = tempfile::Builder::new()
        .prefix("mediabucket-")
        .suffix(&format!(".{ext}"))
        .tempfile()?;
    file.write_all(&bytes)?;
    file.flush()?;

    tracing::debug!(url, ext, size = bytes.len(), "Fetched remote source");
    Ok(Download { file, ext })
}

/// Resolve the downloaded file's extension: URL path first, Content-Type
/// second, byte sniffing third, `.jpg` as the final fallback.
fn resolve_extension(url: &str, content_type: Option<&str>, bytes: &[u8]) -> String {
    if let Some(ext) = extension_from_url(url) {
        return ext;
    }
    if let Some(ext) = extension_from_content_type(content_type) {
        return ext;
    }
    if let Some(kind) = infer::get(bytes) {
        let ext = kind.extension();
        if media::ALLOWED_EXTENSIONS.contains(&ext) {
            return ext.to_string();
        }
    }
    "jpg".to_string()
}

fn extension_from_url(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let ext = media::extension_of(Path::new(parsed.path()))?;
    let known = media::ALLOWED_EXTENSIONS.contains(&ext.as_str())
        || media::VIDEO_EXTENSIONS.contains(&ext.as_str());
    known.then_some(ext)
}

fn extension_from_content_type(content_type: Option<&str>) -> Option<String> {
    let mime = content_type?.split(';').next()?.trim();
    if mime.starts_with("video/") {
        return Some("mp4".to_string());
    }
    match mime {
        "image/jpeg" => Some("jpg".to_string()),
        "image/png" => Some("png".to_string()),
        "image/webp" => Some("webp".to_string()),
        _ => None,
    }
}
