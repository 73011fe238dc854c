//! # Sidecar Metadata Store
//!
//! Every asset may carry one JSON metadata document ("sidecar") stored next
//! to it. The sidecar path is derived from the asset path by appending
//! `.json` to the *full* filename, so `shot.jpg` gets `shot.jpg.json`;
//! this keeps sidecars unambiguous when two assets share a stem
//! (`shot.jpg` vs `shot.mp4`).
//!
//! Sidecars are arbitrary key/value documents: callers can write generation
//! parameters, EXIF maps, or probe results into them. [`merge`] preserves
//! unrelated existing keys so extraction never clobbers caller-supplied
//! metadata.

use crate::error::Result;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Derive the sidecar path for an asset: `<asset-path>.json`.
pub fn sidecar_path(asset: &Path) -> PathBuf {
    let mut name = asset.as_os_str().to_os_string();
    name.push(".json");
    PathBuf::from(name)
}

/// Read an asset's sidecar. Returns `None` when no sidecar exists.
pub fn read(asset: &Path) -> Result<Option<Map<String, Value>>> {
    let path = sidecar_path(asset);
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

/// Write an asset's sidecar, replacing any existing document.
pub fn write(asset: &Path, metadata: &Map<String, Value>) -> Result<()> {
    let content = serde_json::to_string_pretty(metadata)?;
    fs::write(sidecar_path(asset), content)?;
    Ok(())
}

/// Merge new keys into an asset's sidecar, preserving unrelated existing
/// keys. Incoming values win on key collision.
pub fn merge(asset: &Path, metadata: &Map<String, Value>) -> Result<()> {
    let mut doc = read(asset)?.unwrap_or_default();
    for (key, value) in metadata {
        doc.insert(key.clone(), value.clone());
    }
    write(asset, &doc)
}

/// Remove an asset's sidecar. Missing sidecars are not an error.
pub fn remove(asset: &Path) -> Result<()> {
    let path = sidecar_path(asset);
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}

/// Whether the asset has a sidecar on disk.
pub fn exists(asset: &Path) -> bool {
    sidecar_path(asset).exists()
}

/// Copy a sidecar from one asset to another, if the source has one.
pub fn copy(src_asset: &Path, dst_asset: &Path) -> Result<()> {
    let src = sidecar_path(src_asset);
    if src.exists() {
        fs::copy(src, sidecar_path(dst_asset))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn map(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn path_appends_full_extension() {
        let path = sidecar_path(Path::new("/data/wall/shot.jpg"));
        assert_eq!(path, PathBuf::from("/data/wall/shot.jpg.json"));
    }

    #[test]
    fn read_missing_returns_none() {
        let dir = tempdir().unwrap();
        let asset = dir.path().join("nothing.jpg");
        assert!(read(&asset).unwrap().is_none());
    }

    #[test]
    fn write_read_roundtrip() {
        let dir = tempdir().unwrap();
        let asset = dir.path().join("shot.jpg");
        let meta = map(&[("prompt", json!("dusk harbor")), ("seed", json!(42))]);

        write(&asset, &meta).unwrap();
        let loaded = read(&asset).unwrap().unwrap();
        assert_eq!(loaded, meta);
    }

    #[test]
    fn merge_preserves_unrelated_keys() {
        let dir = tempdir().unwrap();
        let asset = dir.path().join("shot.jpg");
        write(&asset, &map(&[("prompt", json!("original")), ("seed", json!(7))])).unwrap();

        merge(&asset, &map(&[("width", json!(1024)), ("seed", json!(8))])).unwrap();

        let loaded = read(&asset).unwrap().unwrap();
        assert_eq!(loaded.get("prompt"), Some(&json!("original")));
        assert_eq!(loaded.get("width"), Some(&json!(1024)));
        // incoming value wins on collision
        assert_eq!(loaded.get("seed"), Some(&json!(8)));
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = tempdir().unwrap();
        let asset = dir.path().join("shot.jpg");
        remove(&asset).unwrap();

        write(&asset, &Map::new()).unwrap();
        remove(&asset).unwrap();
        assert!(!exists(&asset));
    }

    #[test]
    fn copy_skips_missing_source() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.jpg");
        let dst = dir.path().join("b.jpg");
        copy(&src, &dst).unwrap();
        assert!(!exists(&dst));

        write(&src, &map(&[("k", json!("v"))])).unwrap();
        copy(&src, &dst).unwrap();
        assert_eq!(read(&dst).unwrap().unwrap().get("k"), Some(&json!("v")));
    }
}
