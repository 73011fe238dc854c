//! Video metadata extraction via mp4/mov container probing.
//!
//! Only ISO base-media containers (`.mp4`, `.mov`) are probed; other video
//! extensions (`.webm`, `.mkv`) classify as [`super::MediaKind::Video`] but
//! fall through to an empty map on extraction.

use serde_json::{Map, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Probe a video container for dimensions, frame rate, duration and frame
/// count. Returns an empty map on unsupported or unreadable input.
pub fn extract_metadata(path: &Path) -> Map<String, Value> {
    match probe(path) {
        Ok(meta) => meta,
        Err(err) => {
            tracing::debug!(path = %path.display(), %err, "Video probe failed");
            Map::new()
        }
    }
}

fn probe(path: &Path) -> std::result::Result<Map<String, Value>, String> {
    let file = File::open(path).map_err(|e| e.to_string())?;
    let size = file.metadata().map_err(|e| e.to_string())?.len();
    let reader = BufReader::new(file);
    let mp4 = mp4::Mp4Reader::read_header(reader, size).map_err(|e| e.to_string())?;

    let mut meta = Map::new();
    let duration = mp4.duration();
    meta.insert(
        "duration_secs".into(),
        Value::from(duration.as_secs_f64()),
    );

    for track in mp4.tracks().values() {
        let track_type = match track.track_type() {
            Ok(t) => t,
            Err(_) => continue,
        };
        if track_type != mp4::TrackType::Video {
            continue;
        }
        meta.insert("width".into(), Value::from(u32::from(track.width())));
        meta.insert("height".into(), Value::from(u32::from(track.height())));
        meta.insert("fps".into(), Value::from(track.frame_rate()));
        meta.insert("frame_count".into(), Value::from(track.sample_count()));
        break;
    }

    if let Some(ext) = crate::media::extension_of(path) {
        meta.insert("format".into(), Value::String(ext));
    }

    Ok(meta)
}
