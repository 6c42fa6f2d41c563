//! exiftool boundary
//!
//! Metadata is read by shelling out to exiftool in grouped JSON mode
//! (`exiftool -j -G`), which yields a flat mapping of `Group:Field` tag names
//! to string/number values. This module owns the invocation, the required-tag
//! accessors, and the audio sidecar surrogate lookup.

use crate::error::{Error, Result};
use crate::util::single_value;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Flat tag mapping as produced by `exiftool -j -G`.
pub type TagMap = serde_json::Map<String, Value>;

/// Check that exiftool is available before starting a run.
pub fn check_exiftool_installed() -> Result<()> {
    let available = Command::new("exiftool")
        .arg("-ver")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false);
    if available {
        Ok(())
    } else {
        Err(Error::MissingDependency { tool: "exiftool" })
    }
}

/// Run exiftool on a single file and return its tag map.
///
/// exiftool emits a JSON array with one element per input file; exactly one
/// element is expected here.
pub fn extract_tags(path: &Path) -> Result<TagMap> {
    let output = Command::new("exiftool")
        .args(["-j", "-G"])
        .arg(path)
        .output()
        .map_err(|e| Error::ExifTool {
            path: path.to_path_buf(),
            message: format!("failed to run exiftool: {e}"),
        })?;

    if !output.status.success() {
        return Err(Error::ExifTool {
            path: path.to_path_buf(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let parsed: Vec<TagMap> = serde_json::from_slice(&output.stdout)?;
    single_value(parsed.into_iter().map(TagEntry), "exiftool JSON output").map(|entry| entry.0)
}

/// Tag source for classification.
///
/// Audio sidecar files (`.aac`) carry no usable embedded metadata; their
/// sibling video file provides surrogate tags instead.
pub fn tags_for_classification(path: &Path) -> Result<TagMap> {
    if is_audio_sidecar(path) {
        let sibling = matching_video_sibling(path)?;
        debug!(sidecar = %path.display(), sibling = %sibling.display(), "Using surrogate metadata");
        extract_tags(&sibling)
    } else {
        extract_tags(path)
    }
}

fn is_audio_sidecar(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("aac"))
}

/// Locate the video file recorded alongside an audio sidecar.
///
/// The DJI Osmo Action writes a separate AAC audio file next to slow motion
/// video, reusing the file name (DJI_0375.AAC next to DJI_0375.MOV). Exactly
/// one video sibling must exist on disk.
pub fn matching_video_sibling(path: &Path) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = ["MOV", "MP4", "mov", "mp4"]
        .iter()
        .map(|ext| path.with_extension(ext))
        .filter(|candidate| candidate.exists())
        .collect();

    if candidates.len() == 1 {
        Ok(candidates.remove(0))
    } else {
        Err(Error::AmbiguousSibling {
            path: path.to_path_buf(),
            candidates,
        })
    }
}

/// Fetch a required string tag; numbers are rendered as strings.
pub fn require_str(tags: &TagMap, tag: &str, path: &Path) -> Result<String> {
    match tags.get(tag) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(missing(tag, path)),
    }
}

/// Fetch a required integer tag.
pub fn require_i64(tags: &TagMap, tag: &str, path: &Path) -> Result<i64> {
    tags.get(tag)
        .and_then(Value::as_i64)
        .ok_or_else(|| missing(tag, path))
}

/// Fetch a required float tag.
pub fn require_f64(tags: &TagMap, tag: &str, path: &Path) -> Result<f64> {
    tags.get(tag)
        .and_then(Value::as_f64)
        .ok_or_else(|| missing(tag, path))
}

fn missing(tag: &str, path: &Path) -> Error {
    Error::MissingTag {
        path: path.to_path_buf(),
        tag: tag.to_string(),
    }
}

/// Wrapper so `single_value` can compare tag maps without requiring
/// a Debug impl that dumps the whole map into error messages.
struct TagEntry(TagMap);

impl PartialEq for TagEntry {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl std::fmt::Debug for TagEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{} tags>", self.0.len())
    }
}
