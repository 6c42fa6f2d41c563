//! Transfer assembly
//!
//! Walks a source tree and derives one `Transfer` per classifiable media
//! file: the classified medium, its rectified capture timestamp, and the
//! destination path computed from the fixed naming template.

use crate::error::Result;
use crate::medium::{self, Medium};
use crate::metadata;
use chrono::{NaiveDateTime, TimeDelta};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// One planned copy operation.
///
/// `target_path` is owned exclusively by the transfer; after construction it
/// may only be replaced through [`Transfer::retargeted`], which the time-lapse
/// aggregator uses to regroup burst frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    pub source_path: PathBuf,
    pub medium: Medium,
    pub rectified_date: NaiveDateTime,
    pub target_path: PathBuf,
}

impl Transfer {
    /// Return a copy of this transfer with a replaced target path.
    pub fn retargeted(&self, target_path: PathBuf) -> Transfer {
        Transfer {
            target_path,
            ..self.clone()
        }
    }
}

/// Combine the raw capture date with the camera correction and the
/// user-supplied global offset. Pure and total; the capture date was already
/// validated during classification.
pub fn rectify(medium: &Medium, global_offset_secs: i64) -> NaiveDateTime {
    medium.capture_date() + medium.camera().correction() + TimeDelta::seconds(global_offset_secs)
}

/// Minute-resolution timestamp prefix for target names.
///
/// Seconds are deliberately dropped so that paired RAW+JPEG captures of the
/// same shot keep identical prefixes despite the sub-minute jitter some
/// cameras write between the two renditions.
pub fn timestamp_str(date: NaiveDateTime) -> String {
    date.format("%Y%m%d-%H%M").to_string()
}

/// Derive the destination path for a medium.
///
/// Template: `destination / YYYY-MM-DD / {timestamp}_{camera}_{name}{_attrs}{.ext}`,
/// with `name` extended by a four-digit sequence number during time-lapse
/// re-numbering. Deterministic by construction; the ordering verifier relies
/// on that.
pub fn derive_target_path(
    destination: &Path,
    medium: &Medium,
    rectified_date: NaiveDateTime,
    sequence_number: Option<u32>,
) -> PathBuf {
    let name = match sequence_number {
        Some(n) => format!("{}-{:04}", medium.base_name(), n),
        None => medium.base_name().to_string(),
    };
    let file_name = format!(
        "{}_{}_{}_{}{}",
        timestamp_str(rectified_date),
        medium.camera().name,
        name,
        medium.name_attributes(),
        medium.extension().as_str(),
    );
    destination
        .join(rectified_date.format("%Y-%m-%d").to_string())
        .join(file_name)
}

/// Filtering predicate applied before classification: vendor-generated
/// metadata shadow files (stems starting with `._`) are not media.
pub fn is_media_file(path: &Path) -> bool {
    let hidden = path
        .file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|stem| stem.starts_with("._"));
    if hidden {
        warn!(file = %path.display(), "Found non-media file, skipping");
    }
    !hidden
}

/// Build a transfer for a single media file.
pub fn assemble_one(
    media_file: &Path,
    destination: &Path,
    global_offset_secs: i64,
) -> Result<Transfer> {
    info!(file = %media_file.display(), "Building transfer");
    let tags = metadata::tags_for_classification(media_file)?;
    let medium = medium::classify(media_file, &tags)?;
    let rectified_date = rectify(&medium, global_offset_secs);
    let target_path = derive_target_path(destination, &medium, rectified_date, None);
    Ok(Transfer {
        source_path: media_file.to_path_buf(),
        medium,
        rectified_date,
        target_path,
    })
}

/// Assemble transfers for every media file under `source_root`.
///
/// Traversal is recursive and sorted by file name so repeated runs produce
/// the collection in identical order. A single classification failure aborts
/// the whole run; capture-card corpora are small and an unclassifiable file
/// signals a real problem worth stopping for.
pub fn assemble(
    source_root: &Path,
    destination_root: &Path,
    global_offset_secs: i64,
) -> Result<Vec<Transfer>> {
    let mut transfers = Vec::new();
    for entry in WalkDir::new(source_root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_media_file(entry.path()) {
            continue;
        }
        transfers.push(assemble_one(entry.path(), destination_root, global_offset_secs)?);
    }
    Ok(transfers)
}
