//! Ordering verification
//!
//! Copied files must keep the sorting of their sources. Cameras can write a
//! RAW and a compressed image at the same instant under the same base name;
//! the target name encodes resolution (which differs between the renditions)
//! while the source name does not, so one rendition of each such pair has to
//! be excluded per check:
//!
//! ```text
//! [source]                 [target]
//! DSCF0231.JPG             20210708-1740_x-t3_DSCF0231_4416x2944.raf
//! DSCF0231.RAF             20210708-1740_x-t3_DSCF0231_6240x4160.jpg
//! ```
//!
//! Running once per pairwise combination of same-timestamp-capable image
//! extensions keeps genuine chronological inversions detectable. A mismatch
//! points at camera recording errors, or at a bug in this program.

use crate::error::{Error, Result};
use crate::medium::Extension;
use crate::transfer::Transfer;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Image extensions a camera can emit simultaneously for one shutter event.
const PAIRED_IMAGE_EXTENSIONS: [Extension; 3] = [Extension::Jpg, Extension::Raf, Extension::Dng];

#[derive(Serialize)]
struct ReportEntry {
    file: String,
    target: String,
    rectified_timestamp: String,
}

fn sorted_transfers<'a, K, F>(
    transfers: &'a [Transfer],
    key: F,
    exclude: &[Extension],
) -> Vec<&'a Transfer>
where
    K: Ord,
    F: Fn(&Transfer) -> K,
{
    let mut filtered: Vec<&Transfer> = transfers
        .iter()
        .filter(|t| !exclude.contains(&t.medium.extension()))
        .collect();
    filtered.sort_by_key(|t| key(t));
    filtered
}

fn write_report(transfers: &[&Transfer], directory: &Path, file_name: &str) -> Result<()> {
    let entries: Vec<ReportEntry> = transfers
        .iter()
        .map(|t| ReportEntry {
            file: t.source_path.display().to_string(),
            target: t
                .target_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            rectified_timestamp: t.rectified_date.to_string(),
        })
        .collect();
    fs::write(
        directory.join(format!("{file_name}.json")),
        serde_json::to_string_pretty(&entries)?,
    )?;
    Ok(())
}

/// Assert that sorting the (filtered) transfers by source path and by target
/// path yields the same sequence.
///
/// On mismatch both orderings are written to `sorted_by_source.json` and
/// `sorted_by_target.json` under `report_dir` for offline diagnosis, and the
/// error itemizes every diverging position.
pub fn verify_ordering(
    transfers: &[Transfer],
    exclude: &[Extension],
    report_dir: &Path,
) -> Result<()> {
    let by_source = sorted_transfers(transfers, |t| t.source_path.clone(), exclude);
    let by_target = sorted_transfers(transfers, |t| t.target_path.clone(), exclude);

    let divergences: Vec<String> = by_source
        .iter()
        .zip(&by_target)
        .enumerate()
        .filter(|(_, (s, t))| s.source_path != t.source_path)
        .map(|(i, (s, t))| {
            format!(
                "\t#{i}: by_source={} by_target={}",
                s.source_path.display(),
                t.source_path.display(),
            )
        })
        .collect();

    if divergences.is_empty() {
        debug!(excluded = ?exclude, count = by_source.len(), "Ordering check passed");
        return Ok(());
    }

    write_report(&by_source, report_dir, "sorted_by_source")?;
    write_report(&by_target, report_dir, "sorted_by_target")?;
    Err(Error::OrderingMismatch {
        detail: divergences.join("\n"),
    })
}

/// Run the ordering check once per pairwise combination of image extensions
/// that can share a capture timestamp, excluding that pair each time. In
/// time-lapse mode videos are additionally excluded, as the single wrap-up
/// video can change position among the frames from source to target.
pub fn verify_transfers(transfers: &[Transfer], timelapse: bool) -> Result<()> {
    for (i, first) in PAIRED_IMAGE_EXTENSIONS.iter().enumerate() {
        for second in &PAIRED_IMAGE_EXTENSIONS[i + 1..] {
            let mut exclude = vec![*first, *second];
            if timelapse {
                exclude.extend([Extension::Mov, Extension::Mp4]);
            }
            verify_ordering(transfers, &exclude, Path::new("."))?;
        }
    }
    Ok(())
}
