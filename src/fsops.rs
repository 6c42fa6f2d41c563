//! Copy execution
//!
//! Materializes planned transfers on disk: buffered copy, checksum
//! verification against the source, and file timestamps rewritten to the
//! rectified capture date so downstream tools sorting by mtime agree with
//! the encoded names.

use crate::error::{Error, Result};
use crate::hash::compute_file_hash;
use crate::transfer::Transfer;
use chrono::{Local, TimeZone};
use filetime::FileTime;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Copy file with buffered I/O for efficiency
fn copy_file(source: &Path, dest: &Path) -> Result<()> {
    let src_file = File::open(source)?;
    let dest_file = File::create(dest)?;

    let mut reader = BufReader::with_capacity(256 * 1024, src_file);
    let mut writer = BufWriter::with_capacity(256 * 1024, dest_file);

    let mut buffer = vec![0u8; 256 * 1024];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        writer.write_all(&buffer[..bytes_read])?;
    }

    writer.flush()?;
    Ok(())
}

/// Rewrite access and modification time to the rectified capture date.
///
/// The rectified date is wall-clock local time; ambiguous or skipped local
/// instants (DST transitions) fall back to treating it as UTC.
fn set_file_times(transfer: &Transfer) -> Result<()> {
    let timestamp = Local
        .from_local_datetime(&transfer.rectified_date)
        .earliest()
        .map(|dt| dt.timestamp())
        .unwrap_or_else(|| transfer.rectified_date.and_utc().timestamp());
    let file_time = FileTime::from_unix_time(timestamp, 0);
    filetime::set_file_times(&transfer.target_path, file_time, file_time)?;
    Ok(())
}

/// Copy one transfer, verify the copy by checksum, and stamp the target with
/// the rectified date.
fn copy_one(transfer: &Transfer) -> Result<()> {
    if let Some(parent) = transfer.target_path.parent() {
        fs::create_dir_all(parent)?;
    }
    copy_file(&transfer.source_path, &transfer.target_path)?;

    let source_hash = compute_file_hash(&transfer.source_path)?;
    let target_hash = compute_file_hash(&transfer.target_path)?;
    if source_hash != target_hash {
        return Err(Error::CopyVerification {
            path: transfer.target_path.clone(),
        });
    }
    debug!(hash = source_hash, target = %transfer.target_path.display(), "Checksum verified");

    set_file_times(transfer)
}

/// Execute all planned transfers.
///
/// In dry-run mode nothing touches the disk; the plan is printed instead.
/// With `delete_source` each source file is removed only after its copy has
/// been checksum-verified.
pub fn execute_transfers(transfers: &[Transfer], dry_run: bool, delete_source: bool) -> Result<()> {
    if dry_run {
        for transfer in transfers {
            if transfer.source_path == transfer.target_path {
                println!("(generated) {}", transfer.target_path.display());
            } else {
                println!(
                    "{} --> {}",
                    transfer.source_path.display(),
                    transfer.target_path.display(),
                );
            }
        }
        return Ok(());
    }

    for transfer in transfers {
        // Synthetic outputs (proxy videos) are generated in place at their
        // destination; only their file times need aligning.
        if transfer.source_path == transfer.target_path {
            info!(target = %transfer.target_path.display(), "Stamping generated file");
            set_file_times(transfer)?;
            continue;
        }
        info!(
            source = %transfer.source_path.display(),
            target = %transfer.target_path.display(),
            "Copying",
        );
        copy_one(transfer)?;
        if delete_source {
            fs::remove_file(&transfer.source_path)?;
        }
    }
    Ok(())
}

/// Return the source files whose derived targets do not exist yet.
///
/// Supports verifying that a card was fully sorted before wiping it.
pub fn files_not_sorted(transfers: &[Transfer]) -> Vec<PathBuf> {
    transfers
        .iter()
        .filter(|t| !t.target_path.exists())
        .map(|t| t.source_path.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cameras::FUJIFILM_X_T3;
    use crate::medium::{BaseMedium, Extension, Image, Medium};
    use chrono::{DateTime, NaiveDateTime};
    use tempfile::tempdir;

    fn transfer_between(source: PathBuf, target: PathBuf) -> Transfer {
        let capture =
            NaiveDateTime::parse_from_str("2021-07-08 17:40:28", "%Y-%m-%d %H:%M:%S").unwrap();
        Transfer {
            source_path: source,
            medium: Medium::Image(Image {
                base: BaseMedium {
                    file_modify_date: DateTime::parse_from_str(
                        "2021:07:08 17:40:30+0200",
                        "%Y:%m:%d %H:%M:%S%z",
                    )
                    .unwrap(),
                    camera: FUJIFILM_X_T3,
                    base_name: "DSCF0226".to_string(),
                    extension: Extension::Jpg,
                    mime_type: "image/jpeg".to_string(),
                    capture_date: capture,
                },
                resolution: "6240x4160".to_string(),
                shutter_speed: "1/450".to_string(),
            }),
            rectified_date: capture,
            target_path: target,
        }
    }

    #[test]
    fn test_copy_one_creates_directories_and_verifies() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("DSCF0226.JPG");
        fs::write(&source, b"jpeg bytes").unwrap();
        let target = dir.path().join("out/2021-07-08/DSCF0226.jpg");

        copy_one(&transfer_between(source, target.clone())).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"jpeg bytes");
    }

    #[test]
    fn test_execute_dry_run_writes_nothing() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("DSCF0226.JPG");
        fs::write(&source, b"jpeg bytes").unwrap();
        let target = dir.path().join("out/DSCF0226.jpg");

        let transfers = vec![transfer_between(source.clone(), target.clone())];
        execute_transfers(&transfers, true, true).unwrap();
        assert!(!target.exists());
        assert!(source.exists());
    }

    #[test]
    fn test_execute_with_delete_removes_source_after_copy() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("DSCF0226.JPG");
        fs::write(&source, b"jpeg bytes").unwrap();
        let target = dir.path().join("out/DSCF0226.jpg");

        let transfers = vec![transfer_between(source.clone(), target.clone())];
        execute_transfers(&transfers, false, true).unwrap();
        assert!(target.exists());
        assert!(!source.exists());
    }

    #[test]
    fn test_in_place_transfer_is_stamped_not_copied_or_deleted() {
        let dir = tempdir().unwrap();
        let generated = dir.path().join("out/group.mp4");
        fs::create_dir_all(generated.parent().unwrap()).unwrap();
        fs::write(&generated, b"encoded proxy").unwrap();

        let transfer = transfer_between(generated.clone(), generated.clone());
        execute_transfers(&[transfer.clone()], false, true).unwrap();

        assert_eq!(fs::read(&generated).unwrap(), b"encoded proxy");

        let expected = Local
            .from_local_datetime(&transfer.rectified_date)
            .earliest()
            .map(|dt| dt.timestamp())
            .unwrap_or_else(|| transfer.rectified_date.and_utc().timestamp());
        let metadata = fs::metadata(&generated).unwrap();
        assert_eq!(
            FileTime::from_last_modification_time(&metadata).unix_seconds(),
            expected,
        );
    }

    #[test]
    fn test_files_not_sorted_lists_missing_targets() {
        let dir = tempdir().unwrap();
        let copied_target = dir.path().join("copied.jpg");
        fs::write(&copied_target, b"x").unwrap();

        let transfers = vec![
            transfer_between(dir.path().join("a.JPG"), copied_target),
            transfer_between(dir.path().join("b.JPG"), dir.path().join("missing.jpg")),
        ];
        let missing = files_not_sorted(&transfers);
        assert_eq!(missing, vec![dir.path().join("b.JPG")]);
    }
}
