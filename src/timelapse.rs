//! Time-lapse aggregation
//!
//! Collapses a burst of still captures into a single named group: validates
//! that the burst is homogeneous, derives an aggregate spec (count, interval,
//! duration, shutter speed), and rewrites every frame's target path into a
//! shared group folder with capture-order sequence numbers. Bursts recorded
//! through a video-capable device may carry one wrap-up video; bursts without
//! one get a proxy video synthesized from the JPEG frames by an external
//! encoder.

use crate::cameras::Camera;
use crate::error::{Error, Result};
use crate::medium::{BaseMedium, Extension, Medium, Video};
use crate::transfer::{Transfer, timestamp_str};
use crate::util::single_value;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use tracing::info;

/// Aggregate view over a burst. Computed, never stored independently of the
/// transfers it summarizes.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelapseSpec {
    pub timestamp: NaiveDateTime,
    pub camera: Camera,
    pub first_name: String,
    /// Omitted when a wrap-up video names the group: video-driven interval
    /// photography assigns the stills generic sequential names carrying no
    /// useful identity.
    pub last_name: Option<String>,
    pub count: usize,
    pub interval_secs: i64,
    pub shutter_speed: String,
}

/// Request for the external frame-sequence encoder.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyJob {
    pub source_glob: String,
    pub frame_rate: u32,
    pub output: PathBuf,
}

/// Result of aggregating a burst.
pub struct Aggregation {
    pub transfers: Vec<Transfer>,
    pub spec: TimelapseSpec,
    pub group_folder: String,
    pub proxy: Option<ProxyJob>,
}

struct Partitions {
    jpeg: Vec<Transfer>,
    raw: Vec<Transfer>,
    video: Option<Transfer>,
}

/// Split burst transfers into JPEG-rendition frames, RAW-rendition frames
/// and at most one wrap-up video, by resolved extension.
fn partition(transfers: Vec<Transfer>) -> Result<Partitions> {
    let mut jpeg = Vec::new();
    let mut raw = Vec::new();
    let mut videos = Vec::new();

    for transfer in transfers {
        match transfer.medium.extension() {
            Extension::Jpg => jpeg.push(transfer),
            Extension::Raf | Extension::Dng => raw.push(transfer),
            Extension::Mov | Extension::Mp4 => videos.push(transfer),
            Extension::Aac => {
                return Err(Error::InconsistentBurst {
                    detail: format!(
                        "audio sidecar {} cannot be part of a time-lapse burst",
                        transfer.source_path.display()
                    ),
                });
            }
        }
    }

    if videos.len() > 1 {
        return Err(Error::InconsistentBurst {
            detail: format!(
                "more than one video in burst: {}",
                videos
                    .iter()
                    .map(|t| t.source_path.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        });
    }
    if jpeg.is_empty() && raw.is_empty() {
        return Err(Error::InconsistentBurst {
            detail: "burst contains no image frames".to_string(),
        });
    }
    for frames in [&jpeg, &raw] {
        if frames.len() == 1 {
            return Err(Error::InconsistentBurst {
                detail: format!(
                    "a single frame ({}) is not a burst",
                    frames[0].source_path.display()
                ),
            });
        }
    }
    // Mixed RAW formats within one burst would break the shared subfolder.
    if !raw.is_empty() {
        single_value(raw.iter().map(|t| t.medium.extension()), "RAW extension in burst")
            .map_err(|_| Error::InconsistentBurst {
                detail: "burst mixes RAF and DNG frames".to_string(),
            })?;
    }

    // Capture order is authoritative; source names are monotonic with
    // capture time for this device class.
    jpeg.sort_by(|a, b| a.source_path.cmp(&b.source_path));
    raw.sort_by(|a, b| a.source_path.cmp(&b.source_path));

    Ok(Partitions {
        jpeg,
        raw,
        video: videos.pop(),
    })
}

/// Validate a uniform inter-frame interval and return it in seconds.
///
/// Consecutive rectified-timestamp deltas may jitter by at most
/// `tolerance_secs`; identical deltas are used as-is, differing ones fall
/// back to the rounded mean, surfaced as an informational note.
fn frame_interval(frames: &[Transfer], tolerance_secs: i64) -> Result<i64> {
    let deltas: Vec<i64> = frames
        .windows(2)
        .map(|pair| (pair[1].rectified_date - pair[0].rectified_date).num_seconds())
        .collect();

    let min = deltas.iter().min().copied().unwrap_or(0);
    let max = deltas.iter().max().copied().unwrap_or(0);
    if max - min > tolerance_secs {
        let listing: Vec<String> = frames
            .windows(2)
            .map(|pair| {
                format!(
                    "\t{} -> {}: dt={}s",
                    pair[0].source_path.display(),
                    pair[1].source_path.display(),
                    (pair[1].rectified_date - pair[0].rectified_date).num_seconds(),
                )
            })
            .collect();
        return Err(Error::IrregularInterval {
            detail: listing.join("\n"),
        });
    }

    if deltas.iter().all(|d| *d == deltas[0]) {
        Ok(deltas[0])
    } else {
        let mean = deltas.iter().sum::<i64>() as f64 / deltas.len() as f64;
        let rounded = mean.round_ties_even() as i64;
        info!(deltas = ?deltas, rounded, "Multiple dt found in timeline, using rounded value");
        Ok(rounded)
    }
}

/// Human-readable duration of `(count - 1) * interval` seconds: `HhMMm`
/// above one hour, unpadded `Mm` below it.
fn duration_str(count: usize, interval_secs: i64) -> String {
    let total = (count as i64 - 1) * interval_secs;
    if total >= 3600 {
        format!("{}h{:02}m", total / 3600, (total % 3600) / 60)
    } else {
        format!("{}m", total / 60)
    }
}

/// Group folder name embedding timestamp, camera, name span, marker, count,
/// duration, interval and shutter speed.
fn group_folder_name(spec: &TimelapseSpec) -> String {
    let names = match &spec.last_name {
        Some(last) => format!("{}-{}", spec.first_name, last),
        None => spec.first_name.clone(),
    };
    [
        timestamp_str(spec.timestamp),
        spec.camera.name.to_string(),
        names,
        "time-lapse".to_string(),
        format!("N{}", spec.count),
        duration_str(spec.count, spec.interval_secs),
        format!("{}s", spec.interval_secs),
        // Shutter strings like "1/450" are not path-safe.
        spec.shutter_speed.replace('/', "-"),
    ]
    .join("_")
}

fn derive_spec(parts: &Partitions, tolerance_secs: i64) -> Result<TimelapseSpec> {
    // Photo frames and a wrap-up video resolve to distinct registry entries
    // on the same device, so compare display names.
    single_value(
        parts
            .jpeg
            .iter()
            .chain(&parts.raw)
            .chain(&parts.video)
            .map(|t| t.medium.camera().name),
        "camera in burst",
    )?;

    let leading = if parts.jpeg.is_empty() { &parts.raw } else { &parts.jpeg };
    let first = &leading[0];
    let last = &leading[leading.len() - 1];

    let count = single_value(
        [&parts.jpeg, &parts.raw]
            .into_iter()
            .filter(|p| !p.is_empty())
            .map(|p| p.len()),
        "frame count across renditions",
    )?;

    let interval_secs = single_value(
        [&parts.jpeg, &parts.raw]
            .into_iter()
            .filter(|p| !p.is_empty())
            .map(|p| frame_interval(p, tolerance_secs))
            .collect::<Result<Vec<i64>>>()?,
        "frame interval across renditions",
    )?;

    let shutter_speed = single_value(
        parts
            .jpeg
            .iter()
            .chain(&parts.raw)
            .filter_map(|t| t.medium.shutter_speed().map(str::to_string)),
        "shutter speed",
    )
    .map_err(|e| match e {
        Error::SingleValueExpected { found, .. } => Error::InconsistentShutterSpeed { found },
        other => other,
    })?;

    let (first_name, last_name) = match &parts.video {
        Some(video) => (video.medium.base_name().to_string(), None),
        None => (
            first.medium.base_name().to_string(),
            Some(last.medium.base_name().to_string()),
        ),
    };

    Ok(TimelapseSpec {
        timestamp: first.rectified_date,
        camera: first.medium.camera(),
        first_name,
        last_name,
        count,
        interval_secs,
        shutter_speed,
    })
}

fn parent_of(transfer: &Transfer) -> &Path {
    transfer.target_path.parent().unwrap_or(Path::new(""))
}

/// Transfer representing the proxy video the encoder will generate.
///
/// The encoder writes the proxy directly at its destination, so source and
/// target coincide; the executor stamps its file times instead of copying.
/// Resolution and frame rate come from the frames it is built from.
fn synthetic_proxy_transfer(first: &Transfer, output: PathBuf, frame_rate: u32) -> Transfer {
    let base = first.medium.base();
    let height = first
        .medium
        .name_attributes()
        .split('x')
        .nth(1)
        .unwrap_or("0")
        .to_string();
    let medium = Medium::Video(Video {
        base: BaseMedium {
            file_modify_date: base.file_modify_date,
            camera: base.camera,
            base_name: base.base_name.clone(),
            extension: Extension::Mp4,
            mime_type: "video/mp4".to_string(),
            capture_date: base.capture_date,
        },
        resolution: format!("{height}p"),
        frame_rate: format!("{frame_rate}fps"),
    });
    Transfer {
        source_path: output.clone(),
        medium,
        rectified_date: first.rectified_date,
        target_path: output,
    }
}

/// Rewrite a burst's target paths into a shared group folder.
///
/// Frames land in `<parent>/<group>/jpg|raw/<group>_{seq:04}{ext}` with
/// 1-based sequence numbers in capture order. A wrap-up video becomes
/// `<parent>/<group>{ext}`; without one, a proxy-encoder job over the JPEG
/// frames is derived and a synthetic video transfer for its output joins the
/// collection (RAW-only bursts cannot produce a proxy and the step is
/// skipped for them).
pub fn aggregate(
    transfers: Vec<Transfer>,
    tolerance_secs: i64,
    proxy_frame_rate: u32,
) -> Result<Aggregation> {
    let parts = partition(transfers)?;
    let spec = derive_spec(&parts, tolerance_secs)?;
    let group_folder = group_folder_name(&spec);
    info!(group = %group_folder, count = spec.count, interval = spec.interval_secs, "Aggregating time-lapse burst");

    let mut patched = Vec::new();
    for (subfolder, frames) in [("jpg", &parts.jpeg), ("raw", &parts.raw)] {
        for (n, frame) in frames.iter().enumerate() {
            let target = parent_of(frame)
                .join(&group_folder)
                .join(subfolder)
                .join(format!(
                    "{}_{:04}{}",
                    group_folder,
                    n + 1,
                    frame.medium.extension().as_str(),
                ));
            patched.push(frame.retargeted(target));
        }
    }

    let mut proxy = None;
    match &parts.video {
        Some(video) => {
            let target = parent_of(video).join(format!(
                "{}{}",
                group_folder,
                video.medium.extension().as_str(),
            ));
            patched.push(video.retargeted(target));
        }
        None if !parts.jpeg.is_empty() => {
            let first = &parts.jpeg[0];
            let source_dir = first.source_path.parent().unwrap_or(Path::new("."));
            let suffix = first
                .source_path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("jpg");
            let output = parent_of(first).join(format!("{group_folder}.mp4"));
            proxy = Some(ProxyJob {
                source_glob: format!("{}/*.{}", source_dir.display(), suffix),
                frame_rate: proxy_frame_rate,
                output: output.clone(),
            });
            patched.push(synthetic_proxy_transfer(first, output, proxy_frame_rate));
        }
        None => {}
    }

    Ok(Aggregation {
        transfers: patched,
        spec,
        group_folder,
        proxy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cameras::{DJI_OSMO_ACTION_PHOTO, DJI_OSMO_ACTION_VIDEO, FUJIFILM_X_T3};
    use crate::medium::Image;
    use crate::transfer::derive_target_path;
    use chrono::{DateTime, FixedOffset, TimeDelta};

    fn naive(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn modify_date() -> DateTime<FixedOffset> {
        DateTime::parse_from_str("2021:07:08 17:40:30+0200", "%Y:%m:%d %H:%M:%S%z").unwrap()
    }

    fn frame(name: &str, ext: Extension, capture: NaiveDateTime, shutter: &str) -> Transfer {
        frame_for(FUJIFILM_X_T3, name, ext, capture, shutter)
    }

    fn frame_for(
        camera: Camera,
        name: &str,
        ext: Extension,
        capture: NaiveDateTime,
        shutter: &str,
    ) -> Transfer {
        let medium = Medium::Image(Image {
            base: BaseMedium {
                file_modify_date: modify_date(),
                camera,
                base_name: name.replace('_', ""),
                extension: ext,
                mime_type: "image/jpeg".to_string(),
                capture_date: capture,
            },
            resolution: "6240x4160".to_string(),
            shutter_speed: shutter.to_string(),
        });
        Transfer {
            source_path: PathBuf::from(format!("card/{}{}", name, ext.as_str().to_uppercase())),
            target_path: derive_target_path(Path::new("dest"), &medium, capture, None),
            medium,
            rectified_date: capture,
        }
    }

    fn video_transfer(name: &str, capture: NaiveDateTime) -> Transfer {
        let medium = Medium::Video(Video {
            base: BaseMedium {
                file_modify_date: modify_date(),
                camera: DJI_OSMO_ACTION_VIDEO,
                base_name: name.replace('_', ""),
                extension: Extension::Mp4,
                mime_type: "video/mp4".to_string(),
                capture_date: capture,
            },
            resolution: "2160p".to_string(),
            frame_rate: "30fps".to_string(),
        });
        Transfer {
            source_path: PathBuf::from(format!("card/{name}.MP4")),
            target_path: derive_target_path(Path::new("dest"), &medium, capture, None),
            medium,
            rectified_date: capture,
        }
    }

    fn burst(count: usize, interval_secs: i64) -> Vec<Transfer> {
        let start = naive("2021-07-08 17:40:00");
        (0..count)
            .map(|i| {
                frame(
                    &format!("DSCF{:04}", 226 + i),
                    Extension::Jpg,
                    start + TimeDelta::seconds(i as i64 * interval_secs),
                    "1/450",
                )
            })
            .collect()
    }

    #[test]
    fn test_duration_formatting_literal_table() {
        assert_eq!(duration_str(2, 60), "1m");
        assert_eq!(duration_str(2, 600), "10m");
        assert_eq!(duration_str(61, 1), "1m");
        assert_eq!(duration_str(541, 1), "9m");
        assert_eq!(duration_str(360, 10), "59m");
        assert_eq!(duration_str(361, 10), "1h00m");
        assert_eq!(duration_str(368, 10), "1h01m");
        assert_eq!(duration_str(200, 600), "33h10m");
    }

    #[test]
    fn test_frame_interval_accepts_uniform_deltas() {
        let frames = burst(3, 60);
        assert_eq!(frame_interval(&frames, 2).unwrap(), 60);
    }

    #[test]
    fn test_frame_interval_uses_rounded_mean_within_tolerance() {
        let start = naive("2021-07-08 17:40:00");
        let frames = vec![
            frame("DSCF0226", Extension::Jpg, start, "1/450"),
            frame("DSCF0227", Extension::Jpg, start + TimeDelta::seconds(60), "1/450"),
            frame("DSCF0228", Extension::Jpg, start + TimeDelta::seconds(121), "1/450"),
        ];
        // deltas [60, 61], mean 60.5, ties-to-even rounding
        assert_eq!(frame_interval(&frames, 2).unwrap(), 60);
    }

    #[test]
    fn test_frame_interval_rejects_deltas_beyond_tolerance() {
        let start = naive("2021-07-08 17:40:00");
        let frames = vec![
            frame("DSCF0226", Extension::Jpg, start, "1/450"),
            frame("DSCF0227", Extension::Jpg, start + TimeDelta::seconds(60), "1/450"),
            frame("DSCF0228", Extension::Jpg, start + TimeDelta::seconds(125), "1/450"),
        ];
        match frame_interval(&frames, 2) {
            Err(Error::IrregularInterval { detail }) => {
                assert!(detail.contains("dt=60s"));
                assert!(detail.contains("dt=65s"));
            }
            other => panic!("expected IrregularInterval, got {other:?}"),
        }
    }

    #[test]
    fn test_aggregate_rewrites_frames_into_group_folder() {
        let result = aggregate(burst(3, 60), 2, 25).unwrap();

        assert_eq!(result.spec.count, 3);
        assert_eq!(result.spec.interval_secs, 60);
        assert_eq!(result.spec.first_name, "DSCF0226");
        assert_eq!(result.spec.last_name.as_deref(), Some("DSCF0228"));
        assert_eq!(
            result.group_folder,
            "20210708-1740_x-t3_DSCF0226-DSCF0228_time-lapse_N3_2m_60s_1-450",
        );

        assert_eq!(result.transfers.len(), 4);
        assert_eq!(
            result.transfers[0].target_path,
            Path::new("dest/2021-07-08")
                .join(&result.group_folder)
                .join("jpg")
                .join(format!("{}_0001.jpg", result.group_folder)),
        );
        assert_eq!(
            result.transfers[2]
                .target_path
                .file_name()
                .unwrap()
                .to_str()
                .unwrap(),
            format!("{}_0003.jpg", result.group_folder),
        );

        // No wrap-up video: a proxy job over the JPEG frames is derived.
        let proxy = result.proxy.expect("proxy job for video-less burst");
        assert_eq!(proxy.frame_rate, 25);
        assert_eq!(proxy.source_glob, "card/*.JPG");
        assert_eq!(
            proxy.output,
            Path::new("dest/2021-07-08").join(format!("{}.mp4", result.group_folder)),
        );
    }

    #[test]
    fn test_aggregate_adds_synthetic_transfer_for_proxy_output() {
        let result = aggregate(burst(3, 60), 2, 25).unwrap();
        let proxy = result.proxy.as_ref().expect("proxy job for video-less burst");

        // The generated proxy participates in the plan like any other
        // output, generated in place at its destination.
        let synthetic = result.transfers.last().unwrap();
        assert_eq!(synthetic.target_path, proxy.output);
        assert_eq!(synthetic.source_path, synthetic.target_path);
        assert!(!synthetic.medium.is_image());
        assert_eq!(synthetic.medium.extension(), Extension::Mp4);
        assert_eq!(synthetic.medium.name_attributes(), "4160p-25fps");
        assert_eq!(synthetic.rectified_date, result.spec.timestamp);
    }

    #[test]
    fn test_aggregate_with_wrapup_video_names_group_after_it() {
        let start = naive("2021-09-14 10:00:00");
        let mut transfers: Vec<Transfer> = (0..3)
            .map(|i| {
                frame_for(
                    DJI_OSMO_ACTION_PHOTO,
                    &format!("DJI_{:04}", 100 + i),
                    Extension::Jpg,
                    start + TimeDelta::seconds(i * 10),
                    "1/100",
                )
            })
            .collect();
        transfers.push(video_transfer("DJI_0099", start));

        let result = aggregate(transfers, 2, 25).unwrap();
        assert_eq!(result.spec.first_name, "DJI0099");
        assert_eq!(result.spec.last_name, None);
        assert!(result.group_folder.contains("_DJI0099_time-lapse_"));
        assert!(result.proxy.is_none());

        // Video lands next to the group folder, no subfolder, no sequence.
        let video = result.transfers.last().unwrap();
        assert_eq!(
            video.target_path,
            Path::new("dest/2021-09-14").join(format!("{}.mp4", result.group_folder)),
        );
    }

    #[test]
    fn test_aggregate_raw_only_burst_skips_proxy() {
        let start = naive("2021-07-08 17:40:00");
        let transfers: Vec<Transfer> = (0..2)
            .map(|i| {
                frame(
                    &format!("DSCF{:04}", 300 + i),
                    Extension::Raf,
                    start + TimeDelta::seconds(i * 30),
                    "1/450",
                )
            })
            .collect();
        let result = aggregate(transfers, 2, 25).unwrap();
        assert!(result.proxy.is_none());
        assert!(
            result.transfers[0]
                .target_path
                .to_str()
                .unwrap()
                .contains("/raw/"),
        );
    }

    #[test]
    fn test_aggregate_rejects_two_videos() {
        let start = naive("2021-09-14 10:00:00");
        let mut transfers = burst(2, 60);
        transfers.push(video_transfer("DJI_0099", start));
        transfers.push(video_transfer("DJI_0100", start));
        assert!(matches!(
            aggregate(transfers, 2, 25),
            Err(Error::InconsistentBurst { .. })
        ));
    }

    #[test]
    fn test_aggregate_rejects_inconsistent_shutter_speed() {
        let start = naive("2021-07-08 17:40:00");
        let transfers = vec![
            frame("DSCF0226", Extension::Jpg, start, "1/450"),
            frame("DSCF0227", Extension::Jpg, start + TimeDelta::seconds(60), "1/500"),
        ];
        assert!(matches!(
            aggregate(transfers, 2, 25),
            Err(Error::InconsistentShutterSpeed { .. })
        ));
    }

    #[test]
    fn test_aggregate_rejects_mixed_raw_formats() {
        let start = naive("2021-07-08 17:40:00");
        let transfers = vec![
            frame("DSCF0226", Extension::Raf, start, "1/450"),
            frame("DSCF0227", Extension::Dng, start + TimeDelta::seconds(60), "1/450"),
        ];
        assert!(matches!(
            aggregate(transfers, 2, 25),
            Err(Error::InconsistentBurst { .. })
        ));
    }
}
