//! Medium classification
//!
//! Builds a typed `Image` or `Video` record from a file path and its tag map.
//! Dispatch happens over a closed enum of known type/camera combinations, so
//! an unhandled mime type is a compile-visible gap rather than a runtime
//! lookup failure.

use crate::cameras::{self, Camera};
use crate::error::{Error, Result};
use crate::metadata::{self, TagMap};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use std::path::Path;

/// Recognized file suffixes. Unknown suffixes are a hard classification
/// failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
    Jpg,
    Mov,
    Mp4,
    Raf,
    Dng,
    Aac,
}

impl Extension {
    pub fn from_path(path: &Path) -> Result<Self> {
        let suffix = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or_else(|| Error::UnsupportedExtension {
                path: path.to_path_buf(),
            })?;
        match suffix.as_str() {
            "jpg" => Ok(Extension::Jpg),
            "mov" => Ok(Extension::Mov),
            "mp4" => Ok(Extension::Mp4),
            "raf" => Ok(Extension::Raf),
            "dng" => Ok(Extension::Dng),
            "aac" => Ok(Extension::Aac),
            _ => Err(Error::UnsupportedExtension {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Lower-cased dot-suffix used in target names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Extension::Jpg => ".jpg",
            Extension::Mov => ".mov",
            Extension::Mp4 => ".mp4",
            Extension::Raf => ".raf",
            Extension::Dng => ".dng",
            Extension::Aac => ".aac",
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Extension::Raf | Extension::Dng)
    }
}

/// Known type/camera combinations, keyed by the authoritative
/// `File:MIMEType` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediaKind {
    Jpeg,
    FujiRaw,
    AdobeDng,
    QuickTime,
    Mp4,
}

impl MediaKind {
    fn from_mime(mime_type: &str, path: &Path) -> Result<Self> {
        match mime_type {
            "image/jpeg" => Ok(MediaKind::Jpeg),
            "image/x-fujifilm-raf" => Ok(MediaKind::FujiRaw),
            "image/x-adobe-dng" => Ok(MediaKind::AdobeDng),
            "video/quicktime" => Ok(MediaKind::QuickTime),
            "video/mp4" => Ok(MediaKind::Mp4),
            other => Err(Error::UnrecognizedMediaType {
                path: path.to_path_buf(),
                mime_type: other.to_string(),
            }),
        }
    }
}

/// Fields shared by every medium.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseMedium {
    pub file_modify_date: DateTime<FixedOffset>,
    pub camera: Camera,
    pub base_name: String,
    pub extension: Extension,
    pub mime_type: String,
    /// Raw capture date from the camera's authoritative date tag, before
    /// any correction is applied.
    pub capture_date: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub base: BaseMedium,
    pub resolution: String,
    pub shutter_speed: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Video {
    pub base: BaseMedium,
    pub resolution: String,
    pub frame_rate: String,
}

/// A classified media file. Created once per source file, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub enum Medium {
    Image(Image),
    Video(Video),
}

impl Medium {
    pub fn base(&self) -> &BaseMedium {
        match self {
            Medium::Image(image) => &image.base,
            Medium::Video(video) => &video.base,
        }
    }

    pub fn camera(&self) -> Camera {
        self.base().camera
    }

    pub fn extension(&self) -> Extension {
        self.base().extension
    }

    pub fn base_name(&self) -> &str {
        &self.base().base_name
    }

    pub fn capture_date(&self) -> NaiveDateTime {
        self.base().capture_date
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Medium::Image(_))
    }

    pub fn shutter_speed(&self) -> Option<&str> {
        match self {
            Medium::Image(image) => Some(&image.shutter_speed),
            Medium::Video(_) => None,
        }
    }

    /// Type-specific attribute block appended to target names: resolution
    /// for images, resolution-framerate for videos.
    pub fn name_attributes(&self) -> String {
        match self {
            Medium::Image(image) => image.resolution.clone(),
            Medium::Video(video) => format!("{}-{}", video.resolution, video.frame_rate),
        }
    }
}

/// Derive the output base name from a source file stem.
///
/// Vendor file names use a leading underscore as a sequence-group marker
/// which must not appear in output names. The first underscore inside the
/// stem joins the vendor prefix to the frame number and is dropped; later
/// underscores are meaningful separators and become hyphens.
pub fn sanitized_base_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let stem = stem.strip_prefix('_').unwrap_or(stem);
    stem.replacen('_', "", 1).replace('_', "-")
}

/// Classify a media file from its path and tag map.
pub fn classify(path: &Path, tags: &TagMap) -> Result<Medium> {
    let modify_date_raw = metadata::require_str(tags, "File:FileModifyDate", path)?;
    let file_modify_date =
        DateTime::parse_from_str(&modify_date_raw, "%Y:%m:%d %H:%M:%S%z").map_err(|source| {
            Error::TimestampParse {
                path: path.to_path_buf(),
                tag: "File:FileModifyDate".to_string(),
                value: modify_date_raw.clone(),
                source,
            }
        })?;

    let camera = cameras::identify(path, tags)?;
    let mime_type = metadata::require_str(tags, "File:MIMEType", path)?;
    let kind = MediaKind::from_mime(&mime_type, path)?;

    let base = BaseMedium {
        file_modify_date,
        camera,
        base_name: sanitized_base_name(path),
        extension: Extension::from_path(path)?,
        mime_type,
        capture_date: capture_date(tags, camera, path)?,
    };

    let medium = match kind {
        MediaKind::Jpeg | MediaKind::FujiRaw => Medium::Image(Image {
            resolution: format!(
                "{}x{}",
                metadata::require_i64(tags, "EXIF:ExifImageWidth", path)?,
                metadata::require_i64(tags, "EXIF:ExifImageHeight", path)?,
            ),
            shutter_speed: metadata::require_str(tags, "EXIF:ShutterSpeedValue", path)?,
            base,
        }),
        // DNG files carry their dimensions in the plain image tags rather
        // than the Exif sub-IFD ones.
        MediaKind::AdobeDng => Medium::Image(Image {
            resolution: format!(
                "{}x{}",
                metadata::require_i64(tags, "EXIF:ImageWidth", path)?,
                metadata::require_i64(tags, "EXIF:ImageHeight", path)?,
            ),
            shutter_speed: metadata::require_str(tags, "EXIF:ShutterSpeedValue", path)?,
            base,
        }),
        MediaKind::QuickTime | MediaKind::Mp4 => {
            let frame_rate = metadata::require_f64(tags, "QuickTime:VideoFrameRate", path)?;
            Medium::Video(Video {
                resolution: format!(
                    "{}p",
                    metadata::require_i64(tags, "QuickTime:ImageHeight", path)?
                ),
                frame_rate: format!("{}fps", (frame_rate * 100.0).round() / 100.0),
                base,
            })
        }
    };

    Ok(medium)
}

fn capture_date(tags: &TagMap, camera: Camera, path: &Path) -> Result<NaiveDateTime> {
    let raw = metadata::require_str(tags, camera.capture_date_tag, path)?;
    NaiveDateTime::parse_from_str(&raw, "%Y:%m:%d %H:%M:%S").map_err(|source| {
        Error::TimestampParse {
            path: path.to_path_buf(),
            tag: camera.capture_date_tag.to_string(),
            value: raw,
            source,
        }
    })
}
