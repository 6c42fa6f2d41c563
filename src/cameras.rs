//! Static camera registry
//!
//! Maps vendor-specific tag signatures to camera descriptors. The DJI Osmo
//! Action is registered twice because the vendor encodes different handler
//! strings (and authoritative date tags) for its video and photo streams.

use crate::error::{Error, Result};
use crate::metadata::TagMap;
use chrono::TimeDelta;
use std::path::Path;

/// Descriptor for a supported camera.
///
/// `capture_date_tag` names the exiftool field holding the authoritative
/// capture date; `correction_secs` is the camera-specific offset that must be
/// applied to it to obtain the rectified timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Camera {
    pub name: &'static str,
    pub capture_date_tag: &'static str,
    pub correction_secs: i64,
}

impl Camera {
    pub fn correction(&self) -> TimeDelta {
        TimeDelta::seconds(self.correction_secs)
    }
}

pub const FUJIFILM_X_T3: Camera = Camera {
    name: "x-t3",
    capture_date_tag: "EXIF:DateTimeOriginal",
    correction_secs: 0,
};

pub const DJI_OSMO_ACTION_VIDEO: Camera = Camera {
    name: "dji-oa",
    capture_date_tag: "QuickTime:MediaCreateDate",
    correction_secs: 3600,
};

pub const DJI_OSMO_ACTION_PHOTO: Camera = Camera {
    name: "dji-oa",
    capture_date_tag: "EXIF:DateTimeOriginal",
    correction_secs: 0,
};

/// Resolve the camera that produced a file from its tag map.
///
/// Images identify themselves through `EXIF:Model`, videos through
/// `QuickTime:HandlerDescription`. Exact string match against the registry;
/// anything else is an unrecognized camera.
pub fn identify(path: &Path, tags: &TagMap) -> Result<Camera> {
    let identifier = tags
        .get("EXIF:Model")
        .or_else(|| tags.get("QuickTime:HandlerDescription"))
        .and_then(|v| v.as_str());

    match identifier {
        Some("X-T3") => Ok(FUJIFILM_X_T3),
        Some("\u{10}DJI.Meta") => Ok(DJI_OSMO_ACTION_VIDEO),
        Some("DJI Osmo Action") => Ok(DJI_OSMO_ACTION_PHOTO),
        _ => Err(Error::UnrecognizedCamera {
            path: path.to_path_buf(),
        }),
    }
}
