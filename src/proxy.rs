//! Proxy video encoding
//!
//! Time-lapse bursts shot without a wrap-up video get a browsable proxy
//! synthesized from the JPEG frames by shelling out to ffmpeg in glob
//! pattern mode.

use crate::error::{Error, Result};
use crate::timelapse::ProxyJob;
use std::fs;
use std::process::Command;
use tracing::info;

/// Encode the proxy video described by `job`.
///
/// The frames are read straight from the source card, so this runs before
/// any source deletion.
pub fn encode(job: &ProxyJob) -> Result<()> {
    if let Some(parent) = job.output.parent() {
        fs::create_dir_all(parent)?;
    }
    info!(
        glob = %job.source_glob,
        fps = job.frame_rate,
        output = %job.output.display(),
        "Encoding time-lapse proxy video",
    );

    let output = Command::new("ffmpeg")
        .args(["-framerate", &job.frame_rate.to_string()])
        .args(["-pattern_type", "glob", "-i", &job.source_glob])
        .args(["-pix_fmt", "yuv420p"])
        .arg(&job.output)
        .output()
        .map_err(|e| Error::ProxyEncode {
            message: format!("failed to run ffmpeg: {e}"),
        })?;

    if !output.status.success() {
        return Err(Error::ProxyEncode {
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

/// Check that ffmpeg is available before starting a run that will need it.
pub fn check_ffmpeg_installed() -> Result<()> {
    let available = Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false);
    if available {
        Ok(())
    } else {
        Err(Error::MissingDependency { tool: "ffmpeg" })
    }
}
