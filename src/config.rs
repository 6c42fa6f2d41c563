//! Configuration types for the card sorter

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_interval_tolerance() -> i64 {
    2
}

fn default_proxy_frame_rate() -> u32 {
    25
}

/// Run configuration, loadable from a TOML file. Paths are always given on
/// the command line; the file only carries tunables worth persisting between
/// runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Global offset in seconds added to every rectified capture date,
    /// for cameras whose clock drifted or was set in another timezone
    #[serde(default)]
    pub time_offset_secs: i64,

    /// Treat the source as a time-lapse burst and aggregate it
    #[serde(default)]
    pub timelapse: bool,

    /// Dry run mode - print the transfer plan without touching the disk
    #[serde(default)]
    pub dry_run: bool,

    /// Delete each source file after its copy has been checksum-verified
    #[serde(default)]
    pub delete_source: bool,

    /// Allowed jitter in seconds between time-lapse frame intervals
    #[serde(default = "default_interval_tolerance")]
    pub interval_tolerance_secs: i64,

    /// Frame rate for proxy videos encoded from time-lapse stills
    #[serde(default = "default_proxy_frame_rate")]
    pub proxy_frame_rate: u32,

    /// Verbose output
    #[serde(default)]
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_offset_secs: 0,
            timelapse: false,
            dry_run: false,
            delete_source: false,
            interval_tolerance_secs: default_interval_tolerance(),
            proxy_frame_rate: default_proxy_frame_rate(),
            verbose: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            Error::Config(format!("Failed to parse config file '{}': {}", path.display(), e))
        })?;
        Ok(config)
    }
}
