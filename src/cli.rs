//! CLI argument parsing with clap

use crate::config::Config;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// dcim-sort - Camera card media organizer
///
/// Copies photos and videos off capture cards into a date-organized tree,
/// naming every file after its rectified capture time, camera and recording
/// attributes, with optional time-lapse burst aggregation.
#[derive(Parser, Debug)]
#[command(name = "dcim-sort")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output log format as JSON
    #[arg(long, global = true)]
    pub json_log: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Copy media files from a capture card into the destination tree
    Sort(SortArgs),

    /// Print the classified metadata and derived file name for one media file
    Info {
        /// Media file to inspect
        media_file: PathBuf,
    },

    /// List source files whose sorted counterparts are missing from the
    /// destination tree
    CheckSorted {
        /// Capture card directory to check
        source: PathBuf,
        /// Destination tree the card was sorted into
        destination: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct SortArgs {
    /// Capture card directory to copy from
    pub source: PathBuf,

    /// Destination tree to copy into
    pub destination: PathBuf,

    /// Path to configuration file (TOML format)
    ///
    /// When specified, settings from the config file are used as defaults.
    /// CLI arguments will override config file settings.
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Offset in seconds added to every capture date (camera clock drift)
    #[arg(short = 't', long, allow_hyphen_values = true)]
    pub time_offset: Option<i64>,

    /// Aggregate the card contents as one time-lapse burst
    #[arg(short = 'l', long)]
    pub timelapse: bool,

    /// Dry run mode - print the transfer plan without doing it
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Delete source files after their copies are checksum-verified
    #[arg(long)]
    pub delete: bool,

    /// Allowed jitter in seconds between time-lapse frame intervals
    #[arg(long)]
    pub interval_tolerance: Option<i64>,

    /// Frame rate for proxy videos encoded from time-lapse stills
    #[arg(long)]
    pub proxy_fps: Option<u32>,
}

impl SortArgs {
    /// Merge CLI arguments with config from file
    /// CLI arguments take precedence over config file settings
    pub fn merge_with_config(&self, mut config: Config) -> Config {
        if let Some(offset) = self.time_offset {
            config.time_offset_secs = offset;
        }
        if self.timelapse {
            config.timelapse = true;
        }
        if self.dry_run {
            config.dry_run = true;
        }
        if self.delete {
            config.delete_source = true;
        }
        if let Some(tolerance) = self.interval_tolerance {
            config.interval_tolerance_secs = tolerance;
        }
        if let Some(fps) = self.proxy_fps {
            config.proxy_frame_rate = fps;
        }
        config
    }

    /// Convert CLI arguments to Config (when no config file is used)
    pub fn to_config(&self) -> Config {
        self.merge_with_config(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_args_override_config_file() {
        let cli = Cli::parse_from([
            "dcim-sort", "sort", "card", "gallery", "--time-offset", "-30", "--timelapse",
        ]);
        let Command::Sort(args) = &cli.command else {
            panic!("expected sort subcommand");
        };

        let mut file_config = Config::default();
        file_config.time_offset_secs = 3600;
        file_config.proxy_frame_rate = 30;

        let merged = args.merge_with_config(file_config);
        assert_eq!(merged.time_offset_secs, -30);
        assert!(merged.timelapse);
        // Not given on the CLI, file value wins
        assert_eq!(merged.proxy_frame_rate, 30);
    }

    #[test]
    fn test_global_flags_parse_after_subcommand() {
        let cli = Cli::parse_from(["dcim-sort", "info", "a.jpg", "--verbose"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Info { .. }));
    }
}
