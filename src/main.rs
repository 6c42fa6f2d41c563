//! dcim-sort - Camera card media organizer
//!
//! A CLI tool that copies media files off capture cards into a
//! date-organized tree, naming each file after its rectified capture time,
//! camera and recording attributes.

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use dcim_sort::{Cli, Command, Config, SortArgs, check, fsops, metadata, proxy, timelapse, transfer};
use std::path::{Path, PathBuf};
use tracing::{Level, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = get_log_path()?;
    let _guard = setup_logging(&cli, &log_path)?;

    info!(version = env!("CARGO_PKG_VERSION"), "dcim-sort starting");

    match &cli.command {
        Command::Sort(args) => run_sort(args),
        Command::Info { media_file } => run_info(media_file),
        Command::CheckSorted {
            source,
            destination,
        } => run_check_sorted(source, destination),
    }
}

/// Run the sort subcommand: assemble, optionally aggregate, verify, copy.
fn run_sort(args: &SortArgs) -> Result<()> {
    let config = load_config(args)?;
    metadata::check_exiftool_installed()?;

    let transfers = transfer::assemble(&args.source, &args.destination, config.time_offset_secs)?;
    if transfers.is_empty() {
        info!(source = %args.source.display(), "No media files found");
        return Ok(());
    }

    let (transfers, proxy_job) = if config.timelapse {
        let aggregation = timelapse::aggregate(
            transfers,
            config.interval_tolerance_secs,
            config.proxy_frame_rate,
        )?;
        (aggregation.transfers, aggregation.proxy)
    } else {
        (transfers, None)
    };

    check::verify_transfers(&transfers, config.timelapse)?;

    // The proxy encoder reads frames from the source card, so it has to run
    // before any copy-then-delete pass removes them.
    if let Some(job) = &proxy_job {
        if config.dry_run {
            println!("{} --> {}", job.source_glob, job.output.display());
        } else {
            proxy::check_ffmpeg_installed()?;
            proxy::encode(job)?;
        }
    }

    fsops::execute_transfers(&transfers, config.dry_run, config.delete_source)?;

    info!(count = transfers.len(), dry_run = config.dry_run, "Sort complete");
    Ok(())
}

/// Run the info subcommand: print the raw tag map for one file, then the
/// classification and naming derived from it.
fn run_info(media_file: &Path) -> Result<()> {
    metadata::check_exiftool_installed()?;
    let tags = metadata::tags_for_classification(media_file)?;
    println!("{}", serde_json::to_string_pretty(&tags)?);
    let transfer = transfer::assemble_one(media_file, Path::new(""), 0)?;
    println!("{:#?}", transfer.medium);
    println!("rectified: {}", transfer.rectified_date);
    println!("target:    {}", transfer.target_path.display());
    Ok(())
}

/// Run the check-sorted subcommand: list source files whose derived targets
/// are missing from the destination tree.
fn run_check_sorted(source: &Path, destination: &Path) -> Result<()> {
    metadata::check_exiftool_installed()?;
    let transfers = transfer::assemble(source, destination, 0)?;
    let missing = fsops::files_not_sorted(&transfers);

    if missing.is_empty() {
        println!("All {} files are sorted.", transfers.len());
        Ok(())
    } else {
        for path in &missing {
            println!("{}", path.display());
        }
        anyhow::bail!("{} of {} files are not sorted", missing.len(), transfers.len());
    }
}

/// Load configuration from file or CLI arguments
fn load_config(args: &SortArgs) -> Result<Config> {
    let config = if let Some(ref config_path) = args.config {
        info!(config_file = %config_path.display(), "Loading configuration from file");
        let file_config = Config::load_from_file(config_path)?;
        args.merge_with_config(file_config)
    } else {
        args.to_config()
    };
    Ok(config)
}

/// Log files go to `Log/` next to the executable, one per run.
fn get_log_path() -> Result<PathBuf> {
    let exe_path = std::env::current_exe()?;
    let exe_dir = exe_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    Ok(exe_dir.join("Log").join(format!("Run_{}.log", timestamp)))
}

/// Setup logging (file + console)
fn setup_logging(cli: &Cli, log_path: &Path) -> Result<Option<WorkerGuard>> {
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if cli.json_log {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(Some(guard))
}
