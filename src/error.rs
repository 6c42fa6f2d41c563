//! Error types for dcim-sort

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for dcim-sort operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for dcim-sort
///
/// Every variant is fatal to the run: the core detects and reports, it does
/// not recover. Messages carry the offending file name(s) so an operator can
/// act on them without re-running with extra verbosity.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Directory traversal failed: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("{tool} not found, please install it and make sure it is in PATH")]
    MissingDependency { tool: &'static str },

    #[error("exiftool failed for {path}: {message}")]
    ExifTool { path: PathBuf, message: String },

    #[error("Required tag '{tag}' missing from metadata of {path}")]
    MissingTag { path: PathBuf, tag: String },

    #[error("Failed to parse timestamp '{value}' from tag '{tag}' of {path}: {source}")]
    TimestampParse {
        path: PathBuf,
        tag: String,
        value: String,
        source: chrono::ParseError,
    },

    #[error("Metadata of {path} does not match any registered camera signature")]
    UnrecognizedCamera { path: PathBuf },

    #[error("Unsupported file extension: {path}")]
    UnsupportedExtension { path: PathBuf },

    #[error("'{mime_type}' MIMEType of {path} not yet handled")]
    UnrecognizedMediaType { path: PathBuf, mime_type: String },

    #[error(
        "Expected exactly one video sibling for {path}, found {}: {}",
        candidates.len(),
        display_paths(candidates)
    )]
    AmbiguousSibling {
        path: PathBuf,
        candidates: Vec<PathBuf>,
    },

    #[error(
        "Sorting by target differs from sorting by source, likely due to an incorrect \
         timestamp. Orderings written to 'sorted_by_source.json' and 'sorted_by_target.json'. \
         First divergences:\n{detail}"
    )]
    OrderingMismatch { detail: String },

    #[error("Inconsistent time-lapse burst: {detail}")]
    InconsistentBurst { detail: String },

    #[error("Image interval unexpected, time-lapse might need to be split up:\n{detail}")]
    IrregularInterval { detail: String },

    #[error("Shutter speed differs across time-lapse frames: found {found:?}")]
    InconsistentShutterSpeed { found: Vec<String> },

    #[error("Target checksum does not match source checksum for {path}")]
    CopyVerification { path: PathBuf },

    #[error("Single value expected for {what}, found: {found:?}")]
    SingleValueExpected { what: String, found: Vec<String> },

    #[error("Proxy encoding failed: {message}")]
    ProxyEncode { message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
