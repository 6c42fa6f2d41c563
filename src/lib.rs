//! dcim-sort - Camera card media organizer
//!
//! This library copies photos and videos off capture cards into a
//! date-organized tree, with support for:
//! - exiftool-based metadata classification per camera model
//! - Capture date rectification (camera corrections plus a global offset)
//! - Deterministic target names encoding time, camera and recording attributes
//! - Ordering-consistency verification between source and target
//! - Time-lapse burst aggregation with proxy video encoding
//! - xxHash-based copy verification

pub mod cameras;
pub mod check;
pub mod cli;
pub mod config;
pub mod error;
pub mod fsops;
pub mod hash;
pub mod medium;
pub mod metadata;
pub mod proxy;
pub mod timelapse;
pub mod transfer;
pub mod util;

pub use cli::{Cli, Command, SortArgs};
pub use config::Config;
pub use error::{Error, Result};
pub use medium::{Extension, Medium};
pub use timelapse::{Aggregation, ProxyJob, TimelapseSpec};
pub use transfer::Transfer;
