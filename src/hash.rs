//! xxHash-based file checksums for copy verification
//!
//! Reads in fixed-size blocks so multi-gigabyte video files never have to
//! fit in memory.

use crate::error::Result;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::trace;
use xxhash_rust::xxh3::Xxh3;

/// Block size for streaming reads (8 KiB)
const BLOCK_SIZE: usize = 8192;

/// Compute the xxHash3 checksum of a file's full contents.
pub fn compute_file_hash(path: &Path) -> Result<u64> {
    let mut file = File::open(path)?;
    let mut hasher = Xxh3::new();
    let mut buffer = [0u8; BLOCK_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    let hash = hasher.digest();
    trace!(?path, hash, "Computed file hash");
    Ok(hash)
}
