//! External collaborators of the download loop: archive validity checking
//! and best-effort file removal.

use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

/// Tar archives are written in 512-byte blocks; one block is enough to tell
/// a truncated or garbage download from a real archive.
const TAR_BLOCK_SIZE: usize = 512;

/// Fast, non-exhaustive check that `path` is a well-formed gzipped tar
/// archive: the gzip header must decode and the first tar block must be
/// fully readable.
pub fn check_archive_fast(path: &Path) -> bool {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(_) => return false,
    };

    let mut block = [0u8; TAR_BLOCK_SIZE];
    GzDecoder::new(file).read_exact(&mut block).is_ok()
}

/// Remove `path`, swallowing any error (including the file not existing).
pub fn silent_remove(path: &Path) {
    let _ = fs::remove_file(path);
}
