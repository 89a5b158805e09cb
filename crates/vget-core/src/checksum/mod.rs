//! Integrity verification: streaming SHA-256 over the merged output.
//!
//! Hashing runs after the merge, never inline with the download path.

pub mod sidecar;

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

/// SHA-256 of a file as lowercase hex. The file streams through a buffered
/// reader straight into the hasher (`Sha256` is an `io::Write` sink), so a
/// multi-gigabyte image never sits in memory.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut reader = BufReader::with_capacity(128 * 1024, File::open(path)?);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// True if `s` is a plausible SHA-256 digest: exactly 64 hex characters.
pub fn is_hex_digest(s: &str) -> bool {
    s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Case-insensitive digest comparison.
pub fn digests_match(expected: &str, actual: &str) -> bool {
    expected.eq_ignore_ascii_case(actual)
}
