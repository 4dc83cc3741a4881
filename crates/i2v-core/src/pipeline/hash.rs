//! Content hashing so output records can be matched back to their input.

use blake3::Hasher as Blake3Hasher;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// BLAKE3 content hashing.
pub struct Hasher;

impl Hasher {
    /// Hash a file's contents, streaming it in 64KB chunks.
    pub fn content_hash(path: &Path) -> std::io::Result<String> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut hasher = Blake3Hasher::new();

        let mut buffer = [0u8; 65536];
        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(hasher.finalize().to_hex().to_string())
    }

    /// Hash a buffer that has already been read into memory.
    pub fn content_hash_from_bytes(data: &[u8]) -> String {
        blake3::hash(data).to_hex().to_string()
    }
}
