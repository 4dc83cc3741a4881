//! Input side of the CLI pipeline.
//!
//! - **discovery**: find image files in directories
//! - **hash**: BLAKE3 content hashes for output records
//! - **decode**: read, hash and decode a file into an estimator-ready tensor

pub mod decode;
pub mod discovery;
pub mod hash;

pub use decode::{DecodedImage, ImageDecoder};
pub use discovery::{DiscoveredFile, FileDiscovery};
pub use hash::Hasher;
