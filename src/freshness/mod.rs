//! Content fingerprints used for cache busting and change detection.

mod hash;

pub use hash::{ContentHash, hash_bytes, hash_file, hash_range, hash_reader};
