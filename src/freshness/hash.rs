//! Content hashing using blake3.
//!
//! Digests depend only on bytes: a file and an in-memory copy of it hash the
//! same, and timestamps never enter the digest.

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use crate::core::Cancellation;
use crate::file::{self, FileError, RetryPolicy};

const CHUNK: usize = 64 * 1024;

/// A 256-bit content hash (blake3 output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    #[inline]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    /// Short form used as the cache-busting `v=` token (16 hex chars).
    pub fn version(self) -> String {
        self.to_hex()[..16].to_string()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.version())
    }
}

/// Hash an in-memory buffer.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
    ContentHash::new(*blake3::hash(data).as_bytes())
}

/// Hash an entire stream from its current position to EOF.
pub fn hash_reader(mut reader: impl Read) -> io::Result<ContentHash> {
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; CHUNK];
    loop {
        match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => {
                hasher.update(&buffer[..n]);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(ContentHash::new(*hasher.finalize().as_bytes()))
}

/// Hash the byte range `[start, end)` of a seekable stream.
///
/// Fails with `InvalidInput` if `end < start` and `UnexpectedEof` if the
/// stream ends before `end`.
pub fn hash_range<R: Read + Seek>(mut reader: R, start: u64, end: u64) -> io::Result<ContentHash> {
    if end < start {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid range [{start}, {end})"),
        ));
    }
    reader.seek(SeekFrom::Start(start))?;

    let len = end - start;
    let mut limited = reader.take(len);
    let mut hasher = blake3::Hasher::new();
    let copied = io::copy(&mut limited, &mut hasher)?;
    if copied != len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("range [{start}, {end}) past end of stream ({} bytes)", start + copied),
        ));
    }
    Ok(ContentHash::new(*hasher.finalize().as_bytes()))
}

/// Hash a file opened through the retrying file layer.
pub fn hash_file(
    path: &Path,
    policy: &RetryPolicy,
    cancel: &Cancellation,
) -> Result<ContentHash, FileError> {
    file::with_retry(path, policy, cancel, || {
        let file = std::fs::File::open(path)?;
        hash_reader(io::BufReader::with_capacity(CHUNK, file))
    })
}
