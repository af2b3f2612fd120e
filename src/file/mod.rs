//! File access with bounded retry on transient sharing/locking failures.
//!
//! Every operation runs under a [`RetryPolicy`]: a fixed attempt count with a
//! fixed backoff between attempts. Only transient errors are retried; anything
//! else (missing file, permission) fails on the first attempt. Writes go to a
//! temp file in the target directory and are renamed over the target, so
//! readers never observe partial output.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::NamedTempFile;
use thiserror::Error;

use crate::core::{Cancellation, Interrupted};

/// Bounded retry policy for file operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one (at least 1).
    pub attempts: u32,
    /// Sleep between attempts.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub const fn new(attempts: u32, backoff: Duration) -> Self {
        Self { attempts, backoff }
    }

    /// Single attempt, no sleeping.
    pub const fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_millis(50))
    }
}

#[derive(Debug, Error)]
pub enum FileError {
    #[error("I/O error on `{path}` after {attempts} attempt(s)")]
    Io {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: io::Error,
    },

    #[error("I/O on `{path}` stopped: {reason}")]
    Interrupted { path: PathBuf, reason: Interrupted },
}

impl FileError {
    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. } | Self::Interrupted { path, .. } => path,
        }
    }
}

/// Errors another process can cause by briefly holding the file.
fn is_transient(err: &io::Error) -> bool {
    // ERROR_SHARING_VIOLATION / ERROR_LOCK_VIOLATION
    #[cfg(windows)]
    if matches!(err.raw_os_error(), Some(32 | 33)) {
        return true;
    }

    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock
            | io::ErrorKind::Interrupted
            | io::ErrorKind::TimedOut
            | io::ErrorKind::ResourceBusy
    )
}

/// Run `op` under `policy`, sleeping between transient failures.
pub fn with_retry<T>(
    path: &Path,
    policy: &RetryPolicy,
    cancel: &Cancellation,
    mut op: impl FnMut() -> io::Result<T>,
) -> Result<T, FileError> {
    let max = policy.attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if is_transient(&err) && attempt < max => {
                crate::debug!("io"; "{} busy ({}), attempt {}/{}", path.display(), err, attempt, max);
                backoff(path, policy, cancel)?;
            }
            Err(source) => {
                return Err(FileError::Io {
                    path: path.to_path_buf(),
                    attempts: attempt,
                    source,
                });
            }
        }
    }
}

fn backoff(path: &Path, policy: &RetryPolicy, cancel: &Cancellation) -> Result<(), FileError> {
    cancel
        .sleep(policy.backoff)
        .map_err(|reason| FileError::Interrupted {
            path: path.to_path_buf(),
            reason,
        })
}

/// Open a file for reading.
pub fn open_read(path: &Path, policy: &RetryPolicy, cancel: &Cancellation) -> Result<File, FileError> {
    with_retry(path, policy, cancel, || File::open(path))
}

/// Read a whole file; the open and the read are retried together.
pub fn read_bytes(path: &Path, policy: &RetryPolicy, cancel: &Cancellation) -> Result<Vec<u8>, FileError> {
    with_retry(path, policy, cancel, || {
        let mut buf = Vec::new();
        File::open(path)?.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

/// Read a whole UTF-8 file.
pub fn read_to_string(
    path: &Path,
    policy: &RetryPolicy,
    cancel: &Cancellation,
) -> Result<String, FileError> {
    with_retry(path, policy, cancel, || fs::read_to_string(path))
}

/// Write `content` to `path` via temp file + rename.
///
/// Creates parent directories. The rename is retried with the same policy,
/// keeping the temp file between attempts.
pub fn write_atomic(
    path: &Path,
    content: &[u8],
    policy: &RetryPolicy,
    cancel: &Cancellation,
) -> Result<(), FileError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    with_retry(&dir, policy, cancel, || fs::create_dir_all(&dir))?;

    let mut temp = with_retry(path, policy, cancel, || NamedTempFile::new_in(&dir))?;
    let write = temp
        .write_all(content)
        .and_then(|()| temp.as_file().sync_all());
    if let Err(source) = write {
        return Err(FileError::Io {
            path: temp.path().to_path_buf(),
            attempts: 1,
            source,
        });
    }

    let max = policy.attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match temp.persist(path) {
            Ok(_) => return Ok(()),
            Err(err) if is_transient(&err.error) && attempt < max => {
                crate::debug!("io"; "replace {} busy, attempt {}/{}", path.display(), attempt, max);
                temp = err.file;
                backoff(path, policy, cancel)?;
            }
            Err(err) => {
                return Err(FileError::Io {
                    path: path.to_path_buf(),
                    attempts: attempt,
                    source: err.error,
                });
            }
        }
    }
}
