//! Cache dependencies: files stamped with their content hash.

use std::path::{Path, PathBuf};

use crate::core::Cancellation;
use crate::file::{FileError, RetryPolicy};
use crate::freshness::{ContentHash, hash_file};

/// A file and its last-known fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStamp {
    pub path: PathBuf,
    pub hash: ContentHash,
}

impl FileStamp {
    pub fn new(path: impl Into<PathBuf>, hash: ContentHash) -> Self {
        Self {
            path: path.into(),
            hash,
        }
    }

    /// Stamp a file with its current content.
    pub fn capture(path: &Path, policy: &RetryPolicy, cancel: &Cancellation) -> Result<Self, FileError> {
        Ok(Self::new(path, hash_file(path, policy, cancel)?))
    }
}

/// Files whose change invalidates a cache entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependency {
    files: Vec<FileStamp>,
}

impl Dependency {
    pub fn new(files: Vec<FileStamp>) -> Self {
        Self { files }
    }

    pub fn files(&self) -> &[FileStamp] {
        &self.files
    }

    pub fn mentions(&self, path: &Path) -> bool {
        self.files.iter().any(|f| f.path == path)
    }

    /// Whether any file changed or became unreadable.
    ///
    /// Stops at the first stale file.
    pub fn is_stale(&self, policy: &RetryPolicy) -> bool {
        let cancel = Cancellation::new();
        self.files.iter().any(|stamp| {
            match hash_file(&stamp.path, policy, &cancel) {
                Ok(current) => current != stamp.hash,
                Err(e) => {
                    crate::debug!("cache"; "dependency unreadable: {}", e);
                    true
                }
            }
        })
    }
}
