//! Result of processing one group.

use std::path::PathBuf;
use std::time::Duration;

use crate::freshness::ContentHash;

use super::CacheKey;

/// Directory an external watcher should poll for this group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchHint {
    pub dir: PathBuf,
    pub recurse: bool,
    pub interval: Option<Duration>,
}

/// Renderable reference to a processed group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupOutput {
    pub key: CacheKey,
    /// Markup for embedding in a page (one tag per URL).
    pub markup: String,
    /// Referenced URLs: the versioned bundle, or every source in debug mode.
    pub urls: Vec<String>,
    /// Resolved source files, in bundle order.
    pub files_watched: Vec<PathBuf>,
    pub watch_dirs: Vec<WatchHint>,
    /// Digest of the written bundle (`None` in debug mode).
    pub hash: Option<ContentHash>,
}
