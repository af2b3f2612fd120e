//! Core types - pure abstractions shared across the codebase.

mod cancel;
mod group;
mod key;
mod output;

pub use cancel::{Cancellation, Interrupted};
pub use group::{
    AssetGroup, DirectorySpec, FileSpec, GroupOptions, Namespace, ResolvedFile, Wrap,
};
pub use key::CacheKey;
pub use output::{GroupOutput, WatchHint};
