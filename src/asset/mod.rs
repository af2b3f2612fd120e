//! Source resolution and path mapping.

mod resolver;
mod scan;

pub use resolver::PathResolver;
pub use scan::{FileEnumerator, ResolveError, WalkEnumerator, resolve_files, watch_hints};
