//! Cache key for bundled groups.

use std::fmt;
use std::path::Path;

use super::Namespace;

/// `(namespace, output path)` pair identifying a bundle.
///
/// The output path is stored `/`-separated without a leading `./` so the same
/// output spelled two ways maps to one key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub namespace: Namespace,
    pub output: String,
}

impl CacheKey {
    pub fn new(namespace: Namespace, output: &Path) -> Self {
        let output = output
            .components()
            .filter_map(|c| match c {
                std::path::Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/");
        Self { namespace, output }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.output)
    }
}
