//! Virtual (URL) ↔ physical path mapping.

use std::path::{Component, Path, PathBuf};

/// Maps files under the application root to root-relative URLs.
///
/// ```text
/// root = /srv/app, url_prefix = /static/
/// /srv/app/css/site.css  ↔  /static/css/site.css
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    root: PathBuf,
    url_prefix: String,
}

impl PathResolver {
    pub fn new(root: impl AsRef<Path>, url_prefix: &str) -> Self {
        let trimmed = url_prefix.trim_matches('/');
        let url_prefix = if trimmed.is_empty() {
            "/".to_string()
        } else {
            format!("/{trimmed}/")
        };
        Self {
            root: clean_path(root.as_ref()),
            url_prefix,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// URL prefix, always starting and ending with `/`.
    pub fn root_uri(&self) -> &str {
        &self.url_prefix
    }

    /// Physical location of a root-relative or absolute path.
    pub fn physical(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            clean_path(path)
        } else {
            clean_path(&self.root.join(path))
        }
    }

    /// URL of a physical path, or `None` if it lies outside the root.
    pub fn url_for(&self, physical: &Path) -> Option<String> {
        let rel = clean_path(physical).strip_prefix(&self.root).ok()?.to_path_buf();
        Some(format!("{}{}", self.url_prefix, to_slash(&rel)))
    }

    /// Physical location of a URL under the prefix.
    pub fn physical_for_url(&self, url: &str) -> Option<PathBuf> {
        let rel = url.strip_prefix(&self.url_prefix)?;
        Some(self.physical(Path::new(rel)))
    }

    /// Resolve `reference` relative to the directory containing `from`.
    pub fn resolve_relative(&self, reference: &str, from: &Path) -> PathBuf {
        let base = from.parent().unwrap_or(&self.root);
        clean_path(&base.join(reference))
    }
}

/// `/`-separated string form of a relative path.
pub(crate) fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Lexically remove `.` and `..` components without touching the filesystem.
pub(crate) fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
