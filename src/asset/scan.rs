//! Group file-list resolution.
//!
//! Bundle order:
//! 1. explicit files, in declaration order
//! 2. each directory spec in declaration order, matches sorted lexically
//!
//! A file reached twice keeps its first position.

use std::io;
use std::path::{Path, PathBuf};

use jwalk::{Parallelism, WalkDir};
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::core::{AssetGroup, DirectorySpec, ResolvedFile, WatchHint};

use super::PathResolver;
use super::resolver::to_slash;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("source file `{0}` not found")]
    MissingFile(PathBuf),

    #[error("failed to scan directory `{path}`")]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Lists the files a directory spec selects.
pub trait FileEnumerator: Send + Sync {
    /// Matching files under `dir` (already physical), in a stable order.
    fn enumerate(&self, dir: &Path, spec: &DirectorySpec) -> io::Result<Vec<PathBuf>>;
}

/// Default enumerator walking the filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct WalkEnumerator;

impl FileEnumerator for WalkEnumerator {
    fn enumerate(&self, dir: &Path, spec: &DirectorySpec) -> io::Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("`{}` is not a directory", dir.display()),
            ));
        }

        let depth = if spec.recurse { usize::MAX } else { 1 };
        let mut files = Vec::new();
        for entry in WalkDir::new(dir)
            .sort(true)
            .max_depth(depth)
            // already on a rayon worker
            .parallelism(Parallelism::Serial)
        {
            let entry = entry.map_err(io::Error::other)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let rel = path.strip_prefix(dir).unwrap_or(&path);
            if spec.matches(&to_slash(rel)) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Resolve a group's sources into bundle order.
pub fn resolve_files(
    group: &AssetGroup,
    resolver: &PathResolver,
    enumerator: &dyn FileEnumerator,
) -> Result<Vec<ResolvedFile>, ResolveError> {
    let mut seen: FxHashSet<PathBuf> = FxHashSet::default();
    let mut resolved = Vec::new();

    for spec in &group.files {
        let path = resolver.physical(&spec.path);
        if !path.is_file() {
            return Err(ResolveError::MissingFile(path));
        }
        if seen.insert(path.clone()) {
            let mut file = ResolvedFile::new(path, resolved.len());
            file.compress = spec.compress;
            resolved.push(file);
        }
    }

    for spec in &group.directories {
        let dir = resolver.physical(&spec.path);
        let matches = enumerator
            .enumerate(&dir, spec)
            .map_err(|source| ResolveError::Scan {
                path: dir.clone(),
                source,
            })?;
        for path in matches {
            let path = resolver.physical(&path);
            if seen.insert(path.clone()) {
                resolved.push(ResolvedFile::new(path, resolved.len()));
            }
        }
    }

    Ok(resolved)
}

/// Directories an external watcher should poll for `group`.
pub fn watch_hints(group: &AssetGroup, resolver: &PathResolver) -> Vec<WatchHint> {
    group
        .directories
        .iter()
        .map(|spec| WatchHint {
            dir: resolver.physical(&spec.path),
            recurse: spec.recurse,
            interval: spec.poll_interval,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FileSpec, Namespace};
    use regex::Regex;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, rel).unwrap();
    }

    fn names(files: &[ResolvedFile], root: &Path) -> Vec<String> {
        files
            .iter()
            .map(|f| to_slash(f.path.strip_prefix(root).unwrap()))
            .collect()
    }

    #[test]
    fn test_explicit_files_precede_directory_matches() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        for f in ["css/z.css", "css/lib/b.css", "css/lib/a.css", "css/lib/a.min.css"] {
            touch(root, f);
        }

        let group = AssetGroup::new(Namespace::Css, "main", "out/main.css")
            .file("css/z.css")
            .directory(
                DirectorySpec::new("css/lib")
                    .include(Regex::new(r"\.css$").unwrap())
                    .exclude(Regex::new(r"\.min\.css$").unwrap()),
            );

        let resolver = PathResolver::new(root, "/");
        let files = resolve_files(&group, &resolver, &WalkEnumerator).unwrap();
        assert_eq!(names(&files, root), ["css/z.css", "css/lib/a.css", "css/lib/b.css"]);
        assert_eq!(
            files.iter().map(|f| f.position).collect::<Vec<_>>(),
            [0, 1, 2]
        );
    }

    #[test]
    fn test_recurse_flag() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "js/app.js");
        touch(root, "js/vendor/jq.js");

        let resolver = PathResolver::new(root, "/");
        let flat = AssetGroup::new(Namespace::Js, "app", "out/app.js")
            .directory(DirectorySpec::new("js"));
        let deep = AssetGroup::new(Namespace::Js, "app", "out/app.js")
            .directory(DirectorySpec::new("js").recursive());

        assert_eq!(
            names(&resolve_files(&flat, &resolver, &WalkEnumerator).unwrap(), root),
            ["js/app.js"]
        );
        assert_eq!(
            names(&resolve_files(&deep, &resolver, &WalkEnumerator).unwrap(), root),
            ["js/app.js", "js/vendor/jq.js"]
        );
    }

    #[test]
    fn test_duplicate_keeps_first_position() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "css/a.css");
        touch(root, "css/b.css");

        let group = AssetGroup::new(Namespace::Css, "main", "out/main.css")
            .file("css/b.css")
            .directory(DirectorySpec::new("css"));

        let resolver = PathResolver::new(root, "/");
        let files = resolve_files(&group, &resolver, &WalkEnumerator).unwrap();
        assert_eq!(names(&files, root), ["css/b.css", "css/a.css"]);
    }

    #[test]
    fn test_compress_hint_carried() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.js");
        let group = AssetGroup::new(Namespace::Js, "app", "out.js")
            .file(FileSpec::new("a.js").with_compress(false));
        let resolver = PathResolver::new(dir.path(), "/");
        let files = resolve_files(&group, &resolver, &WalkEnumerator).unwrap();
        assert_eq!(files[0].compress, Some(false));
    }

    #[test]
    fn test_missing_sources() {
        let dir = TempDir::new().unwrap();
        let resolver = PathResolver::new(dir.path(), "/");

        let group = AssetGroup::new(Namespace::Css, "main", "out.css").file("nope.css");
        assert!(matches!(
            resolve_files(&group, &resolver, &WalkEnumerator),
            Err(ResolveError::MissingFile(_))
        ));

        let group = AssetGroup::new(Namespace::Css, "main", "out.css")
            .directory(DirectorySpec::new("missing"));
        assert!(matches!(
            resolve_files(&group, &resolver, &WalkEnumerator),
            Err(ResolveError::Scan { .. })
        ));
    }

    #[test]
    fn test_watch_hints() {
        let resolver = PathResolver::new("/srv", "/");
        let group = AssetGroup::new(Namespace::Css, "main", "out.css").directory(
            DirectorySpec::new("css")
                .recursive()
                .poll_every(std::time::Duration::from_secs(2)),
        );
        let hints = watch_hints(&group, &resolver);
        assert_eq!(hints.len(), 1);
        assert_eq!(hints[0].dir, PathBuf::from("/srv/css"));
        assert!(hints[0].recurse);
    }
}
