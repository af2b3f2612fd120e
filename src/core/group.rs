//! Asset group definitions.
//!
//! Groups are loaded once per run and never mutated afterwards; the bundler
//! shares them behind `Arc`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;

use super::CacheKey;

// =============================================================================
// Namespace
// =============================================================================

/// Group type. Separates css/js/sprite groups that share an output path space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    Css,
    Js,
    Sprite,
}

impl Namespace {
    pub const ALL: [Namespace; 3] = [Namespace::Css, Namespace::Js, Namespace::Sprite];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Css => "css",
            Self::Js => "js",
            Self::Sprite => "sprite",
        }
    }

    /// Separator placed between concatenated files.
    ///
    /// Scripts get a statement terminator so a file missing its trailing
    /// semicolon cannot merge into the next one.
    pub const fn separator(self) -> &'static str {
        match self {
            Self::Js => ";\n",
            Self::Css | Self::Sprite => "\n",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// File and directory specs
// =============================================================================

/// An explicitly listed source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpec {
    /// Path relative to the application root (or absolute).
    pub path: PathBuf,
    /// Per-file compression hint for plugins (`None` = plugin default).
    pub compress: Option<bool>,
}

impl FileSpec {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            compress: None,
        }
    }

    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = Some(compress);
        self
    }
}

/// A filtered directory scan.
#[derive(Debug, Clone)]
pub struct DirectorySpec {
    pub path: PathBuf,
    pub recurse: bool,
    /// Matched against the path relative to `path`, `/`-separated.
    pub include: Option<Regex>,
    /// Applied after `include`.
    pub exclude: Option<Regex>,
    /// Hint for external watchers; the engine itself never polls.
    pub poll_interval: Option<Duration>,
}

impl DirectorySpec {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            recurse: false,
            include: None,
            exclude: None,
            poll_interval: None,
        }
    }

    pub fn recursive(mut self) -> Self {
        self.recurse = true;
        self
    }

    pub fn include(mut self, pattern: Regex) -> Self {
        self.include = Some(pattern);
        self
    }

    pub fn exclude(mut self, pattern: Regex) -> Self {
        self.exclude = Some(pattern);
        self
    }

    pub fn poll_every(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Whether a relative path passes the include-then-exclude filters.
    pub fn matches(&self, relative: &str) -> bool {
        let included = self.include.as_ref().is_none_or(|re| re.is_match(relative));
        included && !self.exclude.as_ref().is_some_and(|re| re.is_match(relative))
    }
}

// =============================================================================
// Group
// =============================================================================

/// Header/footer placed around the bundled content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wrap {
    pub header: String,
    pub footer: String,
}

/// Group-level options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupOptions {
    /// Append `?v=<hash>` to rewritten asset references.
    pub append_hash: bool,
    pub wrap: Option<Wrap>,
}

/// A named set of sources bundled into one output.
#[derive(Debug, Clone)]
pub struct AssetGroup {
    pub name: String,
    pub namespace: Namespace,
    /// Output path relative to the application root.
    pub output: PathBuf,
    pub files: Vec<FileSpec>,
    pub directories: Vec<DirectorySpec>,
    /// Reference sources individually instead of bundling.
    pub debug: bool,
    pub options: GroupOptions,
}

impl AssetGroup {
    pub fn new(namespace: Namespace, name: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            namespace,
            output: output.into(),
            files: Vec::new(),
            directories: Vec::new(),
            debug: false,
            options: GroupOptions::default(),
        }
    }

    pub fn file(mut self, spec: impl Into<FileSpec>) -> Self {
        self.files.push(spec.into());
        self
    }

    pub fn directory(mut self, spec: DirectorySpec) -> Self {
        self.directories.push(spec);
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_options(mut self, options: GroupOptions) -> Self {
        self.options = options;
        self
    }

    /// Cache identity: (namespace, output path).
    ///
    /// A debug group without an output is keyed by `@name` instead.
    pub fn key(&self) -> CacheKey {
        if self.output.as_os_str().is_empty() {
            return CacheKey {
                namespace: self.namespace,
                output: format!("@{}", self.name),
            };
        }
        CacheKey::new(self.namespace, &self.output)
    }
}

impl From<&str> for FileSpec {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<PathBuf> for FileSpec {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

// =============================================================================
// Resolved file
// =============================================================================

/// A physical source file at its position in the group's bundle order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub path: PathBuf,
    pub position: usize,
    pub compress: Option<bool>,
}

impl ResolvedFile {
    pub fn new(path: PathBuf, position: usize) -> Self {
        Self {
            path,
            position,
            compress: None,
        }
    }

    /// Lowercased extension without the dot (empty if none).
    pub fn extension(&self) -> String {
        extension_of(&self.path)
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}
