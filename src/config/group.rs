//! `[[css]]`, `[[js]]` and `[[sprite]]` group tables.
//!
//! # Example
//!
//! ```toml
//! [[css]]
//! name = "main"
//! output = "public/main.css"
//! append_hash = true
//! files = [
//!     "css/reset.css",                        # plain path
//!     { path = "css/site.css", minify = false },
//! ]
//! directories = [
//!     { path = "css/widgets", recurse = true, include = '\.css$', exclude = '\.min\.css$' },
//! ]
//! ```

use std::path::PathBuf;
use std::time::Duration;

use regex::Regex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::core::{AssetGroup, DirectorySpec, FileSpec, GroupOptions, Namespace, Wrap};

use super::{ConfigDiagnostics, FieldPath};

/// One group table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    pub name: String,
    /// Bundle path relative to the application root.
    pub output: PathBuf,
    pub files: Vec<FileEntry>,
    pub directories: Vec<DirectoryConfig>,
    /// Reference sources individually.
    pub debug: bool,
    /// Version rewritten `url()` references.
    pub append_hash: bool,
    pub wrap: Option<WrapConfig>,
}

/// `"path"` or `{ path = "...", minify = bool }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileEntry {
    Simple(PathBuf),
    Full {
        path: PathBuf,
        #[serde(default)]
        minify: Option<bool>,
    },
}

impl FileEntry {
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Simple(path) | Self::Full { path, .. } => path,
        }
    }

    fn to_spec(&self) -> FileSpec {
        match self {
            Self::Simple(path) => FileSpec::new(path.clone()),
            Self::Full { path, minify } => FileSpec {
                path: path.clone(),
                compress: *minify,
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub path: PathBuf,
    pub recurse: bool,
    /// Regex over the path relative to `path`, `/`-separated.
    pub include: Option<String>,
    /// Applied after `include`.
    pub exclude: Option<String>,
    /// Poll interval hint for external watchers.
    pub poll_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WrapConfig {
    pub header: String,
    pub footer: String,
}

impl GroupConfig {
    /// Validate one namespace's groups, collecting every problem.
    pub fn validate_all(groups: &[GroupConfig], namespace: Namespace, diag: &mut ConfigDiagnostics) {
        let field = FieldPath::new(namespace.as_str());
        let mut names: FxHashMap<&str, usize> = FxHashMap::default();
        let mut outputs: FxHashMap<String, usize> = FxHashMap::default();

        for (i, group) in groups.iter().enumerate() {
            let field = field.index(i);

            if group.name.trim().is_empty() {
                diag.error(field.join("name"), "group name is empty");
            } else if let Some(prev) = names.insert(group.name.as_str(), i) {
                diag.error(
                    field.join("name"),
                    format!("duplicate {namespace} group `{}` (also at [{prev}])", group.name),
                );
            }

            if group.output.as_os_str().is_empty() && !group.debug {
                diag.error_with_hint(
                    field.join("output"),
                    "output path is empty",
                    "set `output`, or `debug = true` to reference sources individually",
                );
            } else if !group.output.as_os_str().is_empty() {
                let key = crate::core::CacheKey::new(namespace, &group.output).output;
                if let Some(prev) = outputs.insert(key, i) {
                    diag.error(
                        field.join("output"),
                        format!(
                            "output `{}` is also written by [{prev}]",
                            group.output.display()
                        ),
                    );
                }
            }

            if group.files.is_empty() && group.directories.is_empty() {
                diag.error(field.clone(), format!("group `{}` has no sources", group.name));
            }

            for (j, dir) in group.directories.iter().enumerate() {
                let field = field.join("directories").index(j);
                for (key, pattern) in [("include", &dir.include), ("exclude", &dir.exclude)] {
                    if let Some(pattern) = pattern
                        && let Err(e) = Regex::new(pattern)
                    {
                        diag.error(field.join(key), format!("invalid regex: {e}"));
                    }
                }
            }
        }
    }

    /// Build the engine-side group. Patterns must already be validated.
    pub fn to_group(&self, namespace: Namespace, force_debug: bool) -> Result<AssetGroup, regex::Error> {
        let mut group = AssetGroup::new(namespace, self.name.clone(), self.output.clone())
            .with_debug(self.debug || force_debug)
            .with_options(GroupOptions {
                append_hash: self.append_hash,
                wrap: self.wrap.as_ref().map(|w| Wrap {
                    header: w.header.clone(),
                    footer: w.footer.clone(),
                }),
            });

        for file in &self.files {
            group = group.file(file.to_spec());
        }
        for dir in &self.directories {
            let mut spec = DirectorySpec::new(dir.path.clone());
            if dir.recurse {
                spec = spec.recursive();
            }
            if let Some(pattern) = &dir.include {
                spec = spec.include(Regex::new(pattern)?);
            }
            if let Some(pattern) = &dir.exclude {
                spec = spec.exclude(Regex::new(pattern)?);
            }
            if let Some(ms) = dir.poll_ms {
                spec = spec.poll_every(Duration::from_millis(ms));
            }
            group = group.directory(spec);
        }
        Ok(group)
    }
}
