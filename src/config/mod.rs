//! Bundle configuration management for `sheaf.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── error.rs   # ConfigError, diagnostics, FieldPath
//! ├── group.rs   # [[css]] / [[js]] / [[sprite]] tables
//! └── mod.rs     # BundleConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section         | Purpose                                        |
//! |-----------------|------------------------------------------------|
//! | top level       | root, url_prefix, debug, deadline_secs         |
//! | `[io]`          | Retry policy for file access                   |
//! | `[[css]]` ...   | Asset groups, one table per group              |

mod error;
mod group;

pub use error::{ConfigDiagnostic, ConfigDiagnostics, ConfigError, FieldPath};
pub use group::{DirectoryConfig, FileEntry, GroupConfig, WrapConfig};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::asset::PathResolver;
use crate::core::{AssetGroup, Namespace};
use crate::file::RetryPolicy;

/// Default config file name.
pub const CONFIG_FILE: &str = "sheaf.toml";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing sheaf.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Application root; relative to the config file's directory.
    pub root: PathBuf,

    /// URL prefix the root is served under.
    pub url_prefix: String,

    /// Force debug mode for every group.
    pub debug: bool,

    /// Overall build deadline.
    pub deadline_secs: Option<u64>,

    pub io: IoConfig,

    pub css: Vec<GroupConfig>,
    pub js: Vec<GroupConfig>,
    pub sprite: Vec<GroupConfig>,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            root: PathBuf::from("."),
            url_prefix: "/".into(),
            debug: false,
            deadline_secs: None,
            io: IoConfig::default(),
            css: Vec::new(),
            js: Vec::new(),
            sprite: Vec::new(),
        }
    }
}

/// `[io]` section.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct IoConfig {
    /// Attempts per file operation, including the first.
    pub attempts: u32,
    /// Sleep between attempts.
    pub backoff_ms: u64,
}

impl Default for IoConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            attempts: policy.attempts,
            backoff_ms: policy.backoff.as_millis() as u64,
        }
    }
}

impl FromStr for BundleConfig {
    type Err = ConfigError;

    /// Parse TOML content without touching the filesystem.
    fn from_str(content: &str) -> Result<Self, ConfigError> {
        let (config, _) = Self::parse_with_ignored(content)?;
        Ok(config)
    }
}

impl BundleConfig {
    /// Load, warn about unknown fields, anchor `root` at the config directory,
    /// and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (mut config, ignored) = Self::parse_with_ignored(&content)?;
        let mut diag = ConfigDiagnostics::new();
        for field in ignored {
            diag.ignored(field);
        }
        diag.print_warnings();

        let base = path.parent().unwrap_or(Path::new("."));
        config.root = base.join(&config.root);
        config.config_path = path.to_path_buf();

        config.validate()?;
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Collect every problem before failing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();

        if self.io.attempts == 0 {
            diag.error_with_hint(
                FieldPath::new("io.attempts"),
                "must be at least 1",
                "use 1 to disable retries",
            );
        }
        if self.deadline_secs == Some(0) {
            diag.error(FieldPath::new("deadline_secs"), "deadline must be positive");
        }
        for namespace in Namespace::ALL {
            GroupConfig::validate_all(self.groups_of(namespace), namespace, &mut diag);
        }

        diag.into_result()
    }

    pub fn groups_of(&self, namespace: Namespace) -> &[GroupConfig] {
        match namespace {
            Namespace::Css => &self.css,
            Namespace::Js => &self.js,
            Namespace::Sprite => &self.sprite,
        }
    }

    /// Every group, css first, then js, then sprite.
    pub fn groups(&self, force_debug: bool) -> Result<Vec<AssetGroup>, ConfigError> {
        self.validate()?;
        let debug = self.debug || force_debug;

        let mut groups = Vec::new();
        for namespace in Namespace::ALL {
            for (i, config) in self.groups_of(namespace).iter().enumerate() {
                let group = config.to_group(namespace, debug).map_err(|e| {
                    let mut diag = ConfigDiagnostics::new();
                    let field = FieldPath::new(namespace.as_str()).index(i).join("directories");
                    diag.error(field, format!("invalid regex: {e}"));
                    ConfigError::Diagnostics(diag)
                })?;
                groups.push(group);
            }
        }
        Ok(groups)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.io.attempts, Duration::from_millis(self.io.backoff_ms))
    }

    pub fn resolver(&self) -> PathResolver {
        PathResolver::new(&self.root, &self.url_prefix)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}

/// Find the config file by searching upward from `start`.
///
/// ```text
/// /home/user/app/assets/css/   ← start
/// /home/user/app/sheaf.toml    ← found
/// ```
pub fn find_config_file(start: &Path, name: &Path) -> Option<PathBuf> {
    if name.is_absolute() {
        return name.is_file().then(|| name.to_path_buf());
    }
    start
        .ancestors()
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
url_prefix = "/static"
deadline_secs = 30

[io]
attempts = 3
backoff_ms = 10

[[css]]
name = "main"
output = "public/main.css"
append_hash = true
files = ["css/a.css", { path = "css/b.css", minify = false }]
directories = [{ path = "css/lib", recurse = true, include = '\.css$' }]

[[js]]
name = "app"
output = "public/app.js"
files = ["js/app.js"]
wrap = { header = "(function () {", footer = "})();" }
"#;

    #[test]
    fn test_parse_sample() {
        let config = SAMPLE.parse::<BundleConfig>().unwrap();
        assert_eq!(config.url_prefix, "/static");
        assert_eq!(config.retry_policy(), RetryPolicy::new(3, Duration::from_millis(10)));
        assert_eq!(config.deadline(), Some(Duration::from_secs(30)));
        assert_eq!(config.css[0].files.len(), 2);
        assert!(config.sprite.is_empty());

        let groups = config.groups(false).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].namespace, Namespace::Css);
        assert!(groups[0].options.append_hash);
        assert_eq!(groups[1].options.wrap.as_ref().unwrap().footer, "})();");
    }

    #[test]
    fn test_defaults() {
        let config = "".parse::<BundleConfig>().unwrap();
        assert_eq!(config.root, PathBuf::from("."));
        assert_eq!(config.url_prefix, "/");
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_fields_collected() {
        let content = "bogus = 1\n[[css]]\nname = \"a\"\noutput = \"a.css\"\nfiles = [\"a\"]\ncolour = \"red\"";
        let (_, ignored) = BundleConfig::parse_with_ignored(content).unwrap();
        assert!(ignored.iter().any(|f| f.contains("bogus")));
        assert!(ignored.iter().any(|f| f.contains("colour")));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let config = "[io]\nattempts = 0".parse::<BundleConfig>().unwrap();
        let Err(ConfigError::Diagnostics(diag)) = config.validate() else {
            panic!("expected diagnostics");
        };
        assert_eq!(diag.errors()[0].field.as_str(), "io.attempts");
    }

    #[test]
    fn test_load_anchors_root_at_config_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "root = \"site\"").unwrap();

        let config = BundleConfig::load(&path).unwrap();
        assert_eq!(config.root, dir.path().join("site"));
        assert_eq!(config.config_path, path);

        assert!(matches!(
            BundleConfig::load(&dir.path().join("missing.toml")),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_find_config_file_walks_up() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b/c");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "").unwrap();

        assert_eq!(
            find_config_file(&nested, Path::new(CONFIG_FILE)),
            Some(dir.path().join(CONFIG_FILE))
        );
        assert_eq!(find_config_file(&nested, Path::new("nope.toml")), None);
    }
}
