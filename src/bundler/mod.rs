//! Group orchestration: resolve → transform → write → hash → cache.
//!
//! # Flow
//!
//! ```text
//! process_groups(groups)
//!   │  rayon fan-out, one unit per group; collect() is the completion barrier
//!   ▼
//! process_group ── cache hit ──────────────────────────────→ GroupOutput
//!   │ miss (per-key lock, then re-check)
//!   ▼
//! resolve_files → Pipeline::run → write_atomic → hash_file → cache.insert
//! ```
//!
//! Group failures stay local to their group and land in the report.
//! Build-fatal errors (configuration, pool misuse) cancel the remaining groups
//! and fail the whole call.

mod render;
mod state;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::asset::{FileEnumerator, PathResolver, WalkEnumerator, resolve_files, watch_hints};
use crate::cache::{CacheEntry, CacheStore, Dependency, FileStamp, MemoryCache};
use crate::config::BundleConfig;
use crate::core::{AssetGroup, CacheKey, Cancellation, GroupOutput, Namespace};
use crate::error::BundleError;
use crate::file::{self, RetryPolicy};
use crate::freshness::hash_file;
use crate::pipeline::{GroupEnv, Pipeline};
use crate::{debug, log};

pub use render::{render_markup, versioned_url};
pub use state::GroupState;

// =============================================================================
// Report
// =============================================================================

/// A group that failed without aborting the build.
#[derive(Debug)]
pub struct GroupFailure {
    pub key: CacheKey,
    pub name: String,
    pub error: BundleError,
}

/// Outcome of one `process_groups` call.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub outputs: BTreeMap<CacheKey, GroupOutput>,
    pub failures: Vec<GroupFailure>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn output(&self, key: &CacheKey) -> Option<&GroupOutput> {
        self.outputs.get(key)
    }
}

// =============================================================================
// Bundler
// =============================================================================

/// Orchestrates group processing against one application root.
pub struct Bundler {
    groups: Vec<AssetGroup>,
    resolver: PathResolver,
    cache: Arc<dyn CacheStore>,
    enumerator: Arc<dyn FileEnumerator>,
    pipelines: FxHashMap<Namespace, Arc<Pipeline>>,
    policy: RetryPolicy,
    deadline: Option<Duration>,
    states: DashMap<CacheKey, GroupState>,
    /// Serializes regeneration of one key.
    locks: DashMap<CacheKey, Arc<Mutex<()>>>,
}

impl Bundler {
    /// Bundler with an in-memory cache, the filesystem enumerator and the
    /// default pipeline per namespace.
    pub fn new(resolver: PathResolver) -> Self {
        let policy = RetryPolicy::default();
        Self {
            groups: Vec::new(),
            resolver,
            cache: Arc::new(MemoryCache::new(policy)),
            enumerator: Arc::new(WalkEnumerator),
            pipelines: Namespace::ALL
                .into_iter()
                .map(|ns| (ns, Arc::new(Pipeline::for_namespace(ns))))
                .collect(),
            policy,
            deadline: None,
            states: DashMap::new(),
            locks: DashMap::new(),
        }
    }

    /// Bundler for every group in `config`.
    pub fn from_config(config: &BundleConfig, force_debug: bool) -> Result<Self, BundleError> {
        let policy = config.retry_policy();
        let mut bundler = Self::new(config.resolver())
            .with_groups(config.groups(force_debug)?)
            .with_retry(policy)
            .with_cache(Arc::new(MemoryCache::new(policy)));
        bundler.deadline = config.deadline();
        Ok(bundler)
    }

    /// Register groups for [`Bundler::render`] and [`Bundler::process_all`].
    pub fn with_groups(mut self, groups: Vec<AssetGroup>) -> Self {
        self.groups = groups;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_enumerator(mut self, enumerator: Arc<dyn FileEnumerator>) -> Self {
        self.enumerator = enumerator;
        self
    }

    /// Replace the pipeline for one namespace.
    pub fn with_pipeline(mut self, namespace: Namespace, pipeline: Pipeline) -> Self {
        self.pipelines.insert(namespace, Arc::new(pipeline));
        self
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Bound every build started by this bundler.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn groups(&self) -> &[AssetGroup] {
        &self.groups
    }

    pub fn group(&self, namespace: Namespace, name: &str) -> Option<&AssetGroup> {
        self.groups
            .iter()
            .find(|g| g.namespace == namespace && g.name == name)
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Last observed state of a group.
    pub fn state(&self, key: &CacheKey) -> Option<GroupState> {
        self.states.get(key).map(|s| *s)
    }

    // -------------------------------------------------------------------------
    // Processing
    // -------------------------------------------------------------------------

    /// Process every registered group.
    pub fn process_all(&self) -> Result<BuildReport, BundleError> {
        self.process_groups(&self.groups)
    }

    /// Process `groups` concurrently.
    pub fn process_groups(&self, groups: &[AssetGroup]) -> Result<BuildReport, BundleError> {
        self.process_groups_with(groups, &Cancellation::new())
    }

    /// Process `groups` concurrently under `cancel`.
    ///
    /// No ordering holds across groups. Returns `Err` only for build-fatal
    /// errors; every other failure is recorded in the report.
    pub fn process_groups_with(
        &self,
        groups: &[AssetGroup],
        cancel: &Cancellation,
    ) -> Result<BuildReport, BundleError> {
        let build = self.build_token(cancel);

        let results: Vec<_> = groups
            .par_iter()
            .map(|group| {
                let result = self.process_group(group, &build);
                if let Err(e) = &result
                    && e.is_build_fatal()
                {
                    log!("error"; "aborting build: {}", e);
                    build.cancel();
                }
                (group, result)
            })
            .collect();

        let mut report = BuildReport::default();
        let mut fatal = None;
        for (group, result) in results {
            match result {
                Ok(output) => {
                    report.outputs.insert(output.key.clone(), output);
                }
                Err(e) if e.is_build_fatal() => {
                    if fatal.is_none() {
                        fatal = Some(e);
                    }
                }
                Err(error) => report.failures.push(GroupFailure {
                    key: group.key(),
                    name: group.name.clone(),
                    error,
                }),
            }
        }

        match fatal {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    /// Markup for a registered group, processing it on a cache miss.
    pub fn render(&self, namespace: Namespace, name: &str) -> Result<String, BundleError> {
        let group = self.group(namespace, name).ok_or_else(|| {
            BundleError::Configuration(format!("unknown {namespace} group `{name}`"))
        })?;
        let cancel = self.build_token(&Cancellation::new());
        Ok(self.process_group(group, &cancel)?.markup)
    }

    /// Resolve `group` and run its reference guards without writing output.
    ///
    /// Returns the number of files the group would bundle, references included.
    pub fn check_group(&self, group: &AssetGroup) -> Result<usize, BundleError> {
        let cancel = self.build_token(&Cancellation::new());
        let files = resolve_files(group, &self.resolver, self.enumerator.as_ref())?;
        let env = self.env(group, &cancel);
        let references = self.pipeline(group.namespace).check(&files, env)?;
        Ok(files.len() + references.len())
    }

    /// Drop the cached reference for `key`.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let removed = self.cache.remove(key);
        if removed {
            self.transition(key, GroupState::Pending);
        }
        removed
    }

    /// Drop every cached reference depending on `path` (root-relative or
    /// absolute).
    pub fn invalidate_path(&self, path: &Path) -> usize {
        let physical = self.resolver.physical(path);
        let removed = self.cache.remove_dependents(&physical);
        if removed > 0 {
            debug!("cache"; "{} invalidated {} entr(ies)", physical.display(), removed);
        }
        removed
    }

    // -------------------------------------------------------------------------
    // Per group
    // -------------------------------------------------------------------------

    fn process_group(&self, group: &AssetGroup, cancel: &Cancellation) -> Result<GroupOutput, BundleError> {
        let key = group.key();
        self.transition(&key, GroupState::Pending);
        if let Some(output) = self.cached(&key) {
            return Ok(output);
        }

        // A worker that loses the race finds the winner's entry here
        let lock = Arc::clone(&self.locks.entry(key.clone()).or_default());
        let _guard = lock.lock();
        if let Some(output) = self.cached(&key) {
            return Ok(output);
        }
        debug!("cache"; "miss {}", key);

        match self.build(group, &key, cancel) {
            Ok(output) => {
                self.transition(&key, GroupState::Cached);
                Ok(output)
            }
            Err(e) => {
                self.transition(&key, GroupState::Failed);
                log!("failed"; "{} group `{}`: {}", group.namespace, group.name, e);
                Err(e)
            }
        }
    }

    fn build(&self, group: &AssetGroup, key: &CacheKey, cancel: &Cancellation) -> Result<GroupOutput, BundleError> {
        cancel.check()?;
        self.transition(key, GroupState::Resolving);
        let files = resolve_files(group, &self.resolver, self.enumerator.as_ref())?;
        let files_watched: Vec<PathBuf> = files.iter().map(|f| f.path.clone()).collect();
        let watch_dirs = watch_hints(group, &self.resolver);

        // Stamped before reading so an edit made mid-build leaves the entry stale
        let mut stamps = files
            .iter()
            .map(|f| FileStamp::capture(&f.path, &self.policy, cancel))
            .collect::<Result<Vec<_>, _>>()?;

        if group.debug {
            let urls = files
                .iter()
                .map(|f| self.url_of(&f.path))
                .collect::<Result<Vec<_>, _>>()?;
            let output = GroupOutput {
                key: key.clone(),
                markup: render_markup(group.namespace, &urls),
                urls,
                files_watched,
                watch_dirs,
                hash: None,
            };
            self.cache.insert(CacheEntry::new(output.clone(), Dependency::new(stamps)));
            return Ok(output);
        }

        let output_path = self.resolver.physical(&group.output);
        let url = self.url_of(&output_path)?;

        self.transition(key, GroupState::Transforming);
        let bundled = self
            .pipeline(group.namespace)
            .run(&files, self.env(group, cancel))?;
        stamps.extend(bundled.references);

        self.transition(key, GroupState::Writing);
        file::write_atomic(&output_path, &bundled.content, &self.policy, cancel)?;

        self.transition(key, GroupState::Hashing);
        let hash = hash_file(&output_path, &self.policy, cancel)?;
        stamps.push(FileStamp::new(output_path, hash));

        let versioned = versioned_url(&url, &hash.version());
        log!("bundle"; "{} `{}` -> {}", group.namespace, group.name, versioned);

        let output = GroupOutput {
            key: key.clone(),
            markup: render_markup(group.namespace, std::slice::from_ref(&versioned)),
            urls: vec![versioned],
            files_watched,
            watch_dirs,
            hash: Some(hash),
        };
        self.cache.insert(CacheEntry::new(output.clone(), Dependency::new(stamps)));
        Ok(output)
    }

    fn cached(&self, key: &CacheKey) -> Option<GroupOutput> {
        let entry = self.cache.get(key)?;
        debug!("cache"; "hit {}", key);
        self.transition(key, GroupState::Cached);
        Some(entry.value.clone())
    }

    fn transition(&self, key: &CacheKey, state: GroupState) {
        debug!("bundle"; "{} {}", key, state);
        self.states.insert(key.clone(), state);
    }

    fn build_token(&self, parent: &Cancellation) -> Cancellation {
        match self.deadline {
            Some(timeout) => parent.child_with_timeout(timeout),
            None => parent.child(),
        }
    }

    fn env<'a>(&'a self, group: &'a AssetGroup, cancel: &'a Cancellation) -> GroupEnv<'a> {
        GroupEnv {
            group,
            resolver: &self.resolver,
            policy: self.policy,
            cancel,
        }
    }

    fn pipeline(&self, namespace: Namespace) -> Arc<Pipeline> {
        self.pipelines
            .get(&namespace)
            .cloned()
            .unwrap_or_else(|| Arc::new(Pipeline::for_namespace(namespace)))
    }

    fn url_of(&self, path: &Path) -> Result<String, BundleError> {
        self.resolver.url_for(path).ok_or_else(|| {
            BundleError::Configuration(format!(
                "`{}` is outside the application root `{}`",
                path.display(),
                self.resolver.root().display()
            ))
        })
    }
}

impl fmt::Debug for Bundler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bundler")
            .field("groups", &self.groups.len())
            .field("resolver", &self.resolver)
            .field("policy", &self.policy)
            .field("deadline", &self.deadline)
            .finish()
    }
}

// =============================================================================
// tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GroupOptions, Interrupted};
    use crate::freshness::hash_bytes;
    use crate::pipeline::{CssImports, FnTransform};
    use crate::pool::PoolError;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const PNG: &[u8] = b"\x89PNG fake";

    fn write(root: &Path, rel: &str, body: &[u8]) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, body).unwrap();
        path
    }

    /// a.css references img/x.png; b.css is plain.
    fn site() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "css/a.css", b"a { background: url(img/x.png) }");
        write(dir.path(), "css/b.css", b"b{}");
        write(dir.path(), "css/img/x.png", PNG);
        dir
    }

    fn main_group() -> AssetGroup {
        AssetGroup::new(Namespace::Css, "main", "out/main.css")
            .file("css/a.css")
            .file("css/b.css")
            .with_options(GroupOptions {
                append_hash: true,
                wrap: None,
            })
    }

    /// Default css pipeline plus a transform counting its invocations.
    fn counted(root: &Path) -> (Bundler, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let pipeline = Pipeline::for_namespace(Namespace::Css).pipe(FnTransform::new(
            "count",
            &["css"],
            move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        ));
        let bundler = Bundler::new(PathResolver::new(root, "/"))
            .with_retry(RetryPolicy::once())
            .with_cache(Arc::new(MemoryCache::new(RetryPolicy::once())))
            .with_pipeline(Namespace::Css, pipeline);
        (bundler, count)
    }

    #[test]
    fn test_end_to_end_bundle() {
        let dir = site();
        let (bundler, _) = counted(dir.path());
        let group = main_group();

        let report = bundler.process_groups(std::slice::from_ref(&group)).unwrap();
        assert!(report.is_success());
        let output = report.output(&group.key()).unwrap();

        let written = fs::read(dir.path().join("out/main.css")).unwrap();
        let expected = format!(
            "a {{ background: url(/css/img/x.png?v={}) }}\nb{{}}",
            hash_bytes(PNG).version()
        );
        assert_eq!(String::from_utf8(written.clone()).unwrap(), expected);

        let hash = hash_bytes(&written);
        assert_eq!(output.hash, Some(hash));
        assert_eq!(output.urls, [format!("/out/main.css?v={}", hash.version())]);
        assert!(output.markup.contains(&format!("href=\"/out/main.css?v={}\"", hash.version())));
        assert_eq!(
            output.files_watched,
            [dir.path().join("css/a.css"), dir.path().join("css/b.css")]
        );
        assert_eq!(bundler.state(&group.key()), Some(GroupState::Cached));
    }

    #[test]
    fn test_cache_hit_skips_transforms() {
        let dir = site();
        let (bundler, count) = counted(dir.path());
        let group = main_group();

        let first = bundler.process_groups(std::slice::from_ref(&group)).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);

        let second = bundler.process_groups(std::slice::from_ref(&group)).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(first.outputs, second.outputs);
    }

    #[test]
    fn test_one_byte_change_invalidates() {
        let dir = site();
        let (bundler, count) = counted(dir.path());
        let group = main_group();

        let before = bundler.process_groups(std::slice::from_ref(&group)).unwrap();
        write(dir.path(), "css/b.css", b"c{}");
        let after = bundler.process_groups(std::slice::from_ref(&group)).unwrap();

        let key = group.key();
        assert_ne!(before.output(&key).unwrap().hash, after.output(&key).unwrap().hash);
        assert_eq!(count.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_imported_file_change_invalidates() {
        let dir = site();
        write(dir.path(), "css/b.css", b"@import 'parts/c.css';");
        write(dir.path(), "css/parts/c.css", b"c{}");
        let (bundler, count) = counted(dir.path());
        let group = main_group();

        bundler.process_groups(std::slice::from_ref(&group)).unwrap();
        write(dir.path(), "css/parts/c.css", b"d{}");
        let report = bundler.process_groups(std::slice::from_ref(&group)).unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 4);
        let written = fs::read_to_string(dir.path().join("out/main.css")).unwrap();
        assert!(written.ends_with("d{}"));
        assert!(report.is_success());
    }

    #[test]
    fn test_import_edited_mid_build_rebuilds_next_time() {
        let dir = site();
        write(dir.path(), "css/b.css", b"@import 'parts/c.css';");
        let imported = write(dir.path(), "css/parts/c.css", b"c{}");

        // Edits the import after the cycle guard read it, before inlining
        let runs = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&runs);
        let edit = FnTransform::new("edit", &["css"], move |ctx| {
            if ctx.file.path.ends_with("b.css") && seen.fetch_add(1, Ordering::SeqCst) == 0 {
                fs::write(&imported, "d{}")?;
            }
            Ok(())
        });
        let imports = Arc::new(CssImports::new());
        let pipeline = Pipeline::new()
            .guard_shared(imports.clone())
            .pipe(edit)
            .pipe_shared(imports);
        let bundler = Bundler::new(PathResolver::new(dir.path(), "/"))
            .with_retry(RetryPolicy::once())
            .with_cache(Arc::new(MemoryCache::new(RetryPolicy::once())))
            .with_pipeline(Namespace::Css, pipeline);
        let group = main_group();

        bundler.process_groups(std::slice::from_ref(&group)).unwrap();
        bundler.process_groups(std::slice::from_ref(&group)).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        bundler.process_groups(std::slice::from_ref(&group)).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_debug_mode_references_sources() {
        let dir = site();
        let (bundler, count) = counted(dir.path());
        let group = main_group().with_debug(true);

        let report = bundler.process_groups(std::slice::from_ref(&group)).unwrap();
        let output = report.output(&group.key()).unwrap();

        assert_eq!(output.urls, ["/css/a.css", "/css/b.css"]);
        assert_eq!(output.hash, None);
        assert_eq!(output.markup.lines().count(), 2);
        assert!(!dir.path().join("out/main.css").exists());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failures_stay_local() {
        let dir = site();
        write(dir.path(), "js/app.js", b"app()");
        let (bundler, _) = counted(dir.path());
        let bundler = bundler.with_pipeline(
            Namespace::Js,
            Pipeline::new().pipe(FnTransform::new("compile", &["js"], |_| {
                anyhow::bail!("unexpected token")
            })),
        );

        let ok = main_group();
        let missing = AssetGroup::new(Namespace::Css, "broken", "out/broken.css").file("css/nope.css");
        let failing = AssetGroup::new(Namespace::Js, "app", "out/app.js").file("js/app.js");

        let report = bundler
            .process_groups(&[ok.clone(), missing.clone(), failing.clone()])
            .unwrap();

        assert!(report.output(&ok.key()).is_some());
        assert_eq!(report.failures.len(), 2);
        for failure in &report.failures {
            match &failure.error {
                BundleError::MissingSource(path) => {
                    assert_eq!(failure.name, "broken");
                    assert!(path.ends_with("css/nope.css"));
                }
                BundleError::Transform(e) => {
                    assert_eq!(failure.name, "app");
                    assert_eq!(e.transform, "compile");
                    assert!(e.path.ends_with("js/app.js"));
                }
                other => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(bundler.state(&missing.key()), Some(GroupState::Failed));
        assert!(!dir.path().join("out/app.js").exists());
    }

    #[test]
    fn test_cycle_fails_group_with_member_files() {
        let dir = site();
        let a = write(dir.path(), "css/loop/a.css", b"@import 'b.css';");
        let b = write(dir.path(), "css/loop/b.css", b"@import 'a.css';");
        let (bundler, count) = counted(dir.path());

        let group = AssetGroup::new(Namespace::Css, "loop", "out/loop.css").file("css/loop/a.css");
        let report = bundler.process_groups(std::slice::from_ref(&group)).unwrap();

        let BundleError::CycleDetected(cycle) = &report.failures[0].error else {
            panic!("expected a cycle error");
        };
        let files: Vec<_> = cycle.files().collect();
        assert!(files.contains(&a.as_path()));
        assert!(files.contains(&b.as_path()));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_pool_misuse_aborts_build() {
        let dir = site();
        let bundler = Bundler::new(PathResolver::new(dir.path(), "/"))
            .with_retry(RetryPolicy::once())
            .with_pipeline(
                Namespace::Css,
                Pipeline::new().pipe(FnTransform::new("engine", &["css"], |_| {
                    Err(PoolError::Disposed.into())
                })),
            );

        let err = bundler.process_groups(&[main_group()]).unwrap_err();
        assert!(matches!(err, BundleError::Pool(PoolError::Disposed)));
    }

    #[test]
    fn test_cancelled_build_interrupts_groups() {
        let dir = site();
        let (bundler, _) = counted(dir.path());
        let cancel = Cancellation::new();
        cancel.cancel();

        let report = bundler.process_groups_with(&[main_group()], &cancel).unwrap();
        assert!(matches!(
            report.failures[0].error,
            BundleError::Interrupted(Interrupted::Cancelled)
        ));
    }

    #[test]
    fn test_same_key_built_once_under_concurrency() {
        let dir = site();
        let (bundler, count) = counted(dir.path());
        let twin = AssetGroup {
            name: "twin".into(),
            ..main_group()
        };

        let report = bundler.process_groups(&[main_group(), twin]).unwrap();
        assert_eq!(report.outputs.len(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_render_by_name() {
        let dir = site();
        let (bundler, _) = counted(dir.path());
        let bundler = bundler.with_groups(vec![main_group()]);

        let markup = bundler.render(Namespace::Css, "main").unwrap();
        assert!(markup.starts_with("<link rel=\"stylesheet\""));

        let err = bundler.render(Namespace::Css, "missing").unwrap_err();
        assert!(matches!(err, BundleError::Configuration(_)));
        assert!(err.is_build_fatal());
        assert!(bundler.render(Namespace::Js, "main").is_err());
    }

    #[test]
    fn test_explicit_invalidation() {
        let dir = site();
        let (bundler, count) = counted(dir.path());
        let group = main_group();
        let key = group.key();

        bundler.process_groups(std::slice::from_ref(&group)).unwrap();
        assert!(bundler.invalidate(&key));
        assert!(!bundler.invalidate(&key));
        assert_eq!(bundler.state(&key), Some(GroupState::Pending));

        bundler.process_groups(std::slice::from_ref(&group)).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 4);

        assert_eq!(bundler.invalidate_path(Path::new("css/b.css")), 1);
        assert_eq!(bundler.invalidate_path(Path::new("css/unrelated.css")), 0);
    }

    #[test]
    fn test_check_group_counts_references() {
        let dir = site();
        write(dir.path(), "css/b.css", b"@import 'parts/c.css';");
        write(dir.path(), "css/parts/c.css", b"c{}");
        let (bundler, count) = counted(dir.path());

        assert_eq!(bundler.check_group(&main_group()).unwrap(), 3);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!dir.path().join("out/main.css").exists());
    }

    #[test]
    fn test_output_outside_root_is_configuration_error() {
        let dir = site();
        let (bundler, _) = counted(dir.path());
        let group = AssetGroup::new(Namespace::Css, "escape", "../escape.css").file("css/b.css");

        let err = bundler.process_groups(&[group]).unwrap_err();
        assert!(matches!(err, BundleError::Configuration(_)));
    }
}
