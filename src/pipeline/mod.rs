//! Per-file transform chain and group-level post-processing.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ guard      reference graph → find_cycles() → CycleError  │
//! │ per file   read → Transform₁ → … → Transformₙ (rayon)    │
//! │ combine    concatenate in bundle order + separator       │
//! │ post       PostProcess₁ → … → PostProcessₘ               │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! A transform that does not apply to a file is skipped. Any failure is
//! wrapped with the file path and the transform name; nothing is dropped.

mod css;
mod imports;
mod plugin;
mod pooled;
mod wrap;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::asset::PathResolver;
use crate::cache::FileStamp;
use crate::core::{AssetGroup, Cancellation, GroupOptions, Interrupted, Namespace, ResolvedFile};
use crate::error::BundleError;
use crate::file::{self, RetryPolicy};
use crate::freshness::{ContentHash, hash_bytes};
use crate::graph::Graph;
use crate::pool::PoolError;

pub use css::{UrlRewriter, rewrite_urls};
pub use imports::CssImports;
pub use plugin::FnTransform;
pub use pooled::{Engine, PooledTransform};
pub use wrap::ModuleWrapper;

// =============================================================================
// Errors
// =============================================================================

/// A plugin failed on a specific file.
#[derive(Debug, Error)]
#[error("transform `{transform}` failed on `{path}`")]
pub struct TransformError {
    pub path: PathBuf,
    pub transform: String,
    #[source]
    pub source: anyhow::Error,
}

/// Circular references among assets.
#[derive(Debug, Error)]
pub struct CycleError {
    /// Member files of each cycle, in detection order.
    pub cycles: Vec<Vec<PathBuf>>,
}

impl CycleError {
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.cycles.iter().flatten().map(PathBuf::as_path)
    }
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "circular reference among assets")?;
        for cycle in &self.cycles {
            let members: Vec<_> = cycle.iter().map(|p| p.display().to_string()).collect();
            write!(f, "\n  [{}]", members.join(" -> "))?;
        }
        Ok(())
    }
}

// =============================================================================
// Capabilities
// =============================================================================

/// Per-group inputs shared by every step.
#[derive(Clone, Copy)]
pub struct GroupEnv<'a> {
    pub group: &'a AssetGroup,
    pub resolver: &'a PathResolver,
    pub policy: RetryPolicy,
    pub cancel: &'a Cancellation,
}

/// State threaded through the transform chain for one file.
pub struct TransformContext<'a> {
    /// URL prefix of the application root.
    pub root_uri: &'a str,
    pub file: &'a ResolvedFile,
    pub content: Vec<u8>,
    pub resolver: &'a PathResolver,
    pub options: &'a GroupOptions,
    pub policy: RetryPolicy,
    pub cancel: &'a Cancellation,
}

impl TransformContext<'_> {
    /// Content as UTF-8.
    pub fn text(&self) -> anyhow::Result<&str> {
        std::str::from_utf8(&self.content)
            .map_err(|e| anyhow::anyhow!("`{}` is not valid UTF-8: {}", self.file.path.display(), e))
    }

    pub fn set_text(&mut self, text: String) {
        self.content = text.into_bytes();
    }
}

/// A per-file content transform.
pub trait Transform: Send + Sync {
    fn name(&self) -> &str;

    fn applies(&self, file: &ResolvedFile) -> bool;

    fn process(&self, ctx: &mut TransformContext<'_>) -> anyhow::Result<()>;
}

/// A step over the combined buffer.
pub trait PostProcess: Send + Sync {
    fn name(&self) -> &str;

    fn process(&self, group: &AssetGroup, content: Vec<u8>) -> anyhow::Result<Vec<u8>>;
}

/// Combined output of one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundled {
    pub content: Vec<u8>,
    /// Files reached through references (imports) rather than listed
    /// directly, stamped as the guard read them.
    pub references: Vec<FileStamp>,
}

/// Discovers cross-file references that a transform would follow.
pub trait References: Send + Sync {
    fn scans(&self, file: &ResolvedFile) -> bool;

    /// Existing local files `content` (read from `path`) refers to.
    fn references(&self, path: &Path, content: &str, resolver: &PathResolver) -> Vec<PathBuf>;
}

// =============================================================================
// Pipeline
// =============================================================================

/// Ordered transforms plus post-processing for one namespace.
#[derive(Clone, Default)]
pub struct Pipeline {
    transforms: Vec<Arc<dyn Transform>>,
    post: Vec<Arc<dyn PostProcess>>,
    guards: Vec<Arc<dyn References>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default chain for a namespace.
    ///
    /// - css: `@import` inlining (cycle-guarded), `url()` rewriting, wrapping
    /// - js: wrapping
    /// - sprite: plain concatenation; packing is left to plugins
    pub fn for_namespace(namespace: Namespace) -> Self {
        match namespace {
            Namespace::Css => {
                let imports = Arc::new(CssImports::new());
                Self::new()
                    .guard_shared(imports.clone())
                    .pipe_shared(imports)
                    .pipe(UrlRewriter)
                    .post(ModuleWrapper)
            }
            Namespace::Js => Self::new().post(ModuleWrapper),
            Namespace::Sprite => Self::new(),
        }
    }

    pub fn pipe(self, transform: impl Transform + 'static) -> Self {
        self.pipe_shared(Arc::new(transform))
    }

    pub fn pipe_shared(mut self, transform: Arc<dyn Transform>) -> Self {
        self.transforms.push(transform);
        self
    }

    pub fn post(mut self, step: impl PostProcess + 'static) -> Self {
        self.post.push(Arc::new(step));
        self
    }

    /// Reject cyclic references found by `guard` before transforming.
    pub fn guard_shared(mut self, guard: Arc<dyn References>) -> Self {
        self.guards.push(guard);
        self
    }

    pub fn transform_names(&self) -> Vec<&str> {
        self.transforms.iter().map(|t| t.name()).collect()
    }

    /// Transform and combine `files` into one buffer.
    ///
    /// Files are transformed in parallel; the result keeps bundle order.
    pub fn run(&self, files: &[ResolvedFile], env: GroupEnv<'_>) -> Result<Bundled, BundleError> {
        let references = self.check(files, env)?;

        let parts = files
            .par_iter()
            .map(|file| self.run_file(file, env))
            .collect::<Result<Vec<_>, _>>()?;

        let separator = env.group.namespace.separator().as_bytes();
        let mut combined = Vec::with_capacity(parts.iter().map(Vec::len).sum());
        for (i, part) in parts.into_iter().enumerate() {
            if i > 0 {
                combined.extend_from_slice(separator);
            }
            combined.extend(part);
        }

        for step in &self.post {
            env.cancel.check()?;
            combined = step
                .process(env.group, combined)
                .map_err(|e| classify(e, &env.group.output, step.name()))?;
        }
        Ok(Bundled {
            content: combined,
            references,
        })
    }

    /// Read one file and run every applicable transform over it.
    pub fn run_file(&self, file: &ResolvedFile, env: GroupEnv<'_>) -> Result<Vec<u8>, BundleError> {
        env.cancel.check()?;
        let content = file::read_bytes(&file.path, &env.policy, env.cancel)?;

        let mut ctx = TransformContext {
            root_uri: env.resolver.root_uri(),
            file,
            content,
            resolver: env.resolver,
            options: &env.group.options,
            policy: env.policy,
            cancel: env.cancel,
        };

        for transform in self.transforms.iter().filter(|t| t.applies(file)) {
            env.cancel.check()?;
            transform
                .process(&mut ctx)
                .map_err(|e| classify(e, &file.path, transform.name()))?;
        }
        Ok(ctx.content)
    }

    /// Run the reference guards over `files` without transforming anything.
    ///
    /// Returns the referenced files that are not themselves in `files`,
    /// stamped with the content the guard read, before any transform does.
    pub fn check(&self, files: &[ResolvedFile], env: GroupEnv<'_>) -> Result<Vec<FileStamp>, BundleError> {
        let mut referenced: Vec<FileStamp> = Vec::new();
        for guard in &self.guards {
            let roots: Vec<PathBuf> = files
                .iter()
                .filter(|f| guard.scans(f))
                .map(|f| f.path.clone())
                .collect();
            if roots.is_empty() {
                continue;
            }

            let mut edges: FxHashMap<PathBuf, Vec<PathBuf>> = FxHashMap::default();
            let mut hashes: FxHashMap<PathBuf, ContentHash> = FxHashMap::default();
            let mut queue = roots.clone();
            while let Some(path) = queue.pop() {
                if edges.contains_key(&path) {
                    continue;
                }
                env.cancel.check()?;
                let text = file::read_to_string(&path, &env.policy, env.cancel)?;
                let refs = guard.references(&path, &text, env.resolver);
                queue.extend(refs.iter().cloned());
                hashes.insert(path.clone(), hash_bytes(text.as_bytes()));
                edges.insert(path, refs);
            }

            let graph = Graph::new(roots, |path| edges.get(path).cloned().unwrap_or_default());
            let cycles: Vec<Vec<PathBuf>> = graph.find_cycles().collect();
            if !cycles.is_empty() {
                return Err(CycleError { cycles }.into());
            }

            let direct: FxHashSet<&Path> = files.iter().map(|f| f.path.as_path()).collect();
            for path in graph.nodes() {
                if direct.contains(path.as_path()) || referenced.iter().any(|s| &s.path == path) {
                    continue;
                }
                if let Some(&hash) = hashes.get(path) {
                    referenced.push(FileStamp::new(path.clone(), hash));
                }
            }
        }
        Ok(referenced)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("transforms", &self.transform_names())
            .field("post", &self.post.iter().map(|p| p.name()).collect::<Vec<_>>())
            .finish()
    }
}

/// Map a plugin error to its bundle error.
///
/// Pool misuse and interruption keep their own kinds so the orchestrator can
/// tell them apart from a plugin failing on its input.
fn classify(err: anyhow::Error, path: &Path, transform: &str) -> BundleError {
    let err = match err.downcast::<PoolError>() {
        Ok(PoolError::Interrupted(reason)) => return BundleError::Interrupted(reason),
        Ok(e) if e.is_misuse() => return BundleError::Pool(e),
        Ok(e) => anyhow::Error::new(e),
        Err(e) => e,
    };
    let err = match err.downcast::<Interrupted>() {
        Ok(reason) => return BundleError::Interrupted(reason),
        Err(e) => e,
    };
    TransformError {
        path: path.to_path_buf(),
        transform: transform.to_string(),
        source: err,
    }
    .into()
}
