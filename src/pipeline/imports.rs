//! CSS `@import` inlining.
//!
//! Local imports are replaced by the imported file's content (wrapped in
//! `@media` when the import carries a media query). Remote and missing
//! imports are left in place. Relative `url()` references inside an imported
//! file are rebased after its own imports are inlined and before splicing.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::asset::PathResolver;
use crate::core::ResolvedFile;
use crate::file;

use super::css::rewrite_urls;
use super::{References, Transform, TransformContext};

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@import\s+(?:url\(\s*)?['"]?([^'")\s;]+)['"]?\s*\)?\s*([^;]*);"#)
        .expect("valid @import pattern")
});

/// Inlines local `@import` statements.
///
/// Also acts as the cycle guard's reference scanner, so the import graph is
/// rejected before any file is inlined.
#[derive(Debug, Default, Clone, Copy)]
pub struct CssImports;

impl CssImports {
    pub fn new() -> Self {
        Self
    }

    /// Local file an import target points at, if it exists.
    fn target(reference: &str, from: &Path, resolver: &PathResolver) -> Option<PathBuf> {
        if reference.starts_with("//") || reference.contains("://") || reference.starts_with("data:") {
            return None;
        }
        let path = if reference.starts_with('/') {
            let rel = reference.strip_prefix(resolver.root_uri()).unwrap_or(reference);
            resolver.physical(Path::new(rel.trim_start_matches('/')))
        } else {
            resolver.resolve_relative(reference, from)
        };
        path.is_file().then_some(path)
    }

    fn inline(
        &self,
        css: &str,
        from: &Path,
        ctx: &TransformContext<'_>,
        stack: &mut Vec<PathBuf>,
    ) -> anyhow::Result<String> {
        let mut out = String::with_capacity(css.len());
        let mut last = 0;

        for caps in IMPORT_RE.captures_iter(css) {
            let (Some(whole), Some(reference)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let Some(target) = Self::target(reference.as_str(), from, ctx.resolver) else {
                continue;
            };
            if stack.contains(&target) {
                anyhow::bail!("circular @import of `{}`", target.display());
            }

            ctx.cancel.check()?;
            let raw = file::read_to_string(&target, &ctx.policy, ctx.cancel)?;

            // Nested imports first: rebasing would version their url() targets
            stack.push(target.clone());
            let inlined = self.inline(&raw, &target, ctx, stack)?;
            stack.pop();
            let body = rewrite_urls(
                &inlined,
                &target,
                ctx.resolver,
                ctx.options,
                &ctx.policy,
                ctx.cancel,
            )?;

            out.push_str(&css[last..whole.start()]);
            let media = caps.get(2).map_or("", |m| m.as_str().trim());
            if media.is_empty() {
                out.push_str(&body);
            } else {
                out.push_str(&format!("@media {media} {{\n{body}\n}}"));
            }
            last = whole.end();
        }

        out.push_str(&css[last..]);
        Ok(out)
    }
}

impl Transform for CssImports {
    fn name(&self) -> &str {
        "css-imports"
    }

    fn applies(&self, file: &ResolvedFile) -> bool {
        file.extension() == "css"
    }

    fn process(&self, ctx: &mut TransformContext<'_>) -> anyhow::Result<()> {
        let mut stack = vec![ctx.file.path.clone()];
        let inlined = self.inline(ctx.text()?, &ctx.file.path, ctx, &mut stack)?;
        ctx.set_text(inlined);
        Ok(())
    }
}

impl References for CssImports {
    fn scans(&self, file: &ResolvedFile) -> bool {
        file.extension() == "css"
    }

    fn references(&self, path: &Path, content: &str, resolver: &PathResolver) -> Vec<PathBuf> {
        IMPORT_RE
            .captures_iter(content)
            .filter_map(|caps| caps.get(1))
            .filter_map(|m| Self::target(m.as_str(), path, resolver))
            .collect()
    }
}
