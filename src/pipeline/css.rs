//! CSS `url()` rewriting.
//!
//! | Reference            | Result                               |
//! |----------------------|--------------------------------------|
//! | `img/x.png`          | `/prefix/css/img/x.png[?v=<hash>]`   |
//! | `/img/x.png`         | preserved                            |
//! | `//cdn/x.png`        | preserved                            |
//! | `https://…`, `data:` | preserved                            |
//! | `#filter`            | preserved                            |

use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::asset::PathResolver;
use crate::core::{Cancellation, GroupOptions, ResolvedFile};
use crate::file::RetryPolicy;
use crate::freshness::hash_file;

use super::{Transform, TransformContext};

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(\s*(['"]?)([^'")]+?)(['"]?)\s*\)"#).expect("valid url() pattern")
});

/// Rewrites relative `url()` references to root-relative (optionally
/// versioned) URLs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UrlRewriter;

impl Transform for UrlRewriter {
    fn name(&self) -> &str {
        "css-urls"
    }

    fn applies(&self, file: &ResolvedFile) -> bool {
        file.extension() == "css"
    }

    fn process(&self, ctx: &mut TransformContext<'_>) -> anyhow::Result<()> {
        let rewritten = rewrite_urls(
            ctx.text()?,
            &ctx.file.path,
            ctx.resolver,
            ctx.options,
            &ctx.policy,
            ctx.cancel,
        )?;
        ctx.set_text(rewritten);
        Ok(())
    }
}

/// Rewrite every relative `url()` in `css`, resolving against `from`.
pub fn rewrite_urls(
    css: &str,
    from: &Path,
    resolver: &PathResolver,
    options: &GroupOptions,
    policy: &RetryPolicy,
    cancel: &Cancellation,
) -> anyhow::Result<String> {
    let mut out = String::with_capacity(css.len());
    let mut last = 0;

    for caps in URL_RE.captures_iter(css) {
        let (Some(whole), Some(reference)) = (caps.get(0), caps.get(2)) else {
            continue;
        };
        let Some(url) = rewrite_one(reference.as_str(), from, resolver, options, policy, cancel)?
        else {
            continue;
        };

        out.push_str(&css[last..whole.start()]);
        out.push_str("url(");
        out.push_str(quote(&caps, 1));
        out.push_str(&url);
        out.push_str(quote(&caps, 3));
        out.push(')');
        last = whole.end();
    }

    out.push_str(&css[last..]);
    Ok(out)
}

fn quote<'c>(caps: &'c Captures<'_>, group: usize) -> &'c str {
    caps.get(group).map_or("", |m| m.as_str())
}

/// `None` when the reference is left untouched.
fn rewrite_one(
    reference: &str,
    from: &Path,
    resolver: &PathResolver,
    options: &GroupOptions,
    policy: &RetryPolicy,
    cancel: &Cancellation,
) -> anyhow::Result<Option<String>> {
    let reference = reference.trim();
    if !is_relative(reference) {
        return Ok(None);
    }

    let (path_part, query, fragment) = split_reference(reference);
    let physical = resolver.resolve_relative(path_part, from);
    let Some(mut url) = resolver.url_for(&physical) else {
        crate::debug!("css"; "{} escapes the root, left as-is", reference);
        return Ok(None);
    };

    let version = if options.append_hash {
        match hash_file(&physical, policy, cancel) {
            Ok(hash) => Some(hash.version()),
            Err(crate::file::FileError::Interrupted { reason, .. }) => return Err(reason.into()),
            Err(e) => {
                crate::log!("css"; "unversioned reference in {}: {}", from.display(), e);
                None
            }
        }
    } else {
        None
    };

    match (query, version) {
        (Some(q), Some(v)) => url = format!("{url}?{q}&v={v}"),
        (Some(q), None) => url = format!("{url}?{q}"),
        (None, Some(v)) => url = format!("{url}?v={v}"),
        (None, None) => {}
    }
    if let Some(frag) = fragment {
        url.push('#');
        url.push_str(frag);
    }
    Ok(Some(url))
}

fn is_relative(reference: &str) -> bool {
    !(reference.is_empty()
        || reference.starts_with('/')
        || reference.starts_with('#')
        || has_scheme(reference))
}

/// `data:`, `https:` and friends.
fn has_scheme(reference: &str) -> bool {
    reference.split_once(':').is_some_and(|(scheme, _)| {
        !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

/// Split `path?query#fragment`.
fn split_reference(reference: &str) -> (&str, Option<&str>, Option<&str>) {
    let (rest, fragment) = match reference.split_once('#') {
        Some((rest, frag)) => (rest, Some(frag)),
        None => (reference, None),
    };
    match rest.split_once('?') {
        Some((path, query)) => (path, Some(query), fragment),
        None => (rest, None, fragment),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::freshness::hash_bytes;
    use std::fs;
    use tempfile::TempDir;

    fn rewrite(root: &Path, css: &str, append_hash: bool) -> String {
        let resolver = PathResolver::new(root, "/static");
        let options = GroupOptions {
            append_hash,
            wrap: None,
        };
        rewrite_urls(
            css,
            &root.join("css/site.css"),
            &resolver,
            &options,
            &RetryPolicy::once(),
            &Cancellation::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_relative_reference_is_rooted() {
        let dir = TempDir::new().unwrap();
        let out = rewrite(dir.path(), "a { background: url('img/x.png') }", false);
        assert_eq!(out, "a { background: url('/static/css/img/x.png') }");

        let out = rewrite(dir.path(), "a { background: url( ../img/x.png ) }", false);
        assert_eq!(out, "a { background: url(/static/img/x.png) }");
    }

    #[test]
    fn test_hash_appended_from_asset_bytes() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("css/img")).unwrap();
        fs::write(dir.path().join("css/img/x.png"), b"png-bytes").unwrap();

        let out = rewrite(dir.path(), r#"a { background: url("img/x.png#icon") }"#, true);
        let v = hash_bytes(b"png-bytes").version();
        assert_eq!(
            out,
            format!(r#"a {{ background: url("/static/css/img/x.png?v={v}#icon") }}"#)
        );
    }

    #[test]
    fn test_missing_asset_stays_unversioned() {
        let dir = TempDir::new().unwrap();
        let out = rewrite(dir.path(), "a{b:url(gone.png?x=1)}", true);
        assert_eq!(out, "a{b:url(/static/css/gone.png?x=1)}");
    }

    #[test]
    fn test_non_relative_references_preserved() {
        let dir = TempDir::new().unwrap();
        let css = "a{b:url(/abs.png)} c{d:url(//cdn.example/x.png)} \
                   e{f:url(https://x.org/y.png)} g{h:url(data:image/png;base64,AAAA)} \
                   i{j:url(#clip)}";
        assert_eq!(rewrite(dir.path(), css, true), css);
    }

    #[test]
    fn test_split_reference() {
        assert_eq!(split_reference("a.png?x#y"), ("a.png", Some("x"), Some("y")));
        assert_eq!(split_reference("a.png"), ("a.png", None, None));
        assert!(has_scheme("data:image/png"));
        assert!(!has_scheme("img/a:b.png"));
    }
}
