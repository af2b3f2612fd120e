//! Closure-backed transforms keyed by file extension.

use std::fmt;

use crate::core::ResolvedFile;

use super::{Transform, TransformContext};

type Apply = Box<dyn Fn(&mut TransformContext<'_>) -> anyhow::Result<()> + Send + Sync>;

/// A `{predicate, apply}` pair: runs `apply` on files whose extension is
/// listed.
pub struct FnTransform {
    name: String,
    extensions: Vec<String>,
    apply: Apply,
}

impl FnTransform {
    /// Extensions are matched case-insensitively, without the dot.
    pub fn new<F>(name: impl Into<String>, extensions: &[&str], apply: F) -> Self
    where
        F: Fn(&mut TransformContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            extensions: extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            apply: Box::new(apply),
        }
    }

    /// Text-to-text plugin.
    pub fn text<F>(name: impl Into<String>, extensions: &[&str], map: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        Self::new(name, extensions, move |ctx| {
            let out = map(ctx.text()?)?;
            ctx.set_text(out);
            Ok(())
        })
    }
}

impl Transform for FnTransform {
    fn name(&self) -> &str {
        &self.name
    }

    fn applies(&self, file: &ResolvedFile) -> bool {
        let ext = file.extension();
        self.extensions.iter().any(|e| *e == ext)
    }

    fn process(&self, ctx: &mut TransformContext<'_>) -> anyhow::Result<()> {
        (self.apply)(ctx)
    }
}

impl fmt::Debug for FnTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTransform")
            .field("name", &self.name)
            .field("extensions", &self.extensions)
            .finish()
    }
}
