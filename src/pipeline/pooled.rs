//! Transforms backed by pooled engine instances.

use std::sync::Arc;

use crate::core::ResolvedFile;
use crate::pool::Pool;

use super::{Transform, TransformContext};

/// An expensive, reusable transform engine (a compiler context, a packer).
///
/// Instances are stateful and never shared between callers at the same time.
pub trait Engine: Send {
    fn transform(&mut self, file: &ResolvedFile, input: &[u8]) -> anyhow::Result<Vec<u8>>;
}

/// Runs each applicable file through an engine checked out of a [`Pool`].
///
/// The pool bounds how many engines exist and how many files are in flight;
/// acquisition honors the group's cancellation token.
pub struct PooledTransform<E> {
    name: String,
    extensions: Vec<String>,
    pool: Arc<Pool<E>>,
}

impl<E: Engine> PooledTransform<E> {
    pub fn new(name: impl Into<String>, extensions: &[&str], pool: Arc<Pool<E>>) -> Self {
        Self {
            name: name.into(),
            extensions: extensions.iter().map(|e| e.to_ascii_lowercase()).collect(),
            pool,
        }
    }

    pub fn pool(&self) -> &Pool<E> {
        &self.pool
    }
}

impl<E: Engine> Transform for PooledTransform<E> {
    fn name(&self) -> &str {
        &self.name
    }

    fn applies(&self, file: &ResolvedFile) -> bool {
        let ext = file.extension();
        self.extensions.iter().any(|e| *e == ext)
    }

    fn process(&self, ctx: &mut TransformContext<'_>) -> anyhow::Result<()> {
        let mut engine = self.pool.acquire(ctx.cancel)?;
        ctx.content = engine.transform(ctx.file, &ctx.content)?;
        Ok(())
    }
}
