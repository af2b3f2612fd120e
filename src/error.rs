//! Top-level error type for bundling.
//!
//! Each layer has its own error enum; they all fold into [`BundleError`].

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::asset::ResolveError;
use crate::config::ConfigError;
use crate::core::Interrupted;
use crate::file::FileError;
use crate::pipeline::{CycleError, TransformError};
use crate::pool::PoolError;

#[derive(Debug, Error)]
pub enum BundleError {
    /// A referenced group does not exist.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("source file `{0}` not found")]
    MissingSource(PathBuf),

    #[error("failed to scan directory `{path}`")]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    CycleDetected(#[from] CycleError),

    #[error(transparent)]
    File(#[from] FileError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("build {0}")]
    Interrupted(#[from] Interrupted),
}

impl BundleError {
    /// Errors that abort the whole build rather than just their group.
    pub fn is_build_fatal(&self) -> bool {
        match self {
            Self::Configuration(_) | Self::Config(_) => true,
            Self::Pool(e) => e.is_misuse(),
            _ => false,
        }
    }
}

impl From<ResolveError> for BundleError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::MissingFile(path) => Self::MissingSource(path),
            ResolveError::Scan { path, source } => Self::Scan { path, source },
        }
    }
}
