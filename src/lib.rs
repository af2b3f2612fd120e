//! sheaf - concurrent asset bundling with content-hash versioning.
//!
//! Groups of css/js/sprite sources are resolved, transformed, concatenated,
//! written atomically and versioned by content hash. Rendered reference
//! markup is cached until any source or output changes.
//!
//! # Module Structure
//!
//! ```text
//! core       groups, keys, cancellation
//! graph      cycle detection (Tarjan SCC)
//! pool       bounded engine pool
//! file       retrying I/O, atomic writes
//! freshness  content hashing
//! cache      cache store + dependencies
//! asset      path mapping, file resolution
//! pipeline   transforms, post-processing
//! bundler    orchestration
//! config     sheaf.toml
//! ```

pub mod logger;

pub mod asset;
pub mod bundler;
pub mod cache;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod file;
pub mod freshness;
pub mod graph;
pub mod pipeline;
pub mod pool;

pub use bundler::{BuildReport, Bundler, GroupState};
pub use error::BundleError;
