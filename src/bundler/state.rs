//! Per-group processing state.

use std::fmt;

/// ```text
/// Pending → Resolving → Transforming → Writing → Hashing → Cached
///                 ╲            ╲            ╲          ╲
///                  ────────────────────────────────────→ Failed
/// ```
///
/// Debug-mode groups go straight from `Resolving` to `Cached`; a cache hit
/// goes from `Pending` to `Cached`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupState {
    Pending,
    Resolving,
    Transforming,
    Writing,
    Hashing,
    Cached,
    Failed,
}

impl GroupState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cached | Self::Failed)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolving => "resolving",
            Self::Transforming => "transforming",
            Self::Writing => "writing",
            Self::Hashing => "hashing",
            Self::Cached => "cached",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for GroupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
