//! Entity lifecycle states.

use std::fmt::{Display, Formatter};

/// Where one cached entity sits in its load/mutation lifecycle.
///
/// Legal edges:
/// - `Unloaded -> Loading -> Loaded`
/// - `Loaded -> Dirty` on local update, `Dirty -> Loaded` on commit or rollback
/// - `Loading | Loaded -> Error` on fetch failure, `Error -> Loading` on retry
/// - any state `-> Unloaded` on invalidation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityStatus {
    Unloaded,
    Loading,
    Loaded,
    Dirty,
    Error,
}

impl EntityStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unloaded => "unloaded",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::Dirty => "dirty",
            Self::Error => "error",
        }
    }

    /// Returns whether the entity holds a server-confirmed or pending value.
    pub fn has_value(self) -> bool {
        matches!(self, Self::Loaded | Self::Dirty)
    }
}

impl Display for EntityStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
