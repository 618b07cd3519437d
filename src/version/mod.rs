//! Theme version rules.
//!
//! Pure functions over version strings and histories; nothing here holds
//! state, so every item is safe to call from any thread.

mod bump;
mod format;
mod history;

pub use bump::{compute_next_version, BumpType};
pub use format::{normalize, validate_runtime_version_format, validate_version_format, VersionNumber};
pub use history::{
    is_duplicate_version, parse_dependencies, resolve_latest, ThemeVersion, VersionRef,
    VersionStamp,
};
