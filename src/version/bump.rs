//! Next-version computation.

use serde::{Deserialize, Serialize};

use super::format::VersionNumber;
use crate::error::{Result, StellarError};

/// How the next version is derived from the current one.
///
/// `Minor` increments the first component and resets the second
/// (`1.4` -> `2.0`); `Patch` increments the second (`1.4` -> `1.5`).
/// Published version histories already follow these names, so they stay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BumpType {
    Minor,
    Patch,
}

impl std::fmt::Display for BumpType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BumpType::Minor => write!(f, "minor"),
            BumpType::Patch => write!(f, "patch"),
        }
    }
}

impl BumpType {
    /// Apply this bump to a parsed version.
    pub fn apply(self, current: VersionNumber) -> Option<VersionNumber> {
        match self {
            BumpType::Minor => Some(VersionNumber {
                major: current.major.checked_add(1)?,
                minor: 0,
            }),
            BumpType::Patch => Some(VersionNumber {
                major: current.major,
                minor: current.minor.checked_add(1)?,
            }),
        }
    }
}

/// Compute the version that follows `current` under `bump`.
///
/// `current` must already be a normalized `major.minor` string; anything
/// else is reported as [`StellarError::InvalidVersion`].
pub fn compute_next_version(current: &str, bump: BumpType) -> Result<String> {
    let parsed = VersionNumber::parse(current)?;
    bump.apply(parsed)
        .map(|next| next.to_string())
        .ok_or_else(|| StellarError::InvalidVersion(current.to_string()))
}
