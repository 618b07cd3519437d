//! Version string normalization and format checks.
//!
//! Theme versions look like `major.minor` (`1.0`, `2.3`); minimum runtime
//! versions look like `major.minor.patch`. Only ASCII digits count.

use crate::error::{Result, StellarError};

/// Strip a single leading `v` or `V`.
///
/// Case and internal structure are left alone. Only one prefix is removed:
/// `normalize("vv1.0")` is `"v1.0"`, which then fails format validation.
pub fn normalize(version: &str) -> &str {
    version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .unwrap_or(version)
}

/// True iff `version` is exactly `digits.digits`.
pub fn validate_version_format(version: &str) -> bool {
    has_numeric_segments(version, 2)
}

/// True iff `version` is exactly `digits.digits.digits`.
pub fn validate_runtime_version_format(version: &str) -> bool {
    has_numeric_segments(version, 3)
}

fn has_numeric_segments(s: &str, expected: usize) -> bool {
    let mut segments = 0;
    for segment in s.split('.') {
        if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        segments += 1;
    }
    segments == expected
}

/// A parsed `major.minor` theme version, used for bump arithmetic.
///
/// Comparison between stored versions never goes through this type:
/// `1.0` and `1.00` parse to the same number but are distinct versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionNumber {
    pub major: u64,
    pub minor: u64,
}

impl VersionNumber {
    /// Parse a string that satisfies [`validate_version_format`].
    pub fn parse(version: &str) -> Result<Self> {
        if !validate_version_format(version) {
            return Err(StellarError::InvalidVersion(version.to_string()));
        }

        let (major, minor) = version
            .split_once('.')
            .ok_or_else(|| StellarError::InvalidVersion(version.to_string()))?;
        let parse = |part: &str| {
            part.parse::<u64>()
                .map_err(|_| StellarError::InvalidVersion(version.to_string()))
        };

        Ok(Self {
            major: parse(major)?,
            minor: parse(minor)?,
        })
    }
}

impl std::fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
