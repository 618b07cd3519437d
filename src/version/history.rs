//! Version history: records, latest resolution, duplicates, dependencies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;
use uuid::Uuid;

use super::format::normalize;

/// An immutable snapshot of a theme's configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeVersion {
    /// Normalized `major.minor` version string
    pub version: String,
    /// Raw configuration text, opaque to this crate
    pub config_content: String,
    pub version_notes: Option<String>,
    /// Ordered dependency names, absent when none were given
    pub dependencies: Option<Vec<String>>,
    pub installation_notes: Option<String>,
    /// Minimum runtime version as `major.minor.patch`
    pub min_runtime_version: String,
    pub created_at: DateTime<Utc>,
}

/// Anything carrying a version string and a creation time.
pub trait VersionStamp {
    fn version(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
}

impl VersionStamp for ThemeVersion {
    fn version(&self) -> &str {
        &self.version
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl<S: AsRef<str>> VersionStamp for (S, DateTime<Utc>) {
    fn version(&self) -> &str {
        self.0.as_ref()
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.1
    }
}

/// The most recently created version, or `None` for an empty history.
///
/// Entries sharing the greatest `created_at` resolve to the one appearing
/// last in `versions`, i.e. the most recently inserted.
pub fn resolve_latest<V: VersionStamp>(versions: &[V]) -> Option<&V> {
    // max_by_key returns the last of equal maxima
    versions.iter().max_by_key(|v| v.created_at())
}

/// Whether `proposed` (after normalization) already exists for the theme.
///
/// Equality is exact string equality: `1.0` and `1.00` are different
/// versions.
pub fn is_duplicate_version<S: AsRef<str>>(theme_id: Uuid, proposed: &str, existing: &[S]) -> bool {
    let proposed = normalize(proposed);
    let duplicate = existing.iter().any(|v| v.as_ref() == proposed);
    trace!(theme_id = %theme_id, version = proposed, duplicate, "Checked for duplicate version");
    duplicate
}

/// Parse free-text dependencies, one per line.
///
/// Lines are trimmed and blank lines dropped. Returns `None` when the input
/// is absent or nothing survives, so "no dependencies" is never an empty list.
pub fn parse_dependencies(text: Option<&str>) -> Option<Vec<String>> {
    let dependencies: Vec<String> = text?
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if dependencies.is_empty() {
        None
    } else {
        Some(dependencies)
    }
}

/// Which version a download asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRef {
    /// Whatever [`resolve_latest`] picks
    Latest,
    /// An exact, normalized version string
    Exact(String),
}

impl VersionRef {
    /// Interpret a path segment such as `v1.2`, `1.2` or `latest`.
    pub fn parse(segment: &str) -> Self {
        match normalize(segment) {
            "latest" => VersionRef::Latest,
            exact => VersionRef::Exact(exact.to_string()),
        }
    }

    /// Pick the matching version out of a history.
    pub fn select<'a>(&self, versions: &'a [ThemeVersion]) -> Option<&'a ThemeVersion> {
        match self {
            VersionRef::Latest => resolve_latest(versions),
            VersionRef::Exact(version) => versions.iter().find(|v| &v.version == version),
        }
    }
}

impl std::fmt::Display for VersionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VersionRef::Latest => write!(f, "latest"),
            VersionRef::Exact(version) => write!(f, "{}", version),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn record(version: &str, created_at: DateTime<Utc>) -> ThemeVersion {
        ThemeVersion {
            version: version.to_string(),
            config_content: "[character]\nsuccess_symbol = \"❯\"".to_string(),
            version_notes: None,
            dependencies: None,
            installation_notes: None,
            min_runtime_version: "1.16.0".to_string(),
            created_at,
        }
    }

    #[test]
    fn test_resolve_latest_by_created_at() {
        let versions = vec![("1.0", t(0)), ("1.1", t(2)), ("1.0-replaced", t(1))];
        assert_eq!(resolve_latest(&versions).unwrap().0, "1.1");

        let mut reversed = versions.clone();
        reversed.reverse();
        assert_eq!(resolve_latest(&reversed).unwrap().0, "1.1");

        let rotated = vec![versions[2], versions[0], versions[1]];
        assert_eq!(resolve_latest(&rotated).unwrap().0, "1.1");
    }

    #[test]
    fn test_resolve_latest_empty() {
        let versions: Vec<(String, DateTime<Utc>)> = Vec::new();
        assert!(resolve_latest(&versions).is_none());
    }

    #[test]
    fn test_resolve_latest_tie_prefers_last_inserted() {
        let versions = vec![("1.0", t(5)), ("1.1", t(5)), ("0.9", t(1))];
        assert_eq!(resolve_latest(&versions).unwrap().0, "1.1");
    }

    #[test]
    fn test_resolve_latest_on_records() {
        let versions = vec![record("1.0", t(0)), record("2.0", t(0) + Duration::days(3))];
        assert_eq!(resolve_latest(&versions).unwrap().version, "2.0");
    }

    #[test]
    fn test_duplicate_detection_is_exact() {
        let theme_id = Uuid::new_v4();
        let existing = ["1.0", "1.1"];

        assert!(is_duplicate_version(theme_id, "1.0", &existing));
        assert!(is_duplicate_version(theme_id, "v1.1", &existing));
        assert!(!is_duplicate_version(theme_id, "1.00", &existing));
        assert!(!is_duplicate_version(theme_id, "1.2", &existing));
        assert!(!is_duplicate_version::<&str>(theme_id, "1.0", &[]));
    }

    #[test]
    fn test_parse_dependencies() {
        assert_eq!(
            parse_dependencies(Some("FiraCode Nerd Font\n\nJetBrainsMono Nerd Font\n  ")),
            Some(vec![
                "FiraCode Nerd Font".to_string(),
                "JetBrainsMono Nerd Font".to_string()
            ])
        );
        assert_eq!(parse_dependencies(Some("")), None);
        assert_eq!(parse_dependencies(Some(" \n\t\n")), None);
        assert_eq!(parse_dependencies(None), None);
    }

    #[test]
    fn test_parse_dependencies_handles_crlf() {
        assert_eq!(
            parse_dependencies(Some("starship\r\nzoxide\r\n")),
            Some(vec!["starship".to_string(), "zoxide".to_string()])
        );
    }

    #[test]
    fn test_version_ref_parse() {
        assert_eq!(VersionRef::parse("latest"), VersionRef::Latest);
        assert_eq!(VersionRef::parse("vlatest"), VersionRef::Latest);
        assert_eq!(VersionRef::parse("v1.2"), VersionRef::Exact("1.2".to_string()));
        assert_eq!(VersionRef::parse("1.2").to_string(), "1.2");
    }

    #[test]
    fn test_version_ref_select() {
        let versions = vec![record("1.0", t(0)), record("1.1", t(10))];

        assert_eq!(VersionRef::Latest.select(&versions).unwrap().version, "1.1");
        assert_eq!(VersionRef::parse("v1.0").select(&versions).unwrap().version, "1.0");
        assert!(VersionRef::parse("2.0").select(&versions).is_none());
        assert!(VersionRef::Latest.select(&[]).is_none());
    }

    #[test]
    fn test_theme_version_serializes_camel_case() {
        let value = serde_json::to_value(record("1.0", t(0))).unwrap();
        assert_eq!(value["minRuntimeVersion"], "1.16.0");
        assert!(value.get("configContent").is_some());
    }
}
