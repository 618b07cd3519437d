//! Validation of publish, config-update and metadata-edit submissions.

use serde::Deserialize;
use tracing::warn;

use super::model::{NewVersion, Theme, ThemeMetadata};
use crate::error::{Result, StellarError};
use crate::version::{
    normalize, parse_dependencies, validate_runtime_version_format, validate_version_format,
};

const MAX_NAME_LEN: usize = 100;
const MAX_SLUG_LEN: usize = 50;
const MAX_DESCRIPTION_LEN: usize = 500;
const MAX_CONFIG_LEN: usize = 100_000;
const MAX_INSTALLATION_NOTES_LEN: usize = 1000;
const MAX_VERSION_NOTES_LEN: usize = 500;

/// A theme upload: creates the theme, or appends a version when the author
/// already has a theme with this slug.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub config: String,
    /// `major.minor`, optionally prefixed with `v`
    pub version: String,
    pub min_runtime_version: String,
    /// Free text, one dependency per line
    pub dependencies: Option<String>,
    pub installation_notes: Option<String>,
    pub version_notes: Option<String>,
    /// Public URL of the already-uploaded screenshot
    pub screenshot_url: Option<String>,
}

/// A validated [`PublishRequest`].
#[derive(Debug, Clone)]
pub struct ValidatedPublish {
    pub slug: String,
    pub metadata: ThemeMetadata,
    pub version: NewVersion,
}

impl PublishRequest {
    /// Check every field and normalize the version.
    pub fn validate(self) -> Result<ValidatedPublish> {
        check_len("name", &self.name, 1, MAX_NAME_LEN)?;
        check_slug(&self.slug)?;
        check_optional_len("description", self.description.as_deref(), MAX_DESCRIPTION_LEN)?;
        check_len("config", &self.config, 1, MAX_CONFIG_LEN)?;

        let version = normalize(&self.version);
        if !validate_version_format(version) {
            return Err(StellarError::validation(
                "version",
                format!("'{}' is not of the form major.minor", self.version),
            ));
        }
        check_runtime_version(&self.min_runtime_version)?;
        check_optional_len(
            "installationNotes",
            self.installation_notes.as_deref(),
            MAX_INSTALLATION_NOTES_LEN,
        )?;
        check_optional_len("versionNotes", self.version_notes.as_deref(), MAX_VERSION_NOTES_LEN)?;
        check_config_content(&self.config, &self.slug)?;

        let version = version.to_string();
        Ok(ValidatedPublish {
            metadata: ThemeMetadata {
                name: self.name,
                description: non_empty(self.description),
                screenshot_url: non_empty(self.screenshot_url),
            },
            version: NewVersion {
                version,
                dependencies: parse_dependencies(self.dependencies.as_deref()),
                config_content: self.config,
                version_notes: non_empty(self.version_notes),
                installation_notes: non_empty(self.installation_notes),
                min_runtime_version: self.min_runtime_version,
            },
            slug: self.slug,
        })
    }
}

/// A new version for an existing theme.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdateRequest {
    /// Exactly `major.minor`; no `v` prefix accepted here
    pub version: String,
    pub config: String,
    pub min_runtime_version: String,
    pub dependencies: Option<String>,
    pub version_notes: Option<String>,
}

impl ConfigUpdateRequest {
    /// Check every field. `slug` is only used for diagnostics.
    pub fn validate(self, slug: &str) -> Result<NewVersion> {
        if !validate_version_format(&self.version) {
            return Err(StellarError::validation(
                "version",
                format!("'{}' is not of the form major.minor", self.version),
            ));
        }
        check_len("config", &self.config, 1, MAX_CONFIG_LEN)?;
        check_runtime_version(&self.min_runtime_version)?;
        check_optional_len("versionNotes", self.version_notes.as_deref(), MAX_VERSION_NOTES_LEN)?;
        check_config_content(&self.config, slug)?;

        Ok(NewVersion {
            version: self.version,
            dependencies: parse_dependencies(self.dependencies.as_deref()),
            config_content: self.config,
            version_notes: non_empty(self.version_notes),
            installation_notes: None,
            min_runtime_version: self.min_runtime_version,
        })
    }
}

/// An owner's edit of a theme's metadata.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataUpdateRequest {
    /// Blank keeps the current name
    pub name: Option<String>,
    /// Blank clears the description
    pub description: Option<String>,
    /// Public URL of a newly uploaded screenshot; absent keeps the current one
    pub screenshot_url: Option<String>,
}

impl MetadataUpdateRequest {
    /// Check the fields and merge them over `current`.
    pub fn apply(self, current: &Theme) -> Result<ThemeMetadata> {
        let name = non_empty(self.name).unwrap_or_else(|| current.name.clone());
        check_len("name", &name, 1, MAX_NAME_LEN)?;
        let description = non_empty(self.description);
        check_optional_len("description", description.as_deref(), MAX_DESCRIPTION_LEN)?;

        Ok(ThemeMetadata {
            name,
            description,
            screenshot_url: non_empty(self.screenshot_url).or_else(|| current.screenshot_url.clone()),
        })
    }
}

/// Superficial config sanity check: the text must contain a table header
/// bracket pair. Configs defining `[custom.*]` modules run arbitrary shell
/// commands and are flagged in the logs.
pub fn check_config_content(config: &str, slug: &str) -> Result<()> {
    if !config.contains('[') || !config.contains(']') {
        return Err(StellarError::validation("config", "Invalid Starship config (TOML)"));
    }

    if config.contains("[custom.") {
        warn!(slug = %slug, "Theme contains custom commands");
    }

    Ok(())
}

fn check_slug(slug: &str) -> Result<()> {
    check_len("slug", slug, 1, MAX_SLUG_LEN)?;
    if !slug
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        return Err(StellarError::validation(
            "slug",
            "only lowercase letters, digits and '-' are allowed",
        ));
    }
    Ok(())
}

fn check_runtime_version(version: &str) -> Result<()> {
    if !validate_runtime_version_format(version) {
        return Err(StellarError::validation(
            "minRuntimeVersion",
            format!("'{}' is not of the form major.minor.patch", version),
        ));
    }
    Ok(())
}

fn check_len(field: &'static str, value: &str, min: usize, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len < min {
        return Err(StellarError::validation(field, format!("must be at least {} characters", min)));
    }
    if len > max {
        return Err(StellarError::validation(field, format!("must be at most {} characters", max)));
    }
    Ok(())
}

fn check_optional_len(field: &'static str, value: Option<&str>, max: usize) -> Result<()> {
    match value {
        Some(value) => check_len(field, value, 0, max),
        None => Ok(()),
    }
}

/// Form fields arrive as empty strings when left blank.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
