//! Theme records as exchanged with the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::version::ThemeVersion;

/// A signed-in user acting on themes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Stable user id from the auth provider
    pub id: String,
    /// Public display name, used in theme URLs
    pub name: String,
}

impl Author {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}

/// A published theme. `(author_id, slug)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub id: Uuid,
    pub author_id: String,
    pub author_name: String,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub screenshot_url: Option<String>,
    pub downloads: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Editable theme metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeMetadata {
    pub name: String,
    pub description: Option<String>,
    pub screenshot_url: Option<String>,
}

/// A theme about to be created.
#[derive(Debug, Clone)]
pub struct NewTheme {
    pub author: Author,
    pub slug: String,
    pub metadata: ThemeMetadata,
}

/// A validated version about to be appended. The store stamps `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVersion {
    pub version: String,
    pub config_content: String,
    pub version_notes: Option<String>,
    pub dependencies: Option<Vec<String>>,
    pub installation_notes: Option<String>,
    pub min_runtime_version: String,
}

impl NewVersion {
    /// Turn this draft into a stored record.
    pub fn stamp(self, created_at: DateTime<Utc>) -> ThemeVersion {
        ThemeVersion {
            version: self.version,
            config_content: self.config_content,
            version_notes: self.version_notes,
            dependencies: self.dependencies,
            installation_notes: self.installation_notes,
            min_runtime_version: self.min_runtime_version,
            created_at,
        }
    }
}

/// A theme with its full history, newest version first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeDetail {
    #[serde(flatten)]
    pub theme: Theme,
    pub versions: Vec<ThemeVersion>,
}
