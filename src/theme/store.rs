//! Persistence seam for themes and their versions.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use super::catalog::ThemeQuery;
use super::model::{NewTheme, NewVersion, Theme, ThemeMetadata};
use crate::error::{Result, StellarError};
use crate::version::ThemeVersion;

/// Storage for themes and their version histories.
///
/// Implementations must keep `(author_id, slug)` and `(theme_id, version)`
/// unique, stamp versions with non-decreasing creation times, and delete a
/// theme's versions together with the theme.
#[async_trait]
pub trait ThemeStore: Send + Sync {
    /// Look up a theme by author display name and slug.
    ///
    /// Display names are not unique; among several matches the oldest theme
    /// wins.
    async fn find_theme(&self, author_name: &str, slug: &str) -> Result<Option<Theme>>;

    /// Look up a theme by its owner's user id and slug.
    async fn find_theme_by_owner(&self, author_id: &str, slug: &str) -> Result<Option<Theme>>;

    /// Look up a theme by id.
    async fn find_theme_by_id(&self, id: Uuid) -> Result<Option<Theme>>;

    /// Create a theme together with its first version.
    async fn create_theme(&self, theme: NewTheme, first: NewVersion) -> Result<(Theme, ThemeVersion)>;

    /// Replace a theme's metadata and touch `updated_at`.
    async fn update_metadata(&self, id: Uuid, metadata: ThemeMetadata) -> Result<Theme>;

    /// All versions of a theme in insertion order.
    async fn versions(&self, id: Uuid) -> Result<Vec<ThemeVersion>>;

    /// Append a version and touch the theme's `updated_at`.
    ///
    /// Fails with [`StellarError::DuplicateVersion`] if it already exists.
    async fn insert_version(&self, id: Uuid, version: NewVersion) -> Result<ThemeVersion>;

    /// Add one to the download counter, returning the new total.
    async fn increment_downloads(&self, id: Uuid) -> Result<u64>;

    /// Delete a theme and its versions, returning the removed theme.
    async fn delete_theme(&self, id: Uuid) -> Result<Option<Theme>>;

    /// One page of themes matching `query`, plus the total match count.
    async fn list_themes(&self, query: &ThemeQuery) -> Result<(Vec<Theme>, usize)>;
}

struct StoredTheme {
    theme: Theme,
    versions: Vec<ThemeVersion>,
}

impl StoredTheme {
    /// A creation time no earlier than the latest existing version.
    fn next_created_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.versions
            .last()
            .map(|last| last.created_at.max(now))
            .unwrap_or(now)
    }
}

/// In-memory [`ThemeStore`].
#[derive(Clone, Default)]
pub struct MemoryThemeStore {
    themes: Arc<DashMap<Uuid, StoredTheme>>,
    /// (author_id, slug) -> theme id
    slugs: Arc<DashMap<(String, String), Uuid>>,
}

impl MemoryThemeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored themes.
    pub fn theme_count(&self) -> usize {
        self.themes.len()
    }

    fn missing(id: Uuid) -> StellarError {
        StellarError::NotFound(format!("Theme {}", id))
    }
}

#[async_trait]
impl ThemeStore for MemoryThemeStore {
    async fn find_theme(&self, author_name: &str, slug: &str) -> Result<Option<Theme>> {
        Ok(self
            .themes
            .iter()
            .filter(|t| t.theme.author_name == author_name && t.theme.slug == slug)
            .map(|t| t.theme.clone())
            .min_by_key(|t| (t.created_at, t.id)))
    }

    async fn find_theme_by_owner(&self, author_id: &str, slug: &str) -> Result<Option<Theme>> {
        let key = (author_id.to_string(), slug.to_string());
        let Some(id) = self.slugs.get(&key).map(|id| *id) else {
            return Ok(None);
        };
        self.find_theme_by_id(id).await
    }

    async fn find_theme_by_id(&self, id: Uuid) -> Result<Option<Theme>> {
        Ok(self.themes.get(&id).map(|t| t.theme.clone()))
    }

    async fn create_theme(&self, theme: NewTheme, first: NewVersion) -> Result<(Theme, ThemeVersion)> {
        let key = (theme.author.id.clone(), theme.slug.clone());
        match self.slugs.entry(key) {
            Entry::Occupied(_) => Err(StellarError::Store(format!(
                "theme {}/{} already exists",
                theme.author.name, theme.slug
            ))),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let id = Uuid::new_v4();
                let record = Theme {
                    id,
                    author_id: theme.author.id,
                    author_name: theme.author.name,
                    slug: theme.slug,
                    name: theme.metadata.name,
                    description: theme.metadata.description,
                    screenshot_url: theme.metadata.screenshot_url,
                    downloads: 0,
                    created_at: now,
                    updated_at: now,
                };
                let version = first.stamp(now);
                self.themes.insert(
                    id,
                    StoredTheme {
                        theme: record.clone(),
                        versions: vec![version.clone()],
                    },
                );
                slot.insert(id);
                debug!(theme_id = %id, "Stored new theme");
                Ok((record, version))
            }
        }
    }

    async fn update_metadata(&self, id: Uuid, metadata: ThemeMetadata) -> Result<Theme> {
        let mut stored = self.themes.get_mut(&id).ok_or_else(|| Self::missing(id))?;
        stored.theme.name = metadata.name;
        stored.theme.description = metadata.description;
        stored.theme.screenshot_url = metadata.screenshot_url;
        stored.theme.updated_at = Utc::now();
        Ok(stored.theme.clone())
    }

    async fn versions(&self, id: Uuid) -> Result<Vec<ThemeVersion>> {
        let stored = self.themes.get(&id).ok_or_else(|| Self::missing(id))?;
        Ok(stored.versions.clone())
    }

    async fn insert_version(&self, id: Uuid, version: NewVersion) -> Result<ThemeVersion> {
        let mut stored = self.themes.get_mut(&id).ok_or_else(|| Self::missing(id))?;
        if stored.versions.iter().any(|v| v.version == version.version) {
            return Err(StellarError::DuplicateVersion(version.version));
        }

        let created_at = stored.next_created_at(Utc::now());
        let record = version.stamp(created_at);
        stored.versions.push(record.clone());
        stored.theme.updated_at = created_at;
        Ok(record)
    }

    async fn increment_downloads(&self, id: Uuid) -> Result<u64> {
        let mut stored = self.themes.get_mut(&id).ok_or_else(|| Self::missing(id))?;
        stored.theme.downloads += 1;
        Ok(stored.theme.downloads)
    }

    async fn delete_theme(&self, id: Uuid) -> Result<Option<Theme>> {
        let Some((_, stored)) = self.themes.remove(&id) else {
            return Ok(None);
        };
        self.slugs
            .remove(&(stored.theme.author_id.clone(), stored.theme.slug.clone()));
        debug!(theme_id = %id, versions = stored.versions.len(), "Deleted theme and versions");
        Ok(Some(stored.theme))
    }

    async fn list_themes(&self, query: &ThemeQuery) -> Result<(Vec<Theme>, usize)> {
        let themes: Vec<Theme> = self.themes.iter().map(|t| t.theme.clone()).collect();
        Ok(query.apply(themes))
    }
}
