//! Theme operations over a store, with rate-limited download counting.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::catalog::{ThemeListing, ThemeQuery, ThemeSummary};
use super::model::{Author, NewTheme, Theme, ThemeDetail};
use super::publish::{ConfigUpdateRequest, MetadataUpdateRequest, PublishRequest};
use super::screenshot::{extract_valid_filename, is_valid_screenshot_filename};
use super::store::ThemeStore;
use crate::error::{Result, StellarError};
use crate::ratelimit::{ClientHeaders, RateLimitKey, RateLimiter};
use crate::version::{
    compute_next_version, is_duplicate_version, resolve_latest, BumpType, ThemeVersion, VersionRef,
};

/// Result of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Published {
    pub theme_id: Uuid,
    pub author: String,
    pub slug: String,
    pub version: String,
    /// False when the slug already existed and a version was appended
    pub created: bool,
}

/// A config file ready to hand to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedConfig {
    /// `{slug}-{version}.toml`
    pub filename: String,
    pub version: String,
    pub content: String,
}

/// Outcome of a download-count request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadCount {
    /// The counter was incremented
    Counted { downloads: u64 },
    /// This client already counted this theme in the current window
    Throttled { retry_after_secs: u64 },
}

/// Result of a metadata edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataUpdated {
    pub theme: Theme,
    /// Old screenshot filename to remove from blob storage, when the
    /// screenshot was replaced and the old name is well-formed
    pub replaced_screenshot: Option<String>,
}

/// Theme operations shared by every request entry point.
pub struct ThemeService<S: ThemeStore> {
    store: Arc<S>,
    limiter: Arc<RateLimiter>,
}

impl<S: ThemeStore> ThemeService<S> {
    /// Create a new ThemeService over `store`, counting downloads through `limiter`.
    pub fn new(store: Arc<S>, limiter: Arc<RateLimiter>) -> Self {
        Self { store, limiter }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Publish a theme, or a new version of the author's theme with the same slug.
    #[instrument(skip(self, author, request), fields(author = %author.name, slug = %request.slug))]
    pub async fn publish(&self, author: &Author, request: PublishRequest) -> Result<Published> {
        let validated = request.validate()?;

        let existing = self
            .store
            .find_theme_by_owner(&author.id, &validated.slug)
            .await?;
        let (theme_id, version, created) = match existing {
            Some(theme) => {
                let versions = self.store.versions(theme.id).await?;
                let names: Vec<&str> = versions.iter().map(|v| v.version.as_str()).collect();
                if is_duplicate_version(theme.id, &validated.version.version, &names) {
                    return Err(StellarError::DuplicateVersion(validated.version.version));
                }

                self.store.update_metadata(theme.id, validated.metadata).await?;
                let version = self.store.insert_version(theme.id, validated.version).await?;
                (theme.id, version.version, false)
            }
            None => {
                let new_theme = NewTheme {
                    author: author.clone(),
                    slug: validated.slug.clone(),
                    metadata: validated.metadata,
                };
                let (theme, version) = self.store.create_theme(new_theme, validated.version).await?;
                (theme.id, version.version, true)
            }
        };

        info!(theme_id = %theme_id, version = %version, created, "Theme published");

        Ok(Published {
            theme_id,
            author: author.name.clone(),
            slug: validated.slug,
            version,
            created,
        })
    }

    /// Append a new config version to a theme the user owns.
    #[instrument(skip(self, user, request), fields(user = %user.id, version = %request.version))]
    pub async fn update_config(
        &self,
        user: &Author,
        theme_id: Uuid,
        request: ConfigUpdateRequest,
    ) -> Result<ThemeVersion> {
        let theme = self.owned_theme(user, theme_id).await?;
        let new_version = request.validate(&theme.slug)?;

        let versions = self.store.versions(theme_id).await?;
        let names: Vec<&str> = versions.iter().map(|v| v.version.as_str()).collect();
        if is_duplicate_version(theme_id, &new_version.version, &names) {
            return Err(StellarError::DuplicateVersion(new_version.version));
        }

        let version = self.store.insert_version(theme_id, new_version).await?;
        info!(theme_id = %theme_id, version = %version.version, "Theme config updated");
        Ok(version)
    }

    /// Edit the metadata of a theme the user owns.
    #[instrument(skip(self, user, request), fields(user = %user.id))]
    pub async fn update_metadata(
        &self,
        user: &Author,
        theme_id: Uuid,
        request: MetadataUpdateRequest,
    ) -> Result<MetadataUpdated> {
        let theme = self.owned_theme(user, theme_id).await?;
        let metadata = request.apply(&theme)?;

        let replaced_screenshot = match theme.screenshot_url.as_deref() {
            Some(old) if metadata.screenshot_url.as_deref() != Some(old) => {
                removable_screenshot(theme_id, old)
            }
            _ => None,
        };

        let theme = self.store.update_metadata(theme_id, metadata).await?;
        info!(theme_id = %theme_id, "Theme metadata updated");
        Ok(MetadataUpdated {
            theme,
            replaced_screenshot,
        })
    }

    /// A page of the public catalog, each entry with its latest version.
    #[instrument(skip(self))]
    pub async fn list_themes(&self, query: ThemeQuery) -> Result<ThemeListing> {
        let (page, total) = self.store.list_themes(&query).await?;

        let mut themes = Vec::with_capacity(page.len());
        for theme in page {
            let versions = self.store.versions(theme.id).await?;
            let latest_version = resolve_latest(&versions).map(|v| v.version.clone());
            themes.push(ThemeSummary::new(theme, latest_version));
        }

        debug!(returned = themes.len(), total, "Listed themes");
        Ok(ThemeListing {
            themes,
            limit: query.limit(),
            offset: query.offset,
            total,
        })
    }

    /// The version a bump of the theme's latest version would produce.
    pub async fn next_version(&self, theme_id: Uuid, bump: BumpType) -> Result<String> {
        let versions = self.store.versions(theme_id).await?;
        let latest = resolve_latest(&versions)
            .ok_or_else(|| StellarError::NotFound(format!("Latest version of theme {}", theme_id)))?;
        compute_next_version(&latest.version, bump)
    }

    /// A theme with its history, newest version first.
    pub async fn theme_detail(&self, author: &str, slug: &str) -> Result<ThemeDetail> {
        let theme = self.find(author, slug).await?;
        let mut versions = self.store.versions(theme.id).await?;
        // Newest first; equal timestamps keep the later insertion first
        versions.sort_by_key(|v| v.created_at);
        versions.reverse();
        Ok(ThemeDetail { theme, versions })
    }

    /// Fetch a config for download.
    ///
    /// The theme's download counter is bumped at most once per client and
    /// window; a failing bump is logged and never fails the download.
    #[instrument(skip(self, client))]
    pub async fn download(
        &self,
        author: &str,
        slug: &str,
        version: &str,
        client: &ClientHeaders,
    ) -> Result<DownloadedConfig> {
        let theme = self.find(author, slug).await?;
        let versions = self.store.versions(theme.id).await?;

        let wanted = VersionRef::parse(version);
        let selected = wanted
            .select(&versions)
            .ok_or_else(|| StellarError::NotFound(format!("Version {}", wanted)))?;

        let downloaded = DownloadedConfig {
            filename: format!("{}-{}.toml", theme.slug, selected.version),
            version: selected.version.clone(),
            content: selected.config_content.clone(),
        };

        if let Err(e) = self.count_download(&theme, client).await {
            warn!(theme_id = %theme.id, error = %e, "Failed to increment downloads");
        }

        Ok(downloaded)
    }

    /// Count a download of a theme for this client, once per window.
    #[instrument(skip(self, client))]
    pub async fn record_download(
        &self,
        author: &str,
        slug: &str,
        client: &ClientHeaders,
    ) -> Result<DownloadCount> {
        let theme = self.find(author, slug).await?;
        self.count_download(&theme, client).await
    }

    /// Delete a theme the user owns, with all its versions.
    ///
    /// Returns the screenshot filename to remove from blob storage, if the
    /// stored URL names a well-formed one.
    #[instrument(skip(self, user), fields(user = %user.id))]
    pub async fn delete_theme(&self, user: &Author, theme_id: Uuid) -> Result<Option<String>> {
        let theme = self.owned_theme(user, theme_id).await?;

        let screenshot = theme
            .screenshot_url
            .as_deref()
            .and_then(|url| removable_screenshot(theme_id, url));

        self.store.delete_theme(theme_id).await?;
        info!(theme_id = %theme_id, "Theme deleted");
        Ok(screenshot)
    }

    /// The limiter slot is taken before the store increment, so a failed
    /// increment still uses up this client's count for the window.
    async fn count_download(&self, theme: &Theme, client: &ClientHeaders) -> Result<DownloadCount> {
        let key = RateLimitKey::new(&client.identity(), &theme.author_name, &theme.slug);
        let status = self.limiter.check_key(&key);

        if status.limited {
            let retry_after_secs = status.retry_after_secs.unwrap_or_default();
            debug!(key = %key, retry_after_secs, "Download count throttled");
            return Ok(DownloadCount::Throttled { retry_after_secs });
        }

        let downloads = self.store.increment_downloads(theme.id).await?;
        Ok(DownloadCount::Counted { downloads })
    }

    async fn find(&self, author: &str, slug: &str) -> Result<Theme> {
        self.store
            .find_theme(author, slug)
            .await?
            .ok_or_else(|| StellarError::NotFound(format!("Theme {}/{}", author, slug)))
    }

    async fn owned_theme(&self, user: &Author, theme_id: Uuid) -> Result<Theme> {
        let theme = self
            .store
            .find_theme_by_id(theme_id)
            .await?
            .ok_or_else(|| StellarError::NotFound(format!("Theme {}", theme_id)))?;

        if theme.author_id != user.id {
            return Err(forbidden(user, &theme));
        }
        Ok(theme)
    }
}

fn removable_screenshot(theme_id: Uuid, url: &str) -> Option<String> {
    let filename = extract_valid_filename(url, is_valid_screenshot_filename);
    if filename.is_none() {
        warn!(theme_id = %theme_id, url = %url, "Refusing to delete malformed screenshot path");
    }
    filename.map(str::to_string)
}

fn forbidden(user: &Author, theme: &Theme) -> StellarError {
    StellarError::Forbidden {
        user: user.id.clone(),
        theme_id: theme.id,
    }
}
