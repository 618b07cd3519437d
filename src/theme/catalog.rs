//! Public catalog queries: search, author filter, ordering and paging.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::Theme;

/// Page size when the query names none.
pub const DEFAULT_PAGE_SIZE: usize = 20;
/// Largest page a query may ask for.
pub const MAX_PAGE_SIZE: usize = 100;

/// Catalog ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeSort {
    /// Most downloaded, newer first among equals
    #[default]
    Trending,
    /// Newest first
    Recent,
    /// Most downloaded
    Popular,
    /// Alphabetical by display name
    Name,
}

impl ThemeSort {
    /// Parse a query-string value. Unknown values sort by downloads.
    pub fn parse(value: &str) -> Self {
        match value {
            "trending" => ThemeSort::Trending,
            "recent" => ThemeSort::Recent,
            "popular" => ThemeSort::Popular,
            "name" => ThemeSort::Name,
            _ => ThemeSort::Popular,
        }
    }

    fn compare(self, a: &Theme, b: &Theme) -> Ordering {
        let primary = match self {
            ThemeSort::Trending => b
                .downloads
                .cmp(&a.downloads)
                .then_with(|| b.created_at.cmp(&a.created_at)),
            ThemeSort::Recent => b.created_at.cmp(&a.created_at),
            ThemeSort::Popular => b.downloads.cmp(&a.downloads),
            ThemeSort::Name => a
                .name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name)),
        };
        // Stores iterate in no particular order
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

/// A catalog listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThemeQuery {
    /// Case-insensitive substring of the name or description
    pub search: Option<String>,
    /// Only themes by this author id
    pub author: Option<String>,
    pub sort: ThemeSort,
    /// Page size; defaults to [`DEFAULT_PAGE_SIZE`], capped at [`MAX_PAGE_SIZE`]
    pub limit: Option<usize>,
    pub offset: usize,
}

impl ThemeQuery {
    /// The effective page size.
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE)
    }

    /// True if `theme` passes the search and author filters.
    pub fn matches(&self, theme: &Theme) -> bool {
        if let Some(author) = self.author.as_deref().filter(|a| !a.is_empty()) {
            if theme.author_id != author {
                return false;
            }
        }

        match self.search.as_deref().filter(|s| !s.is_empty()) {
            Some(search) => {
                let needle = search.to_lowercase();
                theme.name.to_lowercase().contains(&needle)
                    || theme
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            }
            None => true,
        }
    }

    /// Filter, order and page `themes`. Returns the page and the number of
    /// matching themes before paging.
    pub fn apply(&self, themes: impl IntoIterator<Item = Theme>) -> (Vec<Theme>, usize) {
        let mut matched: Vec<Theme> = themes.into_iter().filter(|t| self.matches(t)).collect();
        let total = matched.len();
        matched.sort_by(|a, b| self.sort.compare(a, b));

        let page = matched
            .into_iter()
            .skip(self.offset)
            .take(self.limit())
            .collect();
        (page, total)
    }
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeSummary {
    pub id: Uuid,
    pub author_id: String,
    pub author_name: String,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub screenshot_url: Option<String>,
    pub downloads: u64,
    pub latest_version: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ThemeSummary {
    pub fn new(theme: Theme, latest_version: Option<String>) -> Self {
        Self {
            id: theme.id,
            author_id: theme.author_id,
            author_name: theme.author_name,
            slug: theme.slug,
            name: theme.name,
            description: theme.description,
            screenshot_url: theme.screenshot_url,
            downloads: theme.downloads,
            latest_version,
            created_at: theme.created_at,
            updated_at: theme.updated_at,
        }
    }
}

/// A page of the catalog.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeListing {
    pub themes: Vec<ThemeSummary>,
    pub limit: usize,
    pub offset: usize,
    /// Matching themes across all pages
    pub total: usize,
}
