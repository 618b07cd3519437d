//! Themes: records, submission validation, the store seam and the service
//! that ties them to the rate limiter and version rules.

mod catalog;
mod model;
mod publish;
mod screenshot;
mod service;
mod store;

pub use catalog::{
    ThemeListing, ThemeQuery, ThemeSort, ThemeSummary, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
pub use model::{Author, NewTheme, NewVersion, Theme, ThemeDetail, ThemeMetadata};
pub use publish::{
    check_config_content, ConfigUpdateRequest, MetadataUpdateRequest, PublishRequest,
    ValidatedPublish,
};
pub use screenshot::{extract_valid_filename, is_valid_screenshot_filename};
pub use service::{DownloadCount, DownloadedConfig, MetadataUpdated, Published, ThemeService};
pub use store::{MemoryThemeStore, ThemeStore};
