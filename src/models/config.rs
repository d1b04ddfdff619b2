//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Browser and pagination behavior
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// YouTube search and caption settings
    #[serde(default)]
    pub youtube: YoutubeConfig,

    /// Feature names required from the license
    #[serde(default)]
    pub license: LicenseConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.max_pages == 0 {
            return Err(AppError::validation("crawler.max_pages must be > 0"));
        }
        if self.crawler.stale_page_limit == 0 {
            return Err(AppError::validation("crawler.stale_page_limit must be > 0"));
        }
        if self.crawler.page_load_timeout_secs == 0 {
            return Err(AppError::validation(
                "crawler.page_load_timeout_secs must be > 0",
            ));
        }
        if self.crawler.window_width == 0 || self.crawler.window_height == 0 {
            return Err(AppError::validation("crawler window size must be non-zero"));
        }
        if self.youtube.meta_workers == 0 {
            return Err(AppError::validation("youtube.meta_workers must be > 0"));
        }
        if self.license.community_feature.trim().is_empty()
            || self.license.youtube_feature.trim().is_empty()
        {
            return Err(AppError::validation("license feature names must not be empty"));
        }
        Ok(())
    }
}

/// Browser session and pagination settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Hard ceiling on list pages per crawl
    #[serde(default = "defaults::max_pages")]
    pub max_pages: u32,

    /// Consecutive empty pages that end a crawl
    #[serde(default = "defaults::stale_page_limit")]
    pub stale_page_limit: u32,

    /// Run the browser without a visible window
    #[serde(default = "defaults::headless")]
    pub headless: bool,

    /// Page load timeout in seconds
    #[serde(default = "defaults::page_load_timeout")]
    pub page_load_timeout_secs: u64,

    /// How long to wait for detail-page elements, in seconds
    #[serde(default = "defaults::detail_wait")]
    pub detail_wait_secs: u64,

    #[serde(default = "defaults::window_width")]
    pub window_width: u32,

    #[serde(default = "defaults::window_height")]
    pub window_height: u32,

    /// Delay after each navigation in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: defaults::max_pages(),
            stale_page_limit: defaults::stale_page_limit(),
            headless: defaults::headless(),
            page_load_timeout_secs: defaults::page_load_timeout(),
            detail_wait_secs: defaults::detail_wait(),
            window_width: defaults::window_width(),
            window_height: defaults::window_height(),
            request_delay_ms: defaults::request_delay(),
        }
    }
}

/// YouTube search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoutubeConfig {
    /// Width of the metadata worker pool
    #[serde(default = "defaults::meta_workers")]
    pub meta_workers: usize,

    /// Number of results when none is requested
    #[serde(default = "defaults::default_results")]
    pub default_results: usize,

    /// Keep untranslated captions when translation to Korean fails
    #[serde(default = "defaults::allow_non_korean")]
    pub allow_non_korean: bool,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            meta_workers: defaults::meta_workers(),
            default_results: defaults::default_results(),
            allow_non_korean: defaults::allow_non_korean(),
        }
    }
}

/// Feature names a license must carry for each command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseConfig {
    #[serde(default = "defaults::community_feature")]
    pub community_feature: String,

    #[serde(default = "defaults::youtube_feature")]
    pub youtube_feature: String,
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            community_feature: defaults::community_feature(),
            youtube_feature: defaults::youtube_feature(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    // Crawler defaults
    pub fn max_pages() -> u32 {
        300
    }
    pub fn stale_page_limit() -> u32 {
        3
    }
    pub fn headless() -> bool {
        true
    }
    pub fn page_load_timeout() -> u64 {
        25
    }
    pub fn detail_wait() -> u64 {
        5
    }
    pub fn window_width() -> u32 {
        1920
    }
    pub fn window_height() -> u32 {
        1080
    }
    pub fn request_delay() -> u64 {
        300
    }

    // YouTube defaults
    pub fn meta_workers() -> usize {
        12
    }
    pub fn default_results() -> usize {
        5
    }
    pub fn allow_non_korean() -> bool {
        true
    }

    // License defaults
    pub fn community_feature() -> String {
        "community".into()
    }
    pub fn youtube_feature() -> String {
        "youtube".into()
    }

    pub fn log_level() -> String {
        "info".into()
    }
}
