// src/config.rs

//! Runtime environment and configuration loading.
//!
//! Everything the crawler reads from the process environment is captured once
//! in an [`Environment`] and passed explicitly to the license store, the
//! driver resolver and the caption cache.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::Config;

/// Direct license token.
pub const LICENSE_ENV: &str = "UNIFIED_CRAWLER_LICENSE";
/// Path to a license file.
pub const LICENSE_FILE_ENV: &str = "UNIFIED_CRAWLER_LICENSE_FILE";
/// Explicit chromedriver binary.
pub const CHROMEDRIVER_ENV: &str = "CHROMEDRIVER_PATH";
/// Width of the YouTube metadata pool.
pub const META_WORKERS_ENV: &str = "YT_META_WORKERS";
/// Netscape cookie file handed to yt-dlp, in lookup order.
pub const COOKIES_ENVS: [&str; 2] = ["YTDLP_COOKIES", "YT_COOKIES"];
const COOKIE_FILE_NAMES: [&str; 2] = ["cookies.txt", "yt_cookies.txt"];

const VENDOR_DIR: &str = "OneInsight";
const PRODUCT_DIR: &str = "UnifiedCrawler";
const USER_DIR: &str = ".unifiedcrawler";

/// Filesystem locations and environment overrides for one process.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// Directory of the running executable (tier 1)
    pub install_dir: Option<PathBuf>,

    /// Shared system data directory (tier 2)
    pub shared_dir: Option<PathBuf>,

    /// Per-user directory (tier 3)
    pub user_dir: Option<PathBuf>,

    /// Root of the transcript cache
    pub cache_dir: PathBuf,

    pub license_token: Option<String>,
    pub license_file: Option<PathBuf>,
    pub chromedriver_path: Option<PathBuf>,
    pub meta_workers: Option<usize>,
    pub cookies_file: Option<PathBuf>,
}

impl Environment {
    /// Capture the environment of the current process.
    pub fn from_process() -> Self {
        let install_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));

        let program_data = std::env::var_os("PROGRAMDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/usr/local/share"));
        let shared_dir = program_data.join(VENDOR_DIR).join(PRODUCT_DIR);

        let home = dirs::home_dir();
        let user_dir = home.as_ref().map(|h| h.join(USER_DIR));

        let cache_root = dirs::data_local_dir()
            .or_else(|| home.clone())
            .unwrap_or_else(std::env::temp_dir);
        let cache_dir = cache_root
            .join(VENDOR_DIR)
            .join(PRODUCT_DIR)
            .join("cache")
            .join("transcripts");

        Self {
            install_dir,
            shared_dir: Some(shared_dir),
            user_dir,
            cache_dir,
            license_token: non_empty_var(LICENSE_ENV),
            license_file: non_empty_var(LICENSE_FILE_ENV).map(PathBuf::from),
            chromedriver_path: non_empty_var(CHROMEDRIVER_ENV).map(PathBuf::from),
            meta_workers: non_empty_var(META_WORKERS_ENV).and_then(|v| v.trim().parse().ok()),
            cookies_file: COOKIES_ENVS
                .iter()
                .filter_map(|name| non_empty_var(name))
                .map(PathBuf::from)
                .find(|p| p.is_file()),
        }
    }

    /// Cookie file for YouTube requests: the environment, then the tiers.
    pub fn find_cookies(&self) -> Option<PathBuf> {
        if let Some(path) = &self.cookies_file {
            return Some(path.clone());
        }
        self.search_dirs()
            .into_iter()
            .flat_map(|dir| COOKIE_FILE_NAMES.map(|name| dir.join(name)))
            .find(|p| p.is_file())
    }

    /// Search directories in priority order: install, shared, user.
    pub fn search_dirs(&self) -> Vec<PathBuf> {
        [&self.install_dir, &self.shared_dir, &self.user_dir]
            .into_iter()
            .flatten()
            .cloned()
            .collect()
    }

    /// Candidate paths for a file name across all search directories.
    pub fn search_paths(&self, file_name: &str) -> Vec<PathBuf> {
        self.search_dirs()
            .into_iter()
            .map(|dir| dir.join(file_name))
            .collect()
    }

    /// Apply environment overrides on top of a loaded configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(workers) = self.meta_workers.filter(|w| *w > 0) {
            config.youtube.meta_workers = workers;
        }
    }

    /// An environment whose three tiers and cache live under one root.
    #[cfg(test)]
    pub(crate) fn rooted(root: &Path) -> Self {
        Self {
            install_dir: Some(root.join("install")),
            shared_dir: Some(root.join("shared")),
            user_dir: Some(root.join("user")),
            cache_dir: root.join("cache"),
            ..Self::default()
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Load configuration from a TOML file, apply environment overrides and
/// validate the result.
///
/// A missing or unreadable file falls back to defaults; invalid values fail.
pub fn load_config(path: &Path, env: &Environment) -> Result<Config> {
    let mut config = Config::load_or_default(path);
    env.apply_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_paths_follow_tier_order() {
        let env = Environment::rooted(Path::new("/r"));
        let paths = env.search_paths("license.dat");
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/r/install/license.dat"),
                PathBuf::from("/r/shared/license.dat"),
                PathBuf::from("/r/user/license.dat"),
            ]
        );
    }

    #[test]
    fn test_missing_tiers_are_skipped() {
        let env = Environment {
            user_dir: Some(PathBuf::from("/home/u/.unifiedcrawler")),
            ..Environment::default()
        };
        assert_eq!(env.search_dirs().len(), 1);
    }

    #[test]
    fn test_find_cookies_in_tiers() {
        let dir = tempfile::TempDir::new().unwrap();
        let env = Environment::rooted(dir.path());
        assert_eq!(env.find_cookies(), None);

        let cookies = dir.path().join("user").join("yt_cookies.txt");
        std::fs::create_dir_all(cookies.parent().unwrap()).unwrap();
        std::fs::write(&cookies, "# Netscape HTTP Cookie File").unwrap();
        assert_eq!(env.find_cookies(), Some(cookies));
    }

    #[test]
    fn test_load_config_rejects_invalid_values() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let env = Environment::rooted(dir.path());

        std::fs::write(&path, "[crawler]\nmax_pages = 0\n").unwrap();
        assert!(load_config(&path, &env).is_err());

        std::fs::write(&path, "[crawler]\nmax_pages = 7\n").unwrap();
        assert_eq!(load_config(&path, &env).unwrap().crawler.max_pages, 7);
        assert!(load_config(&dir.path().join("missing.toml"), &env).is_ok());
    }

    #[test]
    fn test_meta_worker_override() {
        let env = Environment {
            meta_workers: Some(20),
            ..Environment::default()
        };
        let mut config = Config::default();
        env.apply_overrides(&mut config);
        assert_eq!(config.youtube.meta_workers, 20);

        let env = Environment {
            meta_workers: Some(0),
            ..Environment::default()
        };
        let mut config = Config::default();
        env.apply_overrides(&mut config);
        assert_eq!(config.youtube.meta_workers, 12);
    }
}
