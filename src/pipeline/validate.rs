// src/pipeline/validate.rs

use std::path::Path;

use crate::browser::resolve_driver_path;
use crate::config::Environment;
use crate::error::Result;
use crate::models::Config;
use crate::services::YtDlp;
use crate::utils::log;

/// Validate the configuration file and report external tools.
///
/// Only an unreadable or invalid configuration fails; a missing driver or
/// `yt-dlp` is reported as a warning.
pub fn run_validate(config_path: &Path, env: &Environment) -> Result<Config> {
    log::header("Validating configuration");

    let mut config = match Config::load(config_path).and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => {
            log::error(&format!("{}: {e}", config_path.display()));
            return Err(e);
        }
    };
    env.apply_overrides(&mut config);

    log::success(&format!("Configuration OK: {}", config_path.display()));
    log::sub_item(&format!("Max pages: {}", config.crawler.max_pages));
    log::sub_item(&format!("Stale page limit: {}", config.crawler.stale_page_limit));
    log::sub_item(&format!("Headless: {}", config.crawler.headless));
    log::sub_item(&format!("Page load timeout: {}s", config.crawler.page_load_timeout_secs));
    log::sub_item(&format!("Metadata workers: {}", config.youtube.meta_workers));

    match resolve_driver_path(env) {
        Ok(path) => log::success(&format!("ChromeDriver: {}", path.display())),
        Err(e) => log::warn(&e.to_string()),
    }
    match YtDlp::locate(env.find_cookies()) {
        Ok(_) => log::success("yt-dlp found"),
        Err(e) => log::warn(&e.to_string()),
    }
    log::sub_item(&format!("Caption cache: {}", env.cache_dir.display()));

    Ok(config)
}
