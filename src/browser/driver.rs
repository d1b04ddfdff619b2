//! Locating the chromedriver binary.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::Environment;
use crate::error::{AppError, Result};

/// File written by the driver installer into one of the config tiers.
pub const DRIVER_PATH_FILE: &str = "driver_path.json";

#[cfg(windows)]
const DRIVER_BINARY: &str = "chromedriver.exe";
#[cfg(not(windows))]
const DRIVER_BINARY: &str = "chromedriver";

#[derive(Debug, Deserialize)]
struct DriverPathFile {
    #[serde(default)]
    chromedriver_path: Option<PathBuf>,
}

/// Driver configured explicitly, through the environment or a
/// `driver_path.json` in one of the tiers. Configured paths must exist.
pub fn find_configured_driver(env: &Environment) -> Option<PathBuf> {
    if let Some(path) = env.chromedriver_path.as_ref().filter(|p| p.is_file()) {
        return Some(path.clone());
    }

    env.search_paths(DRIVER_PATH_FILE)
        .into_iter()
        .filter(|p| p.is_file())
        .find_map(|p| read_driver_path_file(&p))
}

fn read_driver_path_file(path: &Path) -> Option<PathBuf> {
    let content = fs::read_to_string(path).ok()?;
    let parsed: DriverPathFile = match serde_json::from_str(&content) {
        Ok(parsed) => parsed,
        Err(e) => {
            log::warn!("Ignoring unreadable {}: {}", path.display(), e);
            return None;
        }
    };
    parsed.chromedriver_path.filter(|p| p.is_file())
}

/// Copy a chromedriver binary into `<tier>/drivers/` and record it in that
/// tier's `driver_path.json`.
///
/// Tiers are tried shared, user, then install dir. Returns the installed
/// binary.
pub fn install_driver(env: &Environment, source: &Path) -> Result<PathBuf> {
    if !source.is_file() {
        return Err(AppError::Driver(format!(
            "{} is not a chromedriver binary",
            source.display()
        )));
    }

    let tiers = [&env.shared_dir, &env.user_dir, &env.install_dir];
    let mut last_error = None;
    for base in tiers.into_iter().flatten() {
        match install_into(base, source) {
            Ok(installed) => {
                log::info!("Installed chromedriver to {}", installed.display());
                return Ok(installed);
            }
            Err(e) => {
                log::debug!("Cannot install into {}: {}", base.display(), e);
                last_error = Some(e);
            }
        }
    }
    Err(last_error.unwrap_or_else(|| AppError::Driver("no writable config directory".into())))
}

fn install_into(base: &Path, source: &Path) -> Result<PathBuf> {
    let drivers = base.join("drivers");
    fs::create_dir_all(&drivers)?;
    let target = drivers.join(DRIVER_BINARY);
    fs::copy(source, &target)?;
    make_executable(&target)?;

    let record = serde_json::json!({ "chromedriver_path": target });
    fs::write(base.join(DRIVER_PATH_FILE), serde_json::to_string_pretty(&record)?)?;
    Ok(target)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o755);
    fs::set_permissions(path, permissions)?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_: &Path) -> Result<()> {
    Ok(())
}

/// Resolve the chromedriver binary.
///
/// Order: configured driver, a binary next to the executable, then `PATH`.
pub fn resolve_driver_path(env: &Environment) -> Result<PathBuf> {
    if let Some(path) = find_configured_driver(env) {
        log::debug!("Using configured chromedriver {}", path.display());
        return Ok(path);
    }

    if let Some(bundled) = env
        .install_dir
        .as_ref()
        .map(|dir| dir.join(DRIVER_BINARY))
        .filter(|p| p.is_file())
    {
        return Ok(bundled);
    }

    which::which(DRIVER_BINARY).map_err(|_| {
        AppError::Driver(format!(
            "no {} configured, bundled, or on PATH",
            DRIVER_BINARY
        ))
    })
}
