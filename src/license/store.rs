//! Where license tokens are read from and saved to.

use std::fs;
use std::path::PathBuf;

use super::LicenseError;
use crate::config::Environment;

pub const LICENSE_FILE: &str = "license.dat";

/// Token lookup across the environment and the config tiers.
#[derive(Debug, Clone)]
pub struct LicenseStore {
    env: Environment,
}

/// A token and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredToken {
    pub token: String,
    pub source: String,
}

impl LicenseStore {
    pub fn new(env: Environment) -> Self {
        Self { env }
    }

    /// First token found: direct variable, file variable, then `license.dat`
    /// in install, shared and user directories.
    pub fn load(&self) -> Result<StoredToken, LicenseError> {
        if let Some(token) = self.env.license_token.as_deref().map(str::trim)
            && !token.is_empty()
        {
            return Ok(StoredToken {
                token: token.to_string(),
                source: crate::config::LICENSE_ENV.to_string(),
            });
        }

        let explicit = self.env.license_file.iter().cloned();
        let tiers = self.env.search_paths(LICENSE_FILE);
        for path in explicit.chain(tiers) {
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            let token = content.trim();
            if !token.is_empty() {
                log::debug!("License loaded from {}", path.display());
                return Ok(StoredToken {
                    token: token.to_string(),
                    source: path.display().to_string(),
                });
            }
        }

        Err(LicenseError::NotFound)
    }

    /// Save a token to the first tier directory that can be created.
    pub fn save(&self, token: &str) -> Result<PathBuf, LicenseError> {
        let mut last_error = None;
        for dir in self.env.search_dirs() {
            let path = dir.join(LICENSE_FILE);
            match fs::create_dir_all(&dir).and_then(|_| fs::write(&path, token.trim())) {
                Ok(()) => {
                    log::info!("License saved to {}", path.display());
                    return Ok(path);
                }
                Err(e) => {
                    log::debug!("Cannot write {}: {}", path.display(), e);
                    last_error = Some(e.to_string());
                }
            }
        }
        Err(LicenseError::Storage(
            last_error.unwrap_or_else(|| "no writable license directory".into()),
        ))
    }
}
