// src/error.rs

//! Error types shared by the crawler, the exporters and the license checks.

use std::fmt;

use thiserror::Error;

use crate::license::LicenseError;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Spreadsheet writing failed
    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input validation error (reported before any work starts)
    #[error("Validation error: {0}")]
    Validation(String),

    /// License verification failed
    #[error("License error: {0}")]
    License(#[from] LicenseError),

    /// ChromeDriver could not be located
    #[error(
        "ChromeDriver not found: {0}\n\
         1) Run `unified-crawler driver install --from <chromedriver>` first.\n\
         2) Or set the CHROMEDRIVER_PATH environment variable.\n\
         3) Or place chromedriver next to the executable."
    )]
    Driver(String),

    /// Browser automation failed
    #[error("Browser error: {0}")]
    Browser(String),

    /// YouTube backend failed
    #[error("YouTube error: {0}")]
    YouTube(String),

    /// A list page could not be crawled
    #[error("Crawl error for {context}: {message}")]
    Crawl { context: String, message: String },
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a browser error.
    pub fn browser(message: impl fmt::Display) -> Self {
        Self::Browser(message.to_string())
    }

    /// Create a YouTube backend error.
    pub fn youtube(message: impl fmt::Display) -> Self {
        Self::YouTube(message.to_string())
    }

    /// Create a crawl error with context.
    pub fn crawl(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Crawl {
            context: context.into(),
            message: message.to_string(),
        }
    }
}
