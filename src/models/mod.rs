// src/models/mod.rs

//! Domain models for the crawler application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod license;
mod post;
mod video;

// Re-export all public types
pub use config::{Config, CrawlerConfig, LicenseConfig, LoggingConfig, YoutubeConfig};
pub use license::LicensePayload;
pub use post::{NO_TITLE, PostRecord, Site};
pub use video::{FAILED_TITLE, VideoId, VideoRecord};
