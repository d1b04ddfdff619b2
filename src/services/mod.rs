//! Service layer for the crawler application.
//!
//! This module contains the business logic for:
//! - Site date parsing (`dates`)
//! - Per-site page extraction (`PageExtractor`)
//! - Paginated community crawls (`CrawlController`)
//! - YouTube search (`search_videos`) and captions (`CaptionRetriever`)

pub mod captions;
pub mod crawler;
pub mod dates;
pub mod extractors;
pub mod youtube;
mod ytdlp;

pub use captions::{CaptionRetriever, TranscriptApi, TranscriptError, TranscriptTrack};
pub use crawler::{CrawlController, CrawlEvent, CrawlOutcome, CrawlRequest, StopReason, look_back};
pub use extractors::{PageExtractor, extractor_for};
pub use youtube::{VideoBackend, search_videos};
pub use ytdlp::YtDlp;
