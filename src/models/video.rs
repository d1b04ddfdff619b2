//! YouTube video data structures.

use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Title used for rows whose detail lookup failed.
pub const FAILED_TITLE: &str = "(불러오기 실패)";

static ID_IN_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:v=|/shorts/|/embed/|youtu\.be/)([0-9A-Za-z_-]{11})").expect("valid regex")
});

/// An 11-character YouTube video identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VideoId(String);

impl VideoId {
    /// Validate a bare identifier.
    pub fn parse(s: &str) -> Option<Self> {
        let valid = s.len() == 11
            && s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        valid.then(|| Self(s.to_string()))
    }

    /// Extract an identifier from a watch, shorts, embed or short link, or a bare id.
    pub fn from_url(url: &str) -> Option<Self> {
        ID_IN_URL
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| Self(m.as_str().to_string()))
            .or_else(|| Self::parse(url.trim()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }

    pub fn thumbnail_url(&self) -> String {
        format!("https://img.youtube.com/vi/{}/hqdefault.jpg", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for VideoId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid video id: {value}"))
    }
}

impl From<VideoId> for String {
    fn from(id: VideoId) -> Self {
        id.0
    }
}

/// One YouTube search result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoRecord {
    pub video_id: VideoId,
    pub title: String,
    pub channel_name: String,
    pub channel_id: String,
    pub view_count: u64,
    pub subscriber_count: u64,
    /// Upload date as reported by YouTube (`YYYYMMDD`)
    pub upload_date: String,
    pub thumbnail_url: String,
    /// Transcript text, loaded lazily
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption_text: Option<String>,
}

impl VideoRecord {
    /// Placeholder row for a video whose details could not be fetched.
    pub fn placeholder(video_id: VideoId) -> Self {
        Self {
            thumbnail_url: video_id.thumbnail_url(),
            video_id,
            title: FAILED_TITLE.to_string(),
            channel_name: String::new(),
            channel_id: String::new(),
            view_count: 0,
            subscriber_count: 0,
            upload_date: String::new(),
            caption_text: None,
        }
    }

    pub fn video_link(&self) -> String {
        self.video_id.watch_url()
    }

    pub fn channel_link(&self) -> String {
        if self.channel_id.is_empty() {
            String::new()
        } else {
            format!("https://www.youtube.com/channel/{}", self.channel_id)
        }
    }

    /// Upload date as `YYYY-MM-DD 00:00:00`, or the raw value if it is not `YYYYMMDD`.
    pub fn upload_date_display(&self) -> String {
        if self.upload_date.is_empty() {
            return String::new();
        }
        NaiveDate::parse_from_str(&self.upload_date, "%Y%m%d")
            .map(|d| d.format("%Y-%m-%d 00:00:00").to_string())
            .unwrap_or_else(|_| self.upload_date.clone())
    }
}
