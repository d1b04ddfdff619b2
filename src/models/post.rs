//! Community post data structure.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Placeholder title used when a detail page yields no title.
pub const NO_TITLE: &str = "제목 없음";

/// A supported community site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Site {
    FMKorea,
    DCInside,
    TheQoo,
}

impl Site {
    /// Display name, also written to the `Site` column.
    pub fn label(self) -> &'static str {
        match self {
            Site::FMKorea => "FMKorea",
            Site::DCInside => "DCInside",
            Site::TheQoo => "TheQoo",
        }
    }

    /// Domain the list URL host must contain.
    pub fn domain(self) -> &'static str {
        match self {
            Site::FMKorea => "fmkorea.com",
            Site::DCInside => "dcinside.com",
            Site::TheQoo => "theqoo.net",
        }
    }

    /// Short prefix used in log lines.
    pub fn tag(self) -> &'static str {
        match self {
            Site::FMKorea => "FMK",
            Site::DCInside => "DC",
            Site::TheQoo => "TQ",
        }
    }

    /// Check whether a URL host belongs to this site.
    pub fn matches_host(self, host: &str) -> bool {
        host.to_lowercase().contains(self.domain())
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Site {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fmkorea" | "fmk" => Ok(Site::FMKorea),
            "dcinside" | "dc" => Ok(Site::DCInside),
            "theqoo" | "tq" => Ok(Site::TheQoo),
            other => Err(AppError::validation(format!(
                "Unsupported community '{other}' (expected fmkorea, dcinside or theqoo)"
            ))),
        }
    }
}

/// One collected community post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostRecord {
    /// Site the post was collected from
    pub site: Site,

    /// Post title
    pub title: String,

    /// Date text as shown by the site
    pub date_text: String,

    /// Parsed timestamp; absent only when parsing failed
    pub date_iso: Option<NaiveDateTime>,

    /// View count
    pub views: Option<u64>,

    /// Full URL to the post
    pub link: String,
}
