//! Result export to spreadsheets and HTML.

mod html;
mod xlsx;

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::error::Result;

pub use html::{render_videos_html, write_videos_html};
pub use xlsx::{Watermark, write_posts, write_videos};

/// Default file name for a community crawl started at `now`.
pub fn default_crawl_file_name(now: NaiveDateTime) -> String {
    format!("크롤링_결과_{}.xlsx", now.format("%Y%m%d_%H%M%S"))
}

/// Default community output: the desktop, else the working directory.
pub fn default_crawl_output(now: NaiveDateTime) -> PathBuf {
    dirs::desktop_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(default_crawl_file_name(now))
}

/// Create the parent directory of an output file.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_file_name() {
        let now = chrono::NaiveDate::from_ymd_opt(2025, 6, 15)
            .unwrap()
            .and_hms_opt(9, 5, 7)
            .unwrap();
        assert_eq!(default_crawl_file_name(now), "크롤링_결과_20250615_090507.xlsx");
    }

    #[test]
    fn test_ensure_parent_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = dir.path().join("a/b/out.xlsx");
        ensure_parent_dir(&target).unwrap();
        assert!(dir.path().join("a/b").is_dir());
        ensure_parent_dir(Path::new("out.xlsx")).unwrap();
    }
}
