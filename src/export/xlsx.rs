//! Excel workbooks.

use std::borrow::Cow;
use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, Worksheet};

use super::ensure_parent_dir;
use crate::error::Result;
use crate::models::{LicensePayload, PostRecord, VideoRecord};

const POST_COLUMNS: [&str; 5] = ["Site", "Title", "Date", "Views", "Link"];
const VIDEO_COLUMNS: [&str; 7] = [
    "title",
    "video_link",
    "channel",
    "channel_link",
    "views",
    "subscribers",
    "upload_date",
];
const CAPTION_COLUMN: &str = "caption";
const META_SHEET: &str = "meta";

/// Longest text Excel stores in one cell, in UTF-16 units.
pub const MAX_CELL_CHARS: usize = 32_767;
const TRUNCATION_MARKER: &str = " …(잘림)";

/// License details written to a hidden `meta` sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watermark {
    pub user: String,
    pub device: String,
    pub exp: String,
}

impl From<&LicensePayload> for Watermark {
    fn from(payload: &LicensePayload) -> Self {
        Self {
            user: payload.owner_identifier().to_string(),
            device: payload.device_id.clone().unwrap_or_default(),
            exp: payload.expiry.clone().unwrap_or_default(),
        }
    }
}

/// Cut text to fit one cell, ending with a marker when shortened.
pub fn cell_text(text: &str) -> Cow<'_, str> {
    if text.encode_utf16().count() <= MAX_CELL_CHARS {
        return Cow::Borrowed(text);
    }
    let budget = MAX_CELL_CHARS - TRUNCATION_MARKER.encode_utf16().count();
    let mut used = 0;
    let end = text
        .char_indices()
        .find(|(_, c)| {
            used += c.len_utf16();
            used > budget
        })
        .map_or(text.len(), |(i, _)| i);
    Cow::Owned(format!("{}{TRUNCATION_MARKER}", &text[..end]))
}

fn write_header(sheet: &mut Worksheet, columns: &[&str]) -> Result<()> {
    let bold = Format::new().set_bold();
    for (col, name) in columns.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, &bold)?;
    }
    sheet.set_freeze_panes(1, 0)?;
    Ok(())
}

fn add_watermark(workbook: &mut Workbook, watermark: &Watermark) -> Result<()> {
    let sheet = workbook.add_worksheet();
    sheet.set_name(META_SHEET)?;
    for (row, (key, value)) in [
        ("user", &watermark.user),
        ("device", &watermark.device),
        ("exp", &watermark.exp),
    ]
    .into_iter()
    .enumerate()
    {
        sheet.write_string(row as u32, 0, key)?;
        sheet.write_string(row as u32, 1, value.as_str())?;
    }
    sheet.set_hidden(true);
    Ok(())
}

fn save(mut workbook: Workbook, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    workbook.save(path)?;
    Ok(())
}

/// Write community posts with the `Site, Title, Date, Views, Link` columns.
pub fn write_posts(path: &Path, posts: &[PostRecord], watermark: Option<&Watermark>) -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    write_header(sheet, &POST_COLUMNS)?;

    for (i, post) in posts.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, post.site.label())?;
        sheet.write_string(row, 1, cell_text(&post.title))?;
        sheet.write_string(row, 2, &post.date_text)?;
        if let Some(views) = post.views {
            sheet.write_number(row, 3, views as f64)?;
        }
        sheet.write_string(row, 4, &post.link)?;
    }
    sheet.set_column_width(1, 60)?;
    sheet.set_column_width(2, 20)?;
    sheet.set_column_width(4, 50)?;

    if let Some(watermark) = watermark {
        add_watermark(&mut workbook, watermark)?;
    }
    save(workbook, path)
}

/// Write YouTube results, adding a `caption` column when requested.
pub fn write_videos(
    path: &Path,
    videos: &[VideoRecord],
    include_captions: bool,
    watermark: Option<&Watermark>,
) -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let mut columns = VIDEO_COLUMNS.to_vec();
    if include_captions {
        columns.push(CAPTION_COLUMN);
    }
    write_header(sheet, &columns)?;

    for (i, video) in videos.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, cell_text(&video.title))?;
        sheet.write_string(row, 1, video.video_link())?;
        sheet.write_string(row, 2, cell_text(&video.channel_name))?;
        sheet.write_string(row, 3, video.channel_link())?;
        sheet.write_number(row, 4, video.view_count as f64)?;
        sheet.write_number(row, 5, video.subscriber_count as f64)?;
        sheet.write_string(row, 6, video.upload_date_display())?;
        if include_captions {
            sheet.write_string(row, 7, cell_text(video.caption_text.as_deref().unwrap_or_default()))?;
        }
    }

    if let Some(watermark) = watermark {
        add_watermark(&mut workbook, watermark)?;
    }
    save(workbook, path)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use tempfile::TempDir;

    use super::*;
    use crate::models::{Site, VideoId};

    fn post() -> PostRecord {
        PostRecord {
            site: Site::DCInside,
            title: "제목".into(),
            date_text: "2025-06-15 09:30".into(),
            date_iso: NaiveDate::from_ymd_opt(2025, 6, 15).unwrap().and_hms_opt(9, 30, 0),
            views: None,
            link: "https://gall.dcinside.com/board/view/?id=stock&no=1".into(),
        }
    }

    #[test]
    fn test_write_posts_with_watermark() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/result.xlsx");
        let watermark = Watermark {
            user: "kim".into(),
            device: "abc".into(),
            exp: "2030-01-01".into(),
        };
        write_posts(&path, &[post(), post()], Some(&watermark)).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_write_videos_with_captions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("videos.xlsx");
        let mut video = VideoRecord::placeholder(VideoId::parse("dQw4w9WgXcQ").unwrap());
        video.caption_text = Some("(자막 없음)".into());
        write_videos(&path, &[video], true, None).unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn test_long_caption_is_cut_to_cell_limit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("long.xlsx");
        let mut video = VideoRecord::placeholder(VideoId::parse("dQw4w9WgXcQ").unwrap());
        video.caption_text = Some("가".repeat(40_000));

        write_videos(&path, &[video], true, None).unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn test_cell_text_limits() {
        let short = "짧은 자막";
        assert!(matches!(cell_text(short), Cow::Borrowed(s) if s == short));

        let exact = "a".repeat(MAX_CELL_CHARS);
        assert_eq!(cell_text(&exact).len(), MAX_CELL_CHARS);

        let emoji = "😀".repeat(MAX_CELL_CHARS);
        let cut = cell_text(&emoji);
        assert!(cut.ends_with(TRUNCATION_MARKER));
        assert!(cut.encode_utf16().count() <= MAX_CELL_CHARS);
    }

    #[test]
    fn test_watermark_from_payload() {
        let payload: LicensePayload = serde_json::from_str(
            r#"{"email":"a@b.c","device":"d1","exp":"2030-01-01","features":[]}"#,
        )
        .unwrap();
        assert_eq!(
            Watermark::from(&payload),
            Watermark {
                user: "a@b.c".into(),
                device: "d1".into(),
                exp: "2030-01-01".into(),
            }
        );
    }
}
