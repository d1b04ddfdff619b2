//! HTML table export for YouTube results.

use std::fmt::Write as _;
use std::path::Path;

use html_escape::{encode_double_quoted_attribute, encode_text};

use super::ensure_parent_dir;
use crate::error::Result;
use crate::models::VideoRecord;

const HEADERS: [&str; 7] = ["제목", "영상 링크", "채널", "채널 링크", "조회수", "구독자", "업로드"];
const CAPTION_HEADER: &str = "자막";

fn link_cell(url: &str) -> String {
    if url.is_empty() {
        "<td></td>".to_string()
    } else {
        format!(
            "<td><a href=\"{}\">{}</a></td>",
            encode_double_quoted_attribute(url),
            encode_text(url)
        )
    }
}

/// Render results as a standalone HTML document.
pub fn render_videos_html(videos: &[VideoRecord], include_captions: bool) -> String {
    let mut html = String::from(
        "<html><head><meta charset='utf-8'></head><body>\n\
         <table border='1' cellspacing='0' cellpadding='6'>\n<tr>",
    );
    for header in HEADERS {
        let _ = write!(html, "<th>{header}</th>");
    }
    if include_captions {
        let _ = write!(html, "<th>{CAPTION_HEADER}</th>");
    }
    html.push_str("</tr>\n");

    for video in videos {
        html.push_str("<tr>");
        let _ = write!(html, "<td>{}</td>", encode_text(&video.title));
        html.push_str(&link_cell(&video.video_link()));
        let _ = write!(html, "<td>{}</td>", encode_text(&video.channel_name));
        html.push_str(&link_cell(&video.channel_link()));
        let _ = write!(
            html,
            "<td>{}</td><td>{}</td><td>{}</td>",
            video.view_count,
            video.subscriber_count,
            encode_text(&video.upload_date_display())
        );
        if include_captions {
            let caption = encode_text(video.caption_text.as_deref().unwrap_or_default());
            let _ = write!(html, "<td>{}</td>", caption.replace('\n', "<br>"));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table></body></html>\n");
    html
}

/// Write results as an HTML table.
pub fn write_videos_html(path: &Path, videos: &[VideoRecord], include_captions: bool) -> Result<()> {
    ensure_parent_dir(path)?;
    std::fs::write(path, render_videos_html(videos, include_captions))?;
    Ok(())
}
