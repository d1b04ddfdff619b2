// src/pipeline/youtube.rs

//! YouTube search and caption pipelines.

use std::path::PathBuf;
use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::error::{AppError, Result};
use crate::export::{Watermark, write_videos, write_videos_html};
use crate::models::{Config, VideoRecord};
use crate::services::{CaptionRetriever, VideoBackend, search_videos};
use crate::utils::log;

/// Spreadsheet written when no output path is given.
pub const DEFAULT_XLSX: &str = "youtube_results.xlsx";

/// Caption downloads in flight at once.
const CAPTION_CONCURRENCY: usize = 4;

/// One YouTube search run.
#[derive(Debug, Clone)]
pub struct YoutubeJob {
    pub keyword: String,
    /// Result count; the configured default when `None`
    pub count: Option<usize>,
    pub output: Option<PathBuf>,
    pub html: Option<PathBuf>,
    pub include_captions: bool,
}

/// Search, optionally attach captions, and export.
pub async fn run_youtube(
    config: &Config,
    backend: Arc<dyn VideoBackend>,
    captions: Option<&CaptionRetriever>,
    job: &YoutubeJob,
    watermark: Option<&Watermark>,
) -> Result<Vec<VideoRecord>> {
    let keyword = job.keyword.trim();
    if keyword.is_empty() {
        return Err(AppError::validation("search keyword is empty"));
    }
    let include_captions = job.include_captions && captions.is_some();
    let total = if include_captions { 3 } else { 2 };

    log::header(&format!("YouTube search: {keyword}"));
    let count = job.count.unwrap_or(config.youtube.default_results);

    log::step(1, total, &format!("Searching up to {count} videos"));
    let mut videos = search_videos(backend, keyword, count, config.youtube.meta_workers).await?;
    for (i, video) in videos.iter().enumerate() {
        log::sub_item(&format!("{}. {} ({})", i + 1, video.title, video.channel_name));
    }
    if videos.is_empty() {
        log::warn("Search returned no videos; nothing was written");
        return Ok(videos);
    }

    if let Some(retriever) = captions.filter(|_| include_captions) {
        log::step(2, total, "Fetching captions");
        attach_captions(retriever, &mut videos).await;
    }

    log::step(total, total, "Writing results");
    let output = job.output.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_XLSX));
    write_videos(&output, &videos, include_captions, watermark)?;
    log::success(&format!("Saved {} rows to {}", videos.len(), output.display()));
    if let Some(html) = &job.html {
        write_videos_html(html, &videos, include_captions)?;
        log::success(&format!("Saved HTML table to {}", html.display()));
    }

    log::summary(
        "YouTube",
        &[
            ("Keyword", keyword.to_string()),
            ("Videos", videos.len().to_string()),
            ("Captions", if include_captions { "yes" } else { "no" }.to_string()),
            ("Output", output.display().to_string()),
        ],
    );
    Ok(videos)
}

async fn attach_captions(retriever: &CaptionRetriever, videos: &mut [VideoRecord]) {
    let links: Vec<String> = videos.iter().map(VideoRecord::video_link).collect();
    let texts: Vec<String> = stream::iter(links)
        .map(|link| async move { retriever.fetch_caption(&link).await })
        .buffered(CAPTION_CONCURRENCY)
        .collect()
        .await;
    for (video, text) in videos.iter_mut().zip(texts) {
        video.caption_text = Some(text);
    }
}

/// Print the caption text of one video.
pub async fn run_caption(retriever: &CaptionRetriever, video_url: &str) -> String {
    log::header("Caption");
    let text = retriever.fetch_caption(video_url).await;
    log::sub_item(&format!("Cache: {}", retriever.cache_dir().display()));
    text
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;
    use crate::models::VideoId;
    use crate::services::captions::NO_ID;
    use crate::services::youtube::tests::{id, record};
    use crate::services::{TranscriptApi, TranscriptError, TranscriptTrack};

    struct Listing(usize);

    #[async_trait]
    impl VideoBackend for Listing {
        async fn search_ids(&self, _: &str, max_results: usize) -> Result<Vec<VideoId>> {
            Ok((0..self.0.min(max_results)).map(id).collect())
        }

        async fn video_detail(&self, video: &VideoId) -> Result<VideoRecord> {
            Ok(record(video.clone()))
        }
    }

    /// Every video has one Korean line naming its id.
    struct KoreanOnly;

    type Fetched<T> = std::result::Result<T, TranscriptError>;

    #[async_trait]
    impl TranscriptApi for KoreanOnly {
        async fn fetch_transcript(&self, video_id: &VideoId, _: &[&str]) -> Fetched<Option<Vec<String>>> {
            Ok(Some(vec![format!("자막 {video_id}")]))
        }

        async fn list_transcripts(&self, _: &VideoId) -> Fetched<Vec<TranscriptTrack>> {
            Ok(Vec::new())
        }

        async fn fetch_track(
            &self,
            _: &VideoId,
            _: &TranscriptTrack,
            _: Option<&str>,
        ) -> Fetched<Vec<String>> {
            Err(TranscriptError::NotFound)
        }
    }

    fn job(dir: &TempDir, include_captions: bool) -> YoutubeJob {
        YoutubeJob {
            keyword: "러닝".into(),
            count: Some(3),
            output: Some(dir.path().join("yt.xlsx")),
            html: Some(dir.path().join("yt.html")),
            include_captions,
        }
    }

    #[tokio::test]
    async fn test_search_with_captions() {
        let dir = TempDir::new().unwrap();
        let retriever = CaptionRetriever::new(Arc::new(KoreanOnly), dir.path().join("cache"), true);

        let videos = run_youtube(
            &Config::default(),
            Arc::new(Listing(10)),
            Some(&retriever),
            &job(&dir, true),
            None,
        )
        .await
        .unwrap();

        assert_eq!(videos.len(), 3);
        for (n, video) in videos.iter().enumerate() {
            assert_eq!(video.caption_text, Some(format!("자막 {}", id(n))));
        }
        assert!(dir.path().join("yt.xlsx").is_file());
        let html = std::fs::read_to_string(dir.path().join("yt.html")).unwrap();
        assert!(html.contains("자막"));
    }

    #[tokio::test]
    async fn test_search_without_captions_uses_default_count() {
        let dir = TempDir::new().unwrap();
        let job = YoutubeJob {
            count: None,
            html: None,
            ..job(&dir, false)
        };

        let videos = run_youtube(&Config::default(), Arc::new(Listing(10)), None, &job, None)
            .await
            .unwrap();

        assert_eq!(videos.len(), Config::default().youtube.default_results);
        assert!(videos.iter().all(|v| v.caption_text.is_none()));
        assert!(!dir.path().join("yt.html").exists());
    }

    #[tokio::test]
    async fn test_blank_keyword_is_rejected() {
        let dir = TempDir::new().unwrap();
        let job = YoutubeJob {
            keyword: "  ".into(),
            ..job(&dir, false)
        };
        let err = run_youtube(&Config::default(), Arc::new(Listing(3)), None, &job, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_caption_command() {
        let dir = TempDir::new().unwrap();
        let retriever = CaptionRetriever::new(Arc::new(KoreanOnly), dir.path(), true);
        assert_eq!(run_caption(&retriever, "not a link").await, NO_ID);
        assert_eq!(
            run_caption(&retriever, &id(1).watch_url()).await,
            format!("자막 {}", id(1))
        );
    }
}
