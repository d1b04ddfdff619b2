// src/services/ytdlp.rs

//! YouTube backend built on the `yt-dlp` executable.
//!
//! Search and metadata come from `yt-dlp --dump-single-json`. Caption tracks
//! are listed from the same metadata and downloaded directly in `json3`
//! format, with YouTube's `tlang` parameter for translation.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, LazyLock, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue, REFERER};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tokio::process::Command;

use super::captions::{TranscriptApi, TranscriptError, TranscriptTrack};
use super::youtube::VideoBackend;
use crate::error::{AppError, Result};
use crate::models::{VideoId, VideoRecord};

const BINARY: &str = "yt-dlp";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/128.0 Safari/537.36";
const SOCKET_TIMEOUT_SECS: &str = "10";
/// Videos whose caption track list is kept between lookups.
const SOURCE_CACHE_CAPACITY: usize = 32;

type TranscriptResult<T> = std::result::Result<T, TranscriptError>;

static WATCH_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"v=([0-9A-Za-z_-]{11})").expect("valid regex"));

/// A downloadable caption track.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CaptionSource {
    track: TranscriptTrack,
    url: String,
}

/// Caption track lists of the most recently resolved videos.
#[derive(Debug)]
struct SourceCache<T> {
    capacity: usize,
    entries: HashMap<VideoId, Arc<T>>,
    order: VecDeque<VideoId>,
}

impl<T> SourceCache<T> {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get(&self, id: &VideoId) -> Option<Arc<T>> {
        self.entries.get(id).cloned()
    }

    /// Insert, evicting the oldest entry once full.
    fn insert(&mut self, id: VideoId, value: Arc<T>) {
        if self.entries.insert(id.clone(), value).is_none() {
            self.order.push_back(id);
        }
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }
}

/// `yt-dlp` process wrapper implementing search, metadata and captions.
pub struct YtDlp {
    binary: PathBuf,
    cookies: Option<PathBuf>,
    client: Client,
    sources: Mutex<SourceCache<Vec<CaptionSource>>>,
}

impl YtDlp {
    /// Locate `yt-dlp` on `PATH`.
    pub fn locate(cookies: Option<PathBuf>) -> Result<Self> {
        let binary = which::which(BINARY)
            .map_err(|_| AppError::youtube(format!("{BINARY} not found on PATH")))?;
        Self::with_binary(binary, cookies)
    }

    pub fn with_binary(binary: PathBuf, cookies: Option<PathBuf>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("ko-KR,ko;q=0.9,en-US;q=0.8"),
        );
        headers.insert(REFERER, HeaderValue::from_static("https://www.youtube.com/"));
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(20))
            .build()?;

        Ok(Self {
            binary,
            cookies,
            client,
            sources: Mutex::new(SourceCache::new(SOURCE_CACHE_CAPACITY)),
        })
    }

    async fn dump_json(&self, args: &[&str]) -> Result<Value> {
        let mut command = Command::new(&self.binary);
        command
            .args(["--dump-single-json", "--no-warnings", "--socket-timeout", SOCKET_TIMEOUT_SECS])
            .args(args)
            .kill_on_drop(true);
        if let Some(cookies) = &self.cookies {
            command.arg("--cookies").arg(cookies);
        }

        let output = command.output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("yt-dlp failed");
            return Err(AppError::youtube(message.trim()));
        }
        Ok(serde_json::from_slice(&output.stdout)?)
    }

    async fn video_info(&self, id: &VideoId) -> Result<Value> {
        self.dump_json(&["--skip-download", "--no-playlist", &id.watch_url()])
            .await
    }

    async fn caption_sources(&self, id: &VideoId) -> TranscriptResult<Arc<Vec<CaptionSource>>> {
        if let Some(cached) = self.cached_sources(id) {
            return Ok(cached);
        }
        let info = self
            .video_info(id)
            .await
            .map_err(|e| classify_failure(&e.to_string()))?;
        let sources = Arc::new(parse_caption_sources(&info));
        if let Ok(mut map) = self.sources.lock() {
            map.insert(id.clone(), Arc::clone(&sources));
        }
        Ok(sources)
    }

    fn cached_sources(&self, id: &VideoId) -> Option<Arc<Vec<CaptionSource>>> {
        self.sources.lock().ok()?.get(id)
    }

    async fn download(&self, url: &str) -> TranscriptResult<Vec<String>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_failure(&e.to_string()))?;
        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => return Err(TranscriptError::RateLimited),
            StatusCode::FORBIDDEN => return Err(TranscriptError::Forbidden),
            StatusCode::NOT_FOUND => return Err(TranscriptError::NotFound),
            status if !status.is_success() => {
                return Err(TranscriptError::Other(format!("caption download failed: {status}")));
            }
            _ => {}
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| TranscriptError::Other(e.to_string()))?;
        Ok(json3_segments(&body))
    }
}

#[async_trait]
impl VideoBackend for YtDlp {
    async fn search_ids(&self, keyword: &str, max_results: usize) -> Result<Vec<VideoId>> {
        let query = format!("ytsearch{max_results}:{keyword}");
        let result = self.dump_json(&["--flat-playlist", &query]).await?;
        Ok(search_entry_ids(&result, max_results))
    }

    async fn video_detail(&self, id: &VideoId) -> Result<VideoRecord> {
        let info = self.video_info(id).await?;
        Ok(record_from_info(&info, id))
    }
}

#[async_trait]
impl TranscriptApi for YtDlp {
    async fn fetch_transcript(
        &self,
        video_id: &VideoId,
        languages: &[&str],
    ) -> TranscriptResult<Option<Vec<String>>> {
        let sources = self.caption_sources(video_id).await?;
        for lang in languages {
            for generated in [false, true] {
                let source = sources
                    .iter()
                    .find(|s| s.track.is_generated == generated && s.track.language_code == *lang);
                if let Some(source) = source {
                    return self.download(&source.url).await.map(Some);
                }
            }
        }
        Ok(None)
    }

    async fn list_transcripts(
        &self,
        video_id: &VideoId,
    ) -> TranscriptResult<Vec<TranscriptTrack>> {
        let sources = self.caption_sources(video_id).await?;
        if sources.is_empty() {
            return Err(TranscriptError::NotFound);
        }
        Ok(sources.iter().map(|s| s.track.clone()).collect())
    }

    async fn fetch_track(
        &self,
        video_id: &VideoId,
        track: &TranscriptTrack,
        translate_to: Option<&str>,
    ) -> TranscriptResult<Vec<String>> {
        let sources = self.caption_sources(video_id).await?;
        let source = sources
            .iter()
            .find(|s| s.track == *track)
            .ok_or(TranscriptError::NotFound)?;
        let url = match translate_to {
            Some(lang) => format!("{}&tlang={lang}", source.url),
            None => source.url.clone(),
        };
        self.download(&url).await
    }
}

/// Map a failure message onto the transcript error classes.
fn classify_failure(message: &str) -> TranscriptError {
    if message.contains("429") || message.contains("Too Many Requests") {
        TranscriptError::RateLimited
    } else if message.contains("403") || message.contains("Forbidden") {
        TranscriptError::Forbidden
    } else {
        TranscriptError::Other(message.to_string())
    }
}

/// Video ids from a flat search result, skipping channels and playlists.
fn search_entry_ids(result: &Value, max_results: usize) -> Vec<VideoId> {
    let Some(entries) = result["entries"].as_array() else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            entry["id"]
                .as_str()
                .and_then(VideoId::parse)
                .or_else(|| {
                    let url = entry["url"].as_str()?;
                    let caps = WATCH_PARAM.captures(url)?;
                    VideoId::parse(caps.get(1)?.as_str())
                })
        })
        .take(max_results)
        .collect()
}

fn record_from_info(info: &Value, id: &VideoId) -> VideoRecord {
    let text = |key: &str| info[key].as_str().unwrap_or_default().to_string();
    let channel_name = info["channel"]
        .as_str()
        .or_else(|| info["uploader"].as_str())
        .unwrap_or_default()
        .to_string();
    let thumbnail_url = info["thumbnail"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| id.thumbnail_url());

    VideoRecord {
        video_id: id.clone(),
        title: text("title"),
        channel_name,
        channel_id: text("channel_id"),
        view_count: info["view_count"].as_u64().unwrap_or(0),
        subscriber_count: info["channel_follower_count"].as_u64().unwrap_or(0),
        upload_date: text("upload_date"),
        thumbnail_url,
        caption_text: None,
    }
}

fn json3_url(formats: &Value) -> Option<String> {
    formats
        .as_array()?
        .iter()
        .find(|f| f["ext"] == "json3")
        .and_then(|f| f["url"].as_str())
        .map(str::to_string)
}

/// Caption tracks from video metadata.
///
/// Automatic captions list every translation target as well; only the
/// speech-recognition track itself (no `tlang` in its URL) is kept.
fn parse_caption_sources(info: &Value) -> Vec<CaptionSource> {
    let mut sources = Vec::new();
    for (key, generated) in [("subtitles", false), ("automatic_captions", true)] {
        let Some(tracks) = info[key].as_object() else {
            continue;
        };
        for (language, formats) in tracks {
            if language == "live_chat" {
                continue;
            }
            let Some(url) = json3_url(formats) else {
                continue;
            };
            if generated && url.contains("tlang=") {
                continue;
            }
            let language_code = language.strip_suffix("-orig").unwrap_or(language);
            let track = TranscriptTrack {
                language_code: language_code.to_string(),
                is_generated: generated,
            };
            if !sources.iter().any(|s: &CaptionSource| s.track == track) {
                sources.push(CaptionSource { track, url });
            }
        }
    }
    sources
}

/// Text segments of a `json3` caption document.
fn json3_segments(body: &Value) -> Vec<String> {
    let Some(events) = body["events"].as_array() else {
        return Vec::new();
    };
    events
        .iter()
        .filter_map(|event| event["segs"].as_array())
        .map(|segs| {
            segs.iter()
                .filter_map(|seg| seg["utf8"].as_str())
                .collect::<String>()
        })
        .filter(|text| !text.trim().is_empty())
        .collect()
}
