// src/services/captions.rs

//! Transcript retrieval with a per-video disk cache.
//!
//! Korean tracks are preferred. Otherwise manual tracks, then auto-generated
//! ones, are tried per language group and translated to Korean. Every outcome,
//! including failure markers, is cached so a video is resolved at most once.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use unicode_segmentation::UnicodeSegmentation;

use crate::models::VideoId;

/// Returned when the input names no video.
pub const NO_ID: &str = "[NO_ID]";
/// Returned when no usable track exists.
pub const NO_CAPTIONS: &str = "(자막 없음)";
pub const COOLDOWN: &str = "[COOLDOWN:429]";
pub const FORBIDDEN: &str = "[FORBIDDEN:403]";
const ERROR_PREFIX: &str = "[ERROR] ";
const ERROR_MESSAGE_LIMIT: usize = 200;

const KOREAN: [&str; 2] = ["ko", "ko-KR"];
const TARGET_LANGUAGE: &str = "ko";

/// Fallback languages, tried in this order.
const LANGUAGE_GROUPS: [&[&str]; 4] = [
    &["en", "en-US", "en-GB"],
    &["ja"],
    &["zh-Hans", "zh-Hant", "zh"],
    &["es", "es-419"],
];

/// Transcript backend failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("no transcript available")]
    NotFound,

    #[error("too many requests (429)")]
    RateLimited,

    #[error("forbidden (403)")]
    Forbidden,

    #[error("{0}")]
    Other(String),
}

/// One caption track offered for a video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptTrack {
    pub language_code: String,
    pub is_generated: bool,
}

/// Access to YouTube caption tracks.
#[async_trait]
pub trait TranscriptApi: Send + Sync {
    /// Segments of the first track, manual or generated, in one of `languages`.
    async fn fetch_transcript(
        &self,
        video_id: &VideoId,
        languages: &[&str],
    ) -> Result<Option<Vec<String>>, TranscriptError>;

    async fn list_transcripts(
        &self,
        video_id: &VideoId,
    ) -> Result<Vec<TranscriptTrack>, TranscriptError>;

    /// Segments of a track, machine-translated when `translate_to` is set.
    async fn fetch_track(
        &self,
        video_id: &VideoId,
        track: &TranscriptTrack,
        translate_to: Option<&str>,
    ) -> Result<Vec<String>, TranscriptError>;
}

/// Cached caption lookups.
pub struct CaptionRetriever {
    api: Arc<dyn TranscriptApi>,
    cache_dir: PathBuf,
    allow_non_korean: bool,
}

impl CaptionRetriever {
    pub fn new(api: Arc<dyn TranscriptApi>, cache_dir: impl Into<PathBuf>, allow_non_korean: bool) -> Self {
        Self {
            api,
            cache_dir: cache_dir.into(),
            allow_non_korean,
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn cache_path(&self, id: &VideoId) -> PathBuf {
        self.cache_dir.join(format!("{id}.txt"))
    }

    /// Caption text for a video URL or bare id.
    ///
    /// Never fails: problems are reported as marker strings such as
    /// [`COOLDOWN`] and cached like any other result.
    pub async fn fetch_caption(&self, video_url: &str) -> String {
        let Some(id) = VideoId::from_url(video_url) else {
            return NO_ID.to_string();
        };

        let path = self.cache_path(&id);
        if let Ok(cached) = tokio::fs::read_to_string(&path).await {
            log::debug!("Caption cache hit for {id}");
            return cached;
        }

        let text = match self.resolve(&id).await {
            Ok(Some(segments)) => join_segments(&segments),
            Ok(None) | Err(TranscriptError::NotFound) => NO_CAPTIONS.to_string(),
            Err(e) => failure_marker(&e),
        };

        if let Err(e) = self.store(&path, &text).await {
            log::warn!("Caption cache write failed for {id}: {e}");
        }
        text
    }

    async fn store(&self, path: &Path, text: &str) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;
        tokio::fs::write(path, text).await
    }

    async fn resolve(&self, id: &VideoId) -> Result<Option<Vec<String>>, TranscriptError> {
        match self.api.fetch_transcript(id, &KOREAN).await {
            Ok(Some(segments)) if !segments.is_empty() => return Ok(Some(segments)),
            Ok(_) | Err(TranscriptError::NotFound) => {}
            Err(e) => return Err(e),
        }

        let tracks = self.api.list_transcripts(id).await?;
        for generated in [false, true] {
            for group in LANGUAGE_GROUPS {
                let Some(track) = pick_track(&tracks, group, generated) else {
                    continue;
                };
                if let Some(segments) = self.fetch_translated(id, track).await? {
                    return Ok(Some(segments));
                }
            }
        }
        Ok(None)
    }

    /// Translate a track to Korean, falling back to the original language.
    async fn fetch_translated(
        &self,
        id: &VideoId,
        track: &TranscriptTrack,
    ) -> Result<Option<Vec<String>>, TranscriptError> {
        match self.api.fetch_track(id, track, Some(TARGET_LANGUAGE)).await {
            Ok(segments) if !segments.is_empty() => return Ok(Some(segments)),
            Err(e @ (TranscriptError::RateLimited | TranscriptError::Forbidden)) => return Err(e),
            Ok(_) | Err(_) => {}
        }
        if !self.allow_non_korean {
            return Ok(None);
        }
        match self.api.fetch_track(id, track, None).await {
            Ok(segments) if !segments.is_empty() => Ok(Some(segments)),
            Err(e @ (TranscriptError::RateLimited | TranscriptError::Forbidden)) => Err(e),
            Ok(_) | Err(_) => Ok(None),
        }
    }
}

/// First track matching the group's languages in priority order.
fn pick_track<'a>(
    tracks: &'a [TranscriptTrack],
    languages: &[&str],
    generated: bool,
) -> Option<&'a TranscriptTrack> {
    languages.iter().find_map(|lang| {
        tracks
            .iter()
            .find(|t| t.is_generated == generated && t.language_code == *lang)
    })
}

fn join_segments(segments: &[String]) -> String {
    segments
        .iter()
        .filter(|s| !s.trim().is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n")
}

fn failure_marker(error: &TranscriptError) -> String {
    match error {
        TranscriptError::RateLimited => COOLDOWN.to_string(),
        TranscriptError::Forbidden => FORBIDDEN.to_string(),
        TranscriptError::NotFound => NO_CAPTIONS.to_string(),
        TranscriptError::Other(message) => {
            let truncated: String = message.graphemes(true).take(ERROR_MESSAGE_LIMIT).collect();
            format!("{ERROR_PREFIX}{truncated}")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use tempfile::TempDir;

    use super::*;

    const ID: &str = "dQw4w9WgXcQ";

    /// Counts calls and serves canned answers.
    #[derive(Default)]
    struct FakeApi {
        korean: Option<Result<Option<Vec<String>>, TranscriptError>>,
        tracks: Vec<TranscriptTrack>,
        /// (language, translated) -> segments; missing keys fail
        segments: HashMap<(String, bool), Vec<String>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeApi {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn track(lang: &str, generated: bool) -> TranscriptTrack {
        TranscriptTrack {
            language_code: lang.into(),
            is_generated: generated,
        }
    }

    #[async_trait]
    impl TranscriptApi for FakeApi {
        async fn fetch_transcript(
            &self,
            _: &VideoId,
            _: &[&str],
        ) -> Result<Option<Vec<String>>, TranscriptError> {
            self.calls.lock().unwrap().push("ko".into());
            self.korean.clone().unwrap_or(Ok(None))
        }

        async fn list_transcripts(&self, _: &VideoId) -> Result<Vec<TranscriptTrack>, TranscriptError> {
            self.calls.lock().unwrap().push("list".into());
            Ok(self.tracks.clone())
        }

        async fn fetch_track(
            &self,
            _: &VideoId,
            track: &TranscriptTrack,
            translate_to: Option<&str>,
        ) -> Result<Vec<String>, TranscriptError> {
            let translated = translate_to.is_some();
            self.calls.lock().unwrap().push(format!(
                "{}{}{}",
                track.language_code,
                if track.is_generated { "(auto)" } else { "" },
                if translated { "->ko" } else { "" }
            ));
            self.segments
                .get(&(track.language_code.clone(), translated))
                .cloned()
                .ok_or_else(|| TranscriptError::Other("translation unavailable".into()))
        }
    }

    fn retriever(api: &Arc<FakeApi>, dir: &TempDir, allow_non_korean: bool) -> CaptionRetriever {
        CaptionRetriever::new(api.clone(), dir.path().join("transcripts"), allow_non_korean)
    }

    #[tokio::test]
    async fn test_korean_track_joined_and_cached() {
        let dir = TempDir::new().unwrap();
        let api = Arc::new(FakeApi {
            korean: Some(Ok(Some(vec!["안녕".into(), "  ".into(), "하세요".into()]))),
            ..FakeApi::default()
        });
        let captions = retriever(&api, &dir, true);

        let url = format!("https://youtu.be/{ID}");
        assert_eq!(captions.fetch_caption(&url).await, "안녕\n하세요");
        assert_eq!(captions.fetch_caption(ID).await, "안녕\n하세요");
        assert_eq!(api.calls(), vec!["ko"]);
        assert!(dir.path().join("transcripts").join(format!("{ID}.txt")).is_file());
    }

    #[tokio::test]
    async fn test_sentinel_is_cached_too() {
        let dir = TempDir::new().unwrap();
        let api = Arc::new(FakeApi {
            korean: Some(Err(TranscriptError::RateLimited)),
            ..FakeApi::default()
        });
        let captions = retriever(&api, &dir, true);

        assert_eq!(captions.fetch_caption(ID).await, COOLDOWN);
        assert_eq!(captions.fetch_caption(ID).await, COOLDOWN);
        assert_eq!(api.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_manual_tracks_before_generated() {
        let dir = TempDir::new().unwrap();
        let api = Arc::new(FakeApi {
            tracks: vec![track("en", true), track("ja", false)],
            segments: HashMap::from([
                (("ja".to_string(), true), vec!["번역됨".to_string()]),
                (("en".to_string(), true), vec!["auto".to_string()]),
            ]),
            ..FakeApi::default()
        });
        let captions = retriever(&api, &dir, true);

        assert_eq!(captions.fetch_caption(ID).await, "번역됨");
        assert_eq!(api.calls(), vec!["ko", "list", "ja->ko"]);
    }

    #[tokio::test]
    async fn test_untranslated_fallback_is_optional() {
        let segments = HashMap::from([(("es".to_string(), false), vec!["hola".to_string()])]);

        let dir = TempDir::new().unwrap();
        let api = Arc::new(FakeApi {
            tracks: vec![track("es-419", false), track("es", false)],
            segments: segments.clone(),
            ..FakeApi::default()
        });
        assert_eq!(retriever(&api, &dir, true).fetch_caption(ID).await, "hola");
        assert_eq!(api.calls(), vec!["ko", "list", "es->ko", "es"]);

        let dir = TempDir::new().unwrap();
        let api = Arc::new(FakeApi {
            tracks: vec![track("es", false)],
            segments,
            ..FakeApi::default()
        });
        assert_eq!(retriever(&api, &dir, false).fetch_caption(ID).await, NO_CAPTIONS);
    }

    #[tokio::test]
    async fn test_cached_empty_value_returned_as_is() {
        let dir = TempDir::new().unwrap();
        let api = Arc::new(FakeApi::default());
        let captions = retriever(&api, &dir, true);
        std::fs::create_dir_all(captions.cache_dir()).unwrap();
        std::fs::write(captions.cache_dir().join(format!("{ID}.txt")), "").unwrap();

        assert_eq!(captions.fetch_caption(ID).await, "");
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_id_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let api = Arc::new(FakeApi::default());
        let captions = retriever(&api, &dir, true);

        assert_eq!(captions.fetch_caption("https://example.com/").await, NO_ID);
        assert!(!captions.cache_dir().exists());
    }

    #[test]
    fn test_failure_markers() {
        assert_eq!(failure_marker(&TranscriptError::Forbidden), FORBIDDEN);
        let long = "가".repeat(300);
        let marker = failure_marker(&TranscriptError::Other(long));
        assert_eq!(marker.chars().count(), ERROR_PREFIX.len() + 200);
    }
}
