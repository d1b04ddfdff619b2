// src/services/youtube.rs

//! Keyword search over YouTube with parallel metadata lookups.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::error::Result;
use crate::models::{VideoId, VideoRecord};

/// Source of search results and per-video metadata.
#[async_trait]
pub trait VideoBackend: Send + Sync {
    /// Video ids for a keyword, in search order, at most `max_results`.
    async fn search_ids(&self, keyword: &str, max_results: usize) -> Result<Vec<VideoId>>;

    async fn video_detail(&self, id: &VideoId) -> Result<VideoRecord>;
}

/// Search a keyword and fetch details with at most `workers` lookups in flight.
///
/// Rows come back in search order. A failed lookup becomes a
/// [`VideoRecord::placeholder`] instead of failing the search.
pub async fn search_videos(
    backend: Arc<dyn VideoBackend>,
    keyword: &str,
    max_results: usize,
    workers: usize,
) -> Result<Vec<VideoRecord>> {
    let keyword = keyword.trim();
    if keyword.is_empty() || max_results == 0 {
        return Ok(Vec::new());
    }

    let ids = backend.search_ids(keyword, max_results).await?;
    let ids: Vec<VideoId> = ids.into_iter().take(max_results).collect();
    log::info!("Search '{keyword}' returned {} videos", ids.len());
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let width = workers.clamp(1, ids.len());
    let mut slots: Vec<Option<VideoRecord>> = vec![None; ids.len()];
    let mut failures = 0;

    let mut lookups = stream::iter(ids.clone().into_iter().enumerate())
        .map(|(index, id)| {
            let backend = Arc::clone(&backend);
            async move {
                let result = backend.video_detail(&id).await;
                (index, id, result)
            }
        })
        .buffer_unordered(width);

    while let Some((index, id, result)) = lookups.next().await {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Detail lookup failed for {id}: {e}");
                failures += 1;
                VideoRecord::placeholder(id)
            }
        };
        slots[index] = Some(record);
    }

    if failures > 0 {
        log::warn!("{failures} of {} detail lookups failed", slots.len());
    }

    Ok(slots
        .into_iter()
        .zip(ids)
        .map(|(slot, id)| slot.unwrap_or_else(|| VideoRecord::placeholder(id)))
        .collect())
}
