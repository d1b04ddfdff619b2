// src/pipeline/crawl.rs

//! Community crawl pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDateTime;
use tokio::sync::mpsc;

use crate::browser::BrowserLauncher;
use crate::error::Result;
use crate::export::{Watermark, default_crawl_output, write_posts};
use crate::models::Config;
use crate::services::{CrawlController, CrawlEvent, CrawlOutcome, CrawlRequest};
use crate::utils::log;

/// Run one community crawl and export the rows.
///
/// Returns the written file, or `None` when nothing was collected.
pub async fn run_crawl(
    config: &Config,
    launcher: Arc<dyn BrowserLauncher>,
    request: &CrawlRequest,
    output: Option<PathBuf>,
    watermark: Option<&Watermark>,
) -> Result<Option<PathBuf>> {
    let now = chrono::Local::now().naive_local();
    run_crawl_at(config, launcher, request, output, watermark, now).await
}

/// [`run_crawl`] with an explicit reference time.
pub async fn run_crawl_at(
    config: &Config,
    launcher: Arc<dyn BrowserLauncher>,
    request: &CrawlRequest,
    output: Option<PathBuf>,
    watermark: Option<&Watermark>,
    now: NaiveDateTime,
) -> Result<Option<PathBuf>> {
    log::header(&format!("{} crawl", request.site));
    request.validate()?;

    log::step(1, 2, &format!("Collecting posts from {}", request.list_url.trim()));
    let (tx, rx) = mpsc::unbounded_channel();
    let progress = tokio::spawn(report_progress(rx));

    let controller = CrawlController::new(config.crawler.clone(), launcher).with_events(tx);
    let result = controller.run_at(request, now).await;
    drop(controller);
    let _ = progress.await;
    let outcome = result?;

    if outcome.posts.is_empty() {
        log::warn("No posts matched the look-back window; nothing was written");
        return Ok(None);
    }

    log::step(2, 2, "Writing spreadsheet");
    let path = output.unwrap_or_else(|| default_crawl_output(now));
    write_posts(&path, &outcome.posts, watermark)?;
    log::success(&format!("Saved {} rows to {}", outcome.posts.len(), path.display()));

    log::summary("Crawl", &summary_items(&outcome, &path));
    Ok(Some(path))
}

async fn report_progress(mut rx: mpsc::UnboundedReceiver<CrawlEvent>) {
    let mut collected = 0;
    while let Some(event) = rx.recv().await {
        match event {
            CrawlEvent::PageLoaded { page, .. } => log::info(&format!("Page {page} loaded")),
            CrawlEvent::ItemCollected(post) => {
                collected += 1;
                log::sub_item(&format!("{collected}. {}", post.title));
            }
            CrawlEvent::ItemSkipped { .. } | CrawlEvent::Finished { .. } => {}
        }
    }
}

fn summary_items(outcome: &CrawlOutcome, path: &std::path::Path) -> Vec<(&'static str, String)> {
    let range = match outcome.time_range() {
        Some((oldest, newest)) => format!(
            "{} ~ {}",
            oldest.format("%Y-%m-%d %H:%M"),
            newest.format("%Y-%m-%d %H:%M")
        ),
        None => "-".to_string(),
    };
    vec![
        ("Rows", outcome.posts.len().to_string()),
        ("Skipped", outcome.skipped.to_string()),
        ("Pages", outcome.pages_visited.to_string()),
        ("Cutoff", outcome.cutoff.format("%Y-%m-%d %H:%M").to_string()),
        ("Time range", range),
        ("Output", path.display().to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::browser::testing::FakeBrowser;
    use crate::error::AppError;
    use crate::models::Site;
    use crate::services::extractors::fixtures::{dc_row, dc_table, now};

    const LIST: &str = "https://gall.dcinside.com/board/lists/?id=stock";

    fn config() -> Config {
        let mut config = Config::default();
        config.crawler.request_delay_ms = 0;
        config.crawler.detail_wait_secs = 0;
        config
    }

    fn request(list_url: &str) -> CrawlRequest {
        CrawlRequest {
            site: Site::DCInside,
            list_url: list_url.to_string(),
            look_back: chrono::Duration::hours(24),
        }
    }

    #[tokio::test]
    async fn test_crawl_writes_spreadsheet() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out").join("posts.xlsx");
        let page1 = dc_table(&[
            dc_row(10, "fresh", "2025-06-15 12:00:00", "12:00", "7"),
            dc_row(9, "stale", "2025-06-13 12:00:00", "06.13", "3"),
        ]);
        let browser = FakeBrowser::new([(format!("{LIST}&page=1"), page1)]);

        let written = run_crawl_at(
            &config(),
            Arc::new(browser.clone()),
            &request(LIST),
            Some(out.clone()),
            None,
            now(),
        )
        .await
        .unwrap();

        assert_eq!(written, Some(out.clone()));
        assert!(out.is_file());
    }

    #[tokio::test]
    async fn test_empty_result_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("posts.xlsx");
        let old = dc_table(&[dc_row(9, "stale", "2025-06-13 12:00:00", "06.13", "3")]);
        let browser = FakeBrowser::new([(format!("{LIST}&page=1"), old)]);

        let written = run_crawl_at(&config(), Arc::new(browser), &request(LIST), Some(out.clone()), None, now())
            .await
            .unwrap();

        assert_eq!(written, None);
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_bad_url_fails_before_browser_opens() {
        let browser = FakeBrowser::default();
        let err = run_crawl_at(
            &config(),
            Arc::new(browser.clone()),
            &request("https://theqoo.net/hot"),
            None,
            None,
            now(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(browser.journal.lock().unwrap().opened, 0);
    }
}
