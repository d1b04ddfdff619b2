// src/services/crawler.rs

//! Paginated community crawl.
//!
//! [`CrawlController`] walks list pages `1..=max_pages`, lets the site's
//! extractor read each page and stops on the first of:
//!
//! - a page containing a post older than the cutoff (the page is kept whole),
//! - `stale_page_limit` consecutive pages without candidates,
//! - the page ceiling.
//!
//! The browser session is closed on every exit path.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use tokio::sync::mpsc::UnboundedSender;

use super::extractors::{ExtractContext, ItemOutcome, PageExtractor, extractor_for};
use crate::browser::{BrowserLauncher, BrowserSession};
use crate::error::{AppError, Result};
use crate::models::{CrawlerConfig, PostRecord, Site};
use crate::utils::{get_domain, with_query_param};

/// Shortest accepted look-back window.
pub const MIN_LOOK_BACK_HOURS: i64 = 1;

/// Look-back window from whole days and hours.
pub fn look_back(days: i64, hours: i64) -> Result<chrono::Duration> {
    days.checked_mul(24)
        .and_then(|h| h.checked_add(hours))
        .and_then(chrono::Duration::try_hours)
        .ok_or_else(|| AppError::validation(format!("look-back of {days}d {hours}h is out of range")))
}

/// What to crawl.
#[derive(Debug, Clone)]
pub struct CrawlRequest {
    pub site: Site,
    pub list_url: String,
    pub look_back: chrono::Duration,
}

impl CrawlRequest {
    /// Pre-checks run before any browser is started.
    pub fn validate(&self) -> Result<()> {
        let url = self.list_url.trim();
        if url.is_empty() {
            return Err(AppError::validation("list URL is empty"));
        }
        let host = get_domain(url)
            .ok_or_else(|| AppError::validation(format!("'{url}' is not an absolute URL")))?;
        if !self.site.matches_host(&host) {
            return Err(AppError::validation(format!(
                "URL host '{host}' does not belong to {} (expected {})",
                self.site,
                self.site.domain()
            )));
        }
        if self.look_back < chrono::Duration::hours(MIN_LOOK_BACK_HOURS) {
            return Err(AppError::validation("look-back window must be at least 1 hour"));
        }
        Ok(())
    }
}

/// Progress notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlEvent {
    PageLoaded { page: u32, url: String },
    ItemCollected(PostRecord),
    ItemSkipped { link: String, reason: String },
    Finished { rows: usize, pages: u32 },
}

/// Why pagination ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    FoundOlder,
    Stale,
    PageLimit,
}

/// Mutable state of one crawl.
#[derive(Debug)]
pub struct CrawlSession {
    pub cutoff: NaiveDateTime,
    pub current_page: u32,
    pub consecutive_stale_pages: u32,
    pub collected: Vec<PostRecord>,
}

impl CrawlSession {
    fn new(cutoff: NaiveDateTime) -> Self {
        Self {
            cutoff,
            current_page: 1,
            consecutive_stale_pages: 0,
            collected: Vec::new(),
        }
    }
}

/// Result of a finished crawl.
#[derive(Debug)]
pub struct CrawlOutcome {
    pub posts: Vec<PostRecord>,
    pub cutoff: NaiveDateTime,
    pub pages_visited: u32,
    pub skipped: usize,
    pub stop_reason: StopReason,
}

impl CrawlOutcome {
    /// Oldest and newest parsed timestamps among the collected posts.
    pub fn time_range(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let mut dates = self.posts.iter().filter_map(|p| p.date_iso);
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), dt| (lo.min(dt), hi.max(dt))))
    }
}

/// Drives one site crawl through a browser session.
pub struct CrawlController {
    config: CrawlerConfig,
    launcher: Arc<dyn BrowserLauncher>,
    events: Option<UnboundedSender<CrawlEvent>>,
}

impl CrawlController {
    pub fn new(config: CrawlerConfig, launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self {
            config,
            launcher,
            events: None,
        }
    }

    /// Send progress events to `tx`.
    pub fn with_events(mut self, tx: UnboundedSender<CrawlEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    fn emit(&self, event: CrawlEvent) {
        if let Some(tx) = &self.events {
            // A dropped receiver only means nobody is listening any more.
            let _ = tx.send(event);
        }
    }

    /// Crawl relative to the local wall clock.
    pub async fn run(&self, request: &CrawlRequest) -> Result<CrawlOutcome> {
        self.run_at(request, chrono::Local::now().naive_local()).await
    }

    /// Crawl with an explicit reference time.
    pub async fn run_at(&self, request: &CrawlRequest, now: NaiveDateTime) -> Result<CrawlOutcome> {
        request.validate()?;

        let cutoff = now.checked_sub_signed(request.look_back).ok_or_else(|| {
            AppError::validation("look-back window reaches before the supported date range")
        })?;
        log::info!(
            "[{}] cutoff = {}",
            request.site.tag(),
            cutoff.format("%Y-%m-%d %H:%M:%S")
        );

        let extractor = extractor_for(request.site);
        let mut session = self.launcher.open(self.config.headless).await?;

        let result = self
            .paginate(session.as_mut(), extractor.as_ref(), request, now, cutoff)
            .await;

        if let Err(e) = session.close().await {
            log::warn!("[{}] Browser close failed: {}", request.site.tag(), e);
        }

        let outcome = result?;
        self.emit(CrawlEvent::Finished {
            rows: outcome.posts.len(),
            pages: outcome.pages_visited,
        });
        Ok(outcome)
    }

    async fn paginate(
        &self,
        browser: &mut dyn BrowserSession,
        extractor: &dyn PageExtractor,
        request: &CrawlRequest,
        now: NaiveDateTime,
        cutoff: NaiveDateTime,
    ) -> Result<CrawlOutcome> {
        let tag = request.site.tag();
        let delay = Duration::from_millis(self.config.request_delay_ms);
        let mut state = CrawlSession::new(cutoff);
        let mut skipped = 0;
        let mut pages_visited = 0;
        let mut stop_reason = StopReason::PageLimit;

        while state.current_page <= self.config.max_pages {
            let page = state.current_page;
            let url = with_query_param(request.list_url.trim(), "page", &page.to_string())?;
            log::info!("[{tag}] Loading page={page} | {url}");

            browser
                .navigate(&url)
                .await
                .map_err(|e| AppError::crawl(url.clone(), e))?;
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            pages_visited += 1;
            self.emit(CrawlEvent::PageLoaded {
                page,
                url: url.clone(),
            });

            let ctx = ExtractContext {
                cutoff,
                now,
                page,
                detail_wait: Duration::from_secs(self.config.detail_wait_secs),
                delay,
            };
            let scan = extractor.extract(browser, &ctx).await?;

            for outcome in scan.outcomes {
                match outcome {
                    ItemOutcome::Collected(post) => {
                        self.emit(CrawlEvent::ItemCollected(post.clone()));
                        state.collected.push(post);
                    }
                    ItemOutcome::Skipped { link, reason } => {
                        log::debug!("[{tag}] Skipped {link}: {reason}");
                        skipped += 1;
                        self.emit(CrawlEvent::ItemSkipped { link, reason });
                    }
                }
            }

            if scan.found_older {
                log::info!("[{tag}] Older post found, stopping after page {page}");
                stop_reason = StopReason::FoundOlder;
                break;
            }

            if scan.candidates == 0 {
                state.consecutive_stale_pages += 1;
                if state.consecutive_stale_pages >= self.config.stale_page_limit {
                    log::info!(
                        "[{tag}] {} consecutive pages without posts, stopping",
                        state.consecutive_stale_pages
                    );
                    stop_reason = StopReason::Stale;
                    break;
                }
            } else {
                state.consecutive_stale_pages = 0;
            }

            state.current_page += 1;
        }

        log::info!(
            "[{tag}] Collected {} posts from {} pages",
            state.collected.len(),
            pages_visited
        );
        Ok(CrawlOutcome {
            posts: state.collected,
            cutoff,
            pages_visited,
            skipped,
            stop_reason,
        })
    }
}
