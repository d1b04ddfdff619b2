//! Per-site page extraction.
//!
//! Each supported community implements [`PageExtractor`] for its list and
//! detail layouts. The crawl controller loads a list page, hands the session
//! to the site's extractor and applies the shared termination policy to the
//! returned [`PageScan`].
//!
//! Markup is always parsed in synchronous helpers that return owned data, so
//! no parsed document is held across an `.await`.

mod dcinside;
mod fmkorea;
mod theqoo;

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::browser::BrowserSession;
use crate::error::Result;
use crate::models::{PostRecord, Site};

pub use dcinside::DcInsideExtractor;
pub use fmkorea::FmKoreaExtractor;
pub use theqoo::TheQooExtractor;

/// Inputs shared by every extraction on one page.
#[derive(Debug, Clone)]
pub struct ExtractContext {
    /// Oldest timestamp still collected
    pub cutoff: NaiveDateTime,

    /// Reference time for relative dates
    pub now: NaiveDateTime,

    /// 1-based list page number
    pub page: u32,

    /// How long to wait for detail-page elements
    pub detail_wait: Duration,

    /// Pause after each detail navigation
    pub delay: Duration,
}

impl ExtractContext {
    pub(crate) async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// Result of one item on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Collected(PostRecord),
    Skipped { link: String, reason: String },
}

/// Everything an extractor learned from one list page.
#[derive(Debug, Default)]
pub struct PageScan {
    pub outcomes: Vec<ItemOutcome>,

    /// Items found on the page; zero marks the page stale
    pub candidates: usize,

    /// At least one item is strictly older than the cutoff
    pub found_older: bool,
}

impl PageScan {
    pub fn collected(&self) -> impl Iterator<Item = &PostRecord> {
        self.outcomes.iter().filter_map(|o| match o {
            ItemOutcome::Collected(post) => Some(post),
            ItemOutcome::Skipped { .. } => None,
        })
    }
}

/// Extraction logic for one site layout.
#[async_trait]
pub trait PageExtractor: Send + Sync {
    fn site(&self) -> Site;

    /// Extract items from the list page currently loaded in `session`.
    ///
    /// Detail pages may be visited; the session is left wherever the last
    /// navigation went.
    async fn extract(
        &self,
        session: &mut dyn BrowserSession,
        ctx: &ExtractContext,
    ) -> Result<PageScan>;
}

/// Extractor for a site.
pub fn extractor_for(site: Site) -> Box<dyn PageExtractor> {
    match site {
        Site::FMKorea => Box::new(FmKoreaExtractor),
        Site::DCInside => Box::new(DcInsideExtractor),
        Site::TheQoo => Box::new(TheQooExtractor),
    }
}

/// Whether a parsed timestamp falls before the cutoff.
fn is_older(date: Option<NaiveDateTime>, cutoff: NaiveDateTime) -> bool {
    date.is_some_and(|dt| dt < cutoff)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;

    pub fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 15)
            .unwrap()
            .and_hms_opt(13, 45, 0)
            .unwrap()
    }

    pub fn context(page: u32) -> ExtractContext {
        ExtractContext {
            cutoff: now() - chrono::Duration::hours(24),
            now: now(),
            page,
            detail_wait: Duration::ZERO,
            delay: Duration::ZERO,
        }
    }

    /// A DCInside list row; an empty `date_title` leaves the attribute off.
    pub fn dc_row(no: u32, title: &str, date_title: &str, date_text: &str, views: &str) -> String {
        let title_attr = if date_title.is_empty() {
            String::new()
        } else {
            format!(r#" title="{date_title}""#)
        };
        format!(
            r#"<tr class="ub-content us-post">
                <td class="gall_num">{no}</td>
                <td class="gall_tit"><a href="/board/view/?id=stock&no={no}">{title}</a></td>
                <td class="gall_date"{title_attr}>{date_text}</td>
                <td class="gall_count">{views}</td>
            </tr>"#
        )
    }

    pub fn dc_table(rows: &[String]) -> String {
        format!("<table><tbody>{}</tbody></table>", rows.concat())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extractor_dispatch() {
        for site in [Site::FMKorea, Site::DCInside, Site::TheQoo] {
            assert_eq!(extractor_for(site).site(), site);
        }
    }

    #[test]
    fn test_is_older() {
        let ctx = fixtures::context(1);
        assert!(is_older(Some(ctx.cutoff - chrono::Duration::minutes(1)), ctx.cutoff));
        assert!(!is_older(Some(ctx.cutoff), ctx.cutoff));
        assert!(!is_older(None, ctx.cutoff));
    }
}
