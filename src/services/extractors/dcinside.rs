//! DCInside gallery list extraction.
//!
//! Everything needed lives in the list table, so no detail page is visited.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use scraper::{ElementRef, Html};

use super::{ExtractContext, ItemOutcome, PageExtractor, PageScan};
use crate::browser::BrowserSession;
use crate::error::Result;
use crate::models::{NO_TITLE, PostRecord, Site};
use crate::services::dates::{self, DatePattern};
use crate::utils::{normalize_whitespace, parse_count, parse_selector, resolve};

const POST_ROW: &str = "tr.ub-content.us-post";
const TITLE_LINK: &str = "td.gall_tit a[href]";
const DATE_CELL: &str = "td.gall_date";
const VIEWS_CELL: &str = "td.gall_count";

pub struct DcInsideExtractor;

/// Resolved date of one row and the text recorded for it.
#[derive(Debug, PartialEq, Eq)]
struct RowDate {
    at: NaiveDateTime,
    text: String,
}

fn cell_text(el: ElementRef<'_>) -> String {
    normalize_whitespace(&el.text().collect::<String>())
}

/// Resolve a date cell: full `title` attribute, then `HH:MM`, then `MM.DD`.
fn resolve_date(cell: ElementRef<'_>, now: NaiveDateTime) -> Option<RowDate> {
    let title_attr = cell.value().attr("title").map(str::trim).unwrap_or_default();
    if !title_attr.is_empty() {
        return dates::parse_with(title_attr, &[DatePattern::DashFull], now).map(|at| RowDate {
            at,
            text: title_attr.to_string(),
        });
    }

    let text = cell_text(cell);
    dates::parse_with(&text, &[DatePattern::HourMinute, DatePattern::MonthDay], now).map(|at| {
        RowDate {
            at,
            text: at.format("%Y-%m-%d %H:%M").to_string(),
        }
    })
}

/// Scan a list page. Candidates count rows kept, so a page with nothing
/// recent counts as stale.
fn scan_list(markup: &str, base: &str, ctx: &ExtractContext) -> Result<PageScan> {
    let document = Html::parse_document(markup);
    let row_sel = parse_selector(POST_ROW)?;
    let link_sel = parse_selector(TITLE_LINK)?;
    let date_sel = parse_selector(DATE_CELL)?;
    let views_sel = parse_selector(VIEWS_CELL)?;

    let rows: Vec<ElementRef<'_>> = document.select(&row_sel).collect();
    log::info!("[DC] {} rows on page {}", rows.len(), ctx.page);

    let mut scan = PageScan::default();
    if rows.is_empty() {
        return Ok(scan);
    }

    if ctx.page >= 2 {
        let first = rows[0]
            .select(&date_sel)
            .next()
            .and_then(|cell| resolve_date(cell, ctx.now));
        if let Some(first) = first.filter(|d| d.at < ctx.cutoff) {
            log::info!(
                "[DC] First post on page {} is {} (before cutoff), stopping",
                ctx.page,
                first.text
            );
            scan.found_older = true;
            return Ok(scan);
        }
    }

    for row in rows {
        let Some(anchor) = row.select(&link_sel).next() else {
            scan.outcomes.push(ItemOutcome::Skipped {
                link: String::new(),
                reason: "row without title link".into(),
            });
            continue;
        };
        let link = resolve(base, anchor.value().attr("href").unwrap_or_default());

        let date = row
            .select(&date_sel)
            .next()
            .and_then(|cell| resolve_date(cell, ctx.now));
        let Some(date) = date else {
            scan.outcomes.push(ItemOutcome::Skipped {
                link,
                reason: "unparseable date".into(),
            });
            continue;
        };
        if date.at < ctx.cutoff {
            scan.found_older = true;
            scan.outcomes.push(ItemOutcome::Skipped {
                link,
                reason: format!("older than cutoff ({})", date.text),
            });
            continue;
        }

        let mut title = cell_text(anchor);
        if title.is_empty() {
            title = anchor.value().attr("title").map(str::trim).unwrap_or_default().to_string();
        }
        if title.is_empty() {
            title = NO_TITLE.to_string();
        }
        let views = row
            .select(&views_sel)
            .next()
            .and_then(|cell| parse_count(&cell_text(cell)));

        scan.candidates += 1;
        scan.outcomes.push(ItemOutcome::Collected(PostRecord {
            site: Site::DCInside,
            title,
            date_text: date.text,
            date_iso: Some(date.at),
            views,
            link,
        }));
    }

    Ok(scan)
}

#[async_trait]
impl PageExtractor for DcInsideExtractor {
    fn site(&self) -> Site {
        Site::DCInside
    }

    async fn extract(
        &self,
        session: &mut dyn BrowserSession,
        ctx: &ExtractContext,
    ) -> Result<PageScan> {
        let base = session.current_url().await?;
        let markup = session.page_source().await?;
        scan_list(&markup, &base, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::extractors::fixtures::{self, dc_row as row, dc_table as table};

    const BASE: &str = "https://gall.dcinside.com/board/lists/?id=stock&page=1";

    #[test]
    fn test_keeps_recent_rows_only() {
        let html = table(&[
            row(5, "recent full", "2025-06-15 12:00:00", "12:00", "1,024"),
            row(4, "recent hhmm", "", "09:30", "7"),
            row(3, "recent mmdd", "", "06.15", "3"),
            row(2, "old full", "2025-06-10 08:00:00", "06.10", "9"),
            row(1, "garbled", "", "어제", "1"),
        ]);
        let scan = scan_list(&html, BASE, &fixtures::context(1)).unwrap();

        let posts: Vec<_> = scan.collected().collect();
        assert_eq!(posts.len(), 3);
        assert_eq!(scan.candidates, 3);
        assert!(scan.found_older);

        assert_eq!(posts[0].date_text, "2025-06-15 12:00:00");
        assert_eq!(posts[0].views, Some(1024));
        assert_eq!(
            posts[0].link,
            "https://gall.dcinside.com/board/view/?id=stock&no=5"
        );
        assert_eq!(posts[1].date_text, "2025-06-15 09:30");
        assert_eq!(posts[2].date_text, "2025-06-15 00:00");
        assert_eq!(scan.outcomes.len(), 5);
    }

    #[test]
    fn test_title_attribute_fallback() {
        let html = table(&[r#"<tr class="ub-content us-post">
            <td class="gall_tit"><a href="/v/1" title="attr title"></a></td>
            <td class="gall_date">13:00</td><td class="gall_count">-</td></tr>"#
            .to_string()]);
        let scan = scan_list(&html, BASE, &fixtures::context(1)).unwrap();
        let post = scan.collected().next().unwrap();
        assert_eq!(post.title, "attr title");
        assert_eq!(post.views, None);
    }

    #[test]
    fn test_peek_stops_later_pages() {
        let html = table(&[
            row(2, "old", "2025-06-01 08:00:00", "06.01", "1"),
            row(1, "older", "2025-05-31 08:00:00", "05.31", "1"),
        ]);
        let scan = scan_list(&html, BASE, &fixtures::context(2)).unwrap();
        assert!(scan.found_older);
        assert_eq!(scan.candidates, 0);
        assert!(scan.outcomes.is_empty());
    }

    #[test]
    fn test_empty_page_is_stale() {
        let scan = scan_list("<table></table>", BASE, &fixtures::context(1)).unwrap();
        assert_eq!(scan.candidates, 0);
        assert!(!scan.found_older);
    }
}
