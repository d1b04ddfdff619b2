//! TheQoo list and detail extraction.

use std::collections::HashSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html};

use super::{ExtractContext, ItemOutcome, PageExtractor, PageScan, is_older};
use crate::browser::BrowserSession;
use crate::error::Result;
use crate::models::{NO_TITLE, PostRecord, Site};
use crate::services::dates;
use crate::utils::{normalize_whitespace, numeric_tokens, parse_selector, resolve};

const TITLE_CANDIDATES: [&str; 5] = ["h1.title", ".title h1", ".title", "h1", "h2"];
const DATE_CANDIDATES: [&str; 5] = [".side.fr span", ".date", ".regdate", ".time", "time[datetime]"];
const NOTICE_MARKER: &str = "공지";

static DOT_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{4}\.\d{2}\.\d{2}\s+\d{2}:\d{2}").expect("valid regex")
});

pub struct TheQooExtractor;

#[derive(Debug, PartialEq, Eq)]
struct Detail {
    title: String,
    date_text: String,
    views: Option<u64>,
}

fn text_of(el: ElementRef<'_>) -> String {
    normalize_whitespace(&el.text().collect::<String>())
}

/// Detail links from the list, skipping notice rows.
fn collect_links(markup: &str, base: &str) -> Result<Vec<String>> {
    let document = Html::parse_document(markup);
    let title_cell = parse_selector("td.title")?;
    let notice = parse_selector("td.no strong")?;
    let anchor = parse_selector("a[href]:not(.replyNum)")?;

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for cell in document.select(&title_cell) {
        let row = cell
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "tr");
        let is_notice = row
            .and_then(|tr| tr.select(&notice).next())
            .is_some_and(|strong| text_of(strong).contains(NOTICE_MARKER));
        if is_notice {
            continue;
        }

        let Some(href) = cell.select(&anchor).next().and_then(|a| a.value().attr("href")) else {
            continue;
        };
        let href = resolve(base, href);
        if seen.insert(href.clone()) {
            links.push(href);
        }
    }
    Ok(links)
}

fn parse_detail(markup: &str) -> Result<Detail> {
    let document = Html::parse_document(markup);

    let mut title = String::new();
    for candidate in TITLE_CANDIDATES {
        let sel = parse_selector(candidate)?;
        if let Some(text) = document.select(&sel).next().map(text_of)
            && !text.is_empty()
        {
            title = text;
            break;
        }
    }
    if title.is_empty() {
        title = NO_TITLE.to_string();
    }

    let mut date_text = String::new();
    for candidate in DATE_CANDIDATES {
        let sel = parse_selector(candidate)?;
        if let Some(el) = document.select(&sel).next() {
            let text = el
                .value()
                .attr("datetime")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| text_of(el));
            if !text.is_empty() {
                date_text = text;
                break;
            }
        }
    }
    if date_text.is_empty()
        && let Some(m) = DOT_TIMESTAMP.find(markup)
    {
        date_text = m.as_str().to_string();
    }

    let counter = parse_selector(".count_container")?;
    let views = document
        .select(&counter)
        .next()
        .and_then(|el| numeric_tokens(&text_of(el)).first().copied())
        .or_else(|| numeric_tokens(markup).into_iter().max());

    Ok(Detail {
        title,
        date_text,
        views,
    })
}

#[async_trait]
impl PageExtractor for TheQooExtractor {
    fn site(&self) -> Site {
        Site::TheQoo
    }

    async fn extract(
        &self,
        session: &mut dyn BrowserSession,
        ctx: &ExtractContext,
    ) -> Result<PageScan> {
        let base = session.current_url().await?;
        let markup = session.page_source().await?;
        let links = collect_links(&markup, &base)?;
        log::info!("[TQ] {} detail links (notices excluded)", links.len());

        let mut scan = PageScan {
            candidates: links.len(),
            ..PageScan::default()
        };
        let total = links.len();

        for (i, link) in links.into_iter().enumerate() {
            let loaded = async {
                session.navigate(&link).await?;
                ctx.pause().await;
                session.wait_for("body", ctx.detail_wait).await?;
                let markup = session.page_source().await?;
                parse_detail(&markup)
            }
            .await;

            let detail = match loaded {
                Ok(detail) => detail,
                Err(e) => {
                    log::warn!("[TQ] Detail parse failed for {link}: {e}");
                    scan.outcomes.push(ItemOutcome::Skipped {
                        link,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let date_iso = dates::parse(&detail.date_text, Site::TheQoo, ctx.now);
            scan.found_older |= is_older(date_iso, ctx.cutoff);
            scan.outcomes.push(ItemOutcome::Collected(PostRecord {
                site: Site::TheQoo,
                title: detail.title,
                date_text: detail.date_text,
                date_iso,
                views: detail.views,
                link,
            }));

            let done = i + 1;
            if done % 10 == 0 || done == total {
                log::info!("[TQ] Progress {done}/{total}");
            }
        }

        Ok(scan)
    }
}
