//! FMKorea list and detail extraction.

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
use crate::utils::{normalize_whitespace, parse_count, parse_selector, resolve};

const VOTED_LINK: &str = ".pc_voted_count.pc_voted_count_plus.pc_voted_count_short";
const TITLE: &str = ".np_18px_span";
const POTEN_BADGE: &str = "h1.np_18px > span.STAR-BEST_T";
const DATE: &str = ".date.m_no";
const VIEWS_LABEL: &str = "조회 수";
const POTEN_PREFIX: &str = "포텐: ";

static POST_LINK: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"/\d{5,}$").expect("valid regex"),
        Regex::new(r"[?&]document_srl=\d+").expect("valid regex"),
    ]
});

pub struct FmKoreaExtractor;

/// Fields read from a post page.
#[derive(Debug, PartialEq, Eq)]
struct Detail {
    title: String,
    date_text: String,
    views: Option<u64>,
}

impl Detail {
    fn placeholder() -> Self {
        Self {
            title: NO_TITLE.to_string(),
            date_text: String::new(),
            views: None,
        }
    }
}

/// Candidate post links on a list page, in page order without duplicates.
fn collect_links(markup: &str, base: &str) -> Result<Vec<String>> {
    let document = Html::parse_document(markup);
    let mut seen = HashSet::new();

    let voted = parse_selector(VOTED_LINK)?;
    let primary: Vec<String> = document
        .select(&voted)
        .filter_map(|el| el.value().attr("href"))
        .map(|href| resolve(base, href))
        .filter(|href| seen.insert(href.clone()))
        .collect();
    if !primary.is_empty() {
        return Ok(primary);
    }

    let anchors = parse_selector("a[href]")?;
    Ok(document
        .select(&anchors)
        .filter_map(|el| el.value().attr("href"))
        .map(|href| resolve(base, href))
        .filter(|href| POST_LINK.iter().any(|re| re.is_match(href)))
        .filter(|href| seen.insert(href.clone()))
        .collect())
}

fn own_text(el: ElementRef<'_>) -> String {
    el.children()
        .filter_map(|child| child.value().as_text().map(|t| String::from(&**t)))
        .collect()
}

/// Read title, date and views; `None` when any of them is missing.
fn parse_detail(markup: &str) -> Result<Option<Detail>> {
    let document = Html::parse_document(markup);
    let title_sel = parse_selector(TITLE)?;
    let badge_sel = parse_selector(POTEN_BADGE)?;
    let date_sel = parse_selector(DATE)?;
    let span_sel = parse_selector("span")?;
    let bold_sel = parse_selector("b")?;

    let Some(title_el) = document.select(&title_sel).next() else {
        return Ok(None);
    };
    let title_text = normalize_whitespace(&title_el.text().collect::<String>());
    let title_text = if title_text.is_empty() {
        NO_TITLE.to_string()
    } else {
        title_text
    };
    let title = if document.select(&badge_sel).next().is_some() {
        format!("{POTEN_PREFIX}{title_text}")
    } else {
        title_text
    };

    let Some(date_el) = document.select(&date_sel).next() else {
        return Ok(None);
    };
    let date_text = normalize_whitespace(&date_el.text().collect::<String>());

    let views_el = document
        .select(&span_sel)
        .filter(|span| own_text(*span).contains(VIEWS_LABEL))
        .find_map(|span| span.select(&bold_sel).next());
    let Some(views_el) = views_el else {
        return Ok(None);
    };
    let views = parse_count(&views_el.text().collect::<String>());

    Ok(Some(Detail {
        title,
        date_text,
        views,
    }))
}

impl FmKoreaExtractor {
    async fn fetch_detail(
        &self,
        session: &mut dyn BrowserSession,
        link: &str,
        ctx: &ExtractContext,
    ) -> Detail {
        let loaded = async {
            session.navigate(link).await?;
            ctx.pause().await;
            session.wait_for(TITLE, ctx.detail_wait).await?;
            let markup = session.page_source().await?;
            parse_detail(&markup)
        }
        .await;

        match loaded {
            Ok(Some(detail)) => detail,
            Ok(None) => {
                log::warn!("[FMK] Detail fields missing: {link}");
                Detail::placeholder()
            }
            Err(e) => {
                log::warn!("[FMK] Detail extraction failed for {link}: {e}");
                Detail::placeholder()
            }
        }
    }
}

#[async_trait]
impl PageExtractor for FmKoreaExtractor {
    fn site(&self) -> Site {
        Site::FMKorea
    }

    async fn extract(
        &self,
        session: &mut dyn BrowserSession,
        ctx: &ExtractContext,
    ) -> Result<PageScan> {
        let base = session.current_url().await?;
        let markup = session.page_source().await?;
        let links = collect_links(&markup, &base)?;
        log::info!("[FMK] {} candidate links", links.len());

        let mut scan = PageScan {
            candidates: links.len(),
            ..PageScan::default()
        };

        for link in links {
            let detail = self.fetch_detail(session, &link, ctx).await;
            let date_iso = dates::parse(&detail.date_text, Site::FMKorea, ctx.now);
            if date_iso.is_none() {
                log::warn!(
                    "[FMK] Unparsed date '{}' kept without timestamp: {link}",
                    detail.date_text
                );
            }
            scan.found_older |= is_older(date_iso, ctx.cutoff);
            scan.outcomes.push(ItemOutcome::Collected(PostRecord {
                site: Site::FMKorea,
                title: detail.title,
                date_text: detail.date_text,
                date_iso,
                views: detail.views,
                link,
            }));
        }

        Ok(scan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::testing::FakeBrowser;
    use crate::services::extractors::fixtures;

    const BASE: &str = "https://www.fmkorea.com/best?page=1";

    fn detail_page(title: &str, date: &str, views: &str, poten: bool) -> String {
        let badge = if poten {
            r#"<span class="STAR-BEST_T">포텐</span>"#
        } else {
            ""
        };
        format!(
            r#"<html><body>
            <h1 class="np_18px">{badge}<span class="np_18px_span">{title}</span></h1>
            <span class="date m_no">{date}</span>
            <div class="side fr"><span>조회 수 <b>{views}</b></span></div>
            </body></html>"#
        )
    }

    #[test]
    fn test_primary_selector_links() {
        let html = r#"
            <a class="pc_voted_count pc_voted_count_plus pc_voted_count_short" href="/8123456789">1</a>
            <a class="pc_voted_count pc_voted_count_plus pc_voted_count_short" href="/8123456789">dup</a>
            <a class="pc_voted_count pc_voted_count_plus pc_voted_count_short" href="/8123450000">2</a>
            <a href="/8999999999">ignored while primary matches</a>"#;
        assert_eq!(
            collect_links(html, BASE).unwrap(),
            vec![
                "https://www.fmkorea.com/8123456789",
                "https://www.fmkorea.com/8123450000"
            ]
        );
    }

    #[test]
    fn test_fallback_link_patterns() {
        let html = r#"
            <a href="/index.php?mid=best&document_srl=7001">q</a>
            <a href="/7777777">path</a>
            <a href="/best?page=2">pager</a>
            <a href="/1234">too short</a>
            <a href="/7777777">dup</a>"#;
        assert_eq!(
            collect_links(html, BASE).unwrap(),
            vec![
                "https://www.fmkorea.com/index.php?mid=best&document_srl=7001",
                "https://www.fmkorea.com/7777777"
            ]
        );
    }

    #[test]
    fn test_parse_detail_with_poten_badge() {
        let html = detail_page("오늘의 글", "2025.06.15 09:10", "1,234", true);
        assert_eq!(
            parse_detail(&html).unwrap(),
            Some(Detail {
                title: "포텐: 오늘의 글".into(),
                date_text: "2025.06.15 09:10".into(),
                views: Some(1234),
            })
        );
    }

    #[test]
    fn test_parse_detail_missing_fields() {
        assert_eq!(parse_detail("<html><body>deleted</body></html>").unwrap(), None);
    }

    #[tokio::test]
    async fn test_extract_keeps_page_and_flags_older() {
        let list = r#"<a href="/8000000001">a</a><a href="/8000000002">b</a><a href="/8000000003">c</a>"#;
        let browser = FakeBrowser::new([
            (BASE.to_string(), list.to_string()),
            (
                "https://www.fmkorea.com/8000000001".to_string(),
                detail_page("new", "2025.06.15 10:00", "10", false),
            ),
            (
                "https://www.fmkorea.com/8000000002".to_string(),
                detail_page("old", "2025.06.01 10:00", "20", false),
            ),
            (
                "https://www.fmkorea.com/8000000003".to_string(),
                detail_page("odd date", "어제", "30", false),
            ),
        ]);
        let mut session = browser.session();
        session.navigate(BASE).await.unwrap();

        let scan = FmKoreaExtractor
            .extract(&mut session, &fixtures::context(1))
            .await
            .unwrap();
        assert_eq!(scan.candidates, 3);
        assert!(scan.found_older);

        let posts: Vec<_> = scan.collected().collect();
        assert_eq!(posts.len(), 3);
        assert_eq!(posts[1].title, "old");
        assert!(posts[2].date_iso.is_none());
        assert_eq!(posts[2].date_text, "어제");
    }

    #[tokio::test]
    async fn test_failed_detail_becomes_placeholder() {
        let list = r#"<a href="/8000000009">gone</a>"#;
        let browser = FakeBrowser::new([(BASE.to_string(), list.to_string())]);
        let mut session = browser.session();
        session.navigate(BASE).await.unwrap();

        let scan = FmKoreaExtractor
            .extract(&mut session, &fixtures::context(1))
            .await
            .unwrap();
        let posts: Vec<_> = scan.collected().collect();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, NO_TITLE);
        assert_eq!(posts[0].date_text, "");
        assert_eq!(posts[0].views, None);
        assert!(!scan.found_older);
    }
}
