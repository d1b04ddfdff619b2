//! Utility functions and helpers.

pub mod log;

use std::sync::LazyLock;

use regex::Regex;
use scraper::Selector;
use url::Url;

use crate::error::{AppError, Result};

static NUMERIC_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,3}(?:,\d{3})*|\d+").expect("valid regex"));

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Resolve a URL string against a base URL string.
pub fn resolve(base_url: &str, href: &str) -> String {
    match Url::parse(base_url) {
        Ok(base) => resolve_url(&base, href),
        Err(_) => href.to_string(),
    }
}

/// Extract the lowercase host from a URL string.
pub fn get_domain(url_str: &str) -> Option<String> {
    Url::parse(url_str)
        .ok()
        .and_then(|u| u.host_str().map(|s| s.to_lowercase()))
}

/// Add a query parameter, replacing an existing one in place.
pub fn with_query_param(url_str: &str, key: &str, value: &str) -> Result<String> {
    let mut url = Url::parse(url_str)?;
    let mut replaced = false;
    let mut pairs: Vec<(String, String)> = Vec::new();
    for (k, v) in url.query_pairs() {
        if k == key {
            if !replaced {
                pairs.push((k.into_owned(), value.to_string()));
                replaced = true;
            }
            continue;
        }
        pairs.push((k.into_owned(), v.into_owned()));
    }
    if !replaced {
        pairs.push((key.to_string(), value.to_string()));
    }

    url.query_pairs_mut().clear().extend_pairs(pairs);
    Ok(url.to_string())
}

/// Parse a CSS selector, mapping failures into [`AppError::Selector`].
pub fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a count such as `"1,234"` or `"조회 56"` by keeping only the digits.
pub fn parse_count(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// All numeric tokens in a text, with thousands separators removed.
pub fn numeric_tokens(text: &str) -> Vec<u64> {
    NUMERIC_TOKEN
        .find_iter(text)
        .filter_map(|m| parse_count(m.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("https://example.com/path/").unwrap();
        assert_eq!(
            resolve_url(&base, "page.html"),
            "https://example.com/path/page.html"
        );
        assert_eq!(
            resolve_url(&base, "/root.html"),
            "https://example.com/root.html"
        );
        assert_eq!(
            resolve_url(&base, "https://other.com/x"),
            "https://other.com/x"
        );
    }

    #[test]
    fn test_get_domain() {
        assert_eq!(
            get_domain("https://gall.DCInside.com/board/lists?id=x"),
            Some("gall.dcinside.com".to_string())
        );
        assert_eq!(get_domain("not a url"), None);
    }

    #[test]
    fn test_with_query_param_appends() {
        assert_eq!(
            with_query_param("https://www.fmkorea.com/best", "page", "2").unwrap(),
            "https://www.fmkorea.com/best?page=2"
        );
    }

    #[test]
    fn test_with_query_param_replaces_in_place() {
        assert_eq!(
            with_query_param(
                "https://gall.dcinside.com/board/lists/?id=stock&page=1&list_num=50",
                "page",
                "7"
            )
            .unwrap(),
            "https://gall.dcinside.com/board/lists/?id=stock&page=7&list_num=50"
        );
    }

    #[test]
    fn test_with_query_param_rejects_relative() {
        assert!(with_query_param("/board/lists", "page", "1").is_err());
    }

    #[test]
    fn test_parse_selector_valid() {
        assert!(parse_selector("tr.ub-content.us-post").is_ok());
        assert!(parse_selector("a[href]:not(.replyNum)").is_ok());
    }

    #[test]
    fn test_parse_selector_invalid() {
        assert!(matches!(
            parse_selector("[[invalid"),
            Err(AppError::Selector { .. })
        ));
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a\n\t b  c "), "a b c");
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("1,234"), Some(1234));
        assert_eq!(parse_count(" 조회 56 "), Some(56));
        assert_eq!(parse_count("-"), None);
    }

    #[test]
    fn test_numeric_tokens() {
        assert_eq!(numeric_tokens("조회 1,024 추천 7 댓글 12"), vec![1024, 7, 12]);
        assert!(numeric_tokens("none").is_empty());
    }
}
