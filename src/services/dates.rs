//! Date text parsing for the supported community sites.
//!
//! Every site prints post dates differently, and several formats leave the
//! year or the whole date implicit. Those are resolved against `now`, which the
//! caller passes in so results stay reproducible.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::models::Site;

static DOT_FULL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})\.(\d{2})\.(\d{2})\s+(\d{2}):(\d{2})$").expect("valid regex")
});
static DASH_FULL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})-(\d{2})\s+(\d{2}):(\d{2})(?::(\d{2}))?$").expect("valid regex")
});
static HOUR_MINUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2}):(\d{2})$").expect("valid regex"));
static MONTH_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2})\.(\d{2})$").expect("valid regex"));
static SHORT_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2})\.(\d{2})\.(\d{2})$").expect("valid regex"));

/// A date text layout seen on at least one site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePattern {
    /// `YYYY.MM.DD HH:MM`
    DotFull,
    /// `YYYY-MM-DD HH:MM[:SS]`
    DashFull,
    /// `HH:MM`, meaning today
    HourMinute,
    /// `MM.DD`, meaning this year at midnight
    MonthDay,
    /// `YY.MM.DD`, meaning 20YY at midnight
    ShortYear,
}

impl DatePattern {
    /// Returns `None` when the text does not have this shape, and
    /// `Some(None)` when it does but names no real calendar instant.
    fn apply(self, text: &str, now: NaiveDateTime) -> Option<Option<NaiveDateTime>> {
        let regex = match self {
            DatePattern::DotFull => &*DOT_FULL,
            DatePattern::DashFull => &*DASH_FULL,
            DatePattern::HourMinute => &*HOUR_MINUTE,
            DatePattern::MonthDay => &*MONTH_DAY,
            DatePattern::ShortYear => &*SHORT_YEAR,
        };
        let caps = regex.captures(text)?;
        let num = |i: usize| -> u32 {
            caps.get(i)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0)
        };

        let resolved = match self {
            DatePattern::DotFull | DatePattern::DashFull => {
                ymd_hms(num(1) as i32, num(2), num(3), num(4), num(5), num(6))
            }
            DatePattern::HourMinute => ymd_hms(now.year(), now.month(), now.day(), num(1), num(2), 0),
            DatePattern::MonthDay => ymd_hms(now.year(), num(1), num(2), 0, 0, 0),
            DatePattern::ShortYear => ymd_hms(2000 + num(1) as i32, num(2), num(3), 0, 0, 0),
        };
        Some(resolved)
    }
}

fn ymd_hms(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(y, m, d)?.and_hms_opt(h, mi, s)
}

/// Patterns tried for a site, in priority order.
pub fn patterns_for(site: Site) -> &'static [DatePattern] {
    match site {
        Site::FMKorea => &[DatePattern::DotFull],
        Site::DCInside => &[
            DatePattern::DashFull,
            DatePattern::HourMinute,
            DatePattern::MonthDay,
        ],
        Site::TheQoo => &[
            DatePattern::DotFull,
            DatePattern::ShortYear,
            DatePattern::MonthDay,
            DatePattern::HourMinute,
        ],
    }
}

/// Parse site-native date text.
///
/// The first pattern whose shape matches decides the result; a calendar-invalid
/// value such as `2024.02.30 10:00` yields `None`.
pub fn parse(raw: &str, site: Site, now: NaiveDateTime) -> Option<NaiveDateTime> {
    parse_with(raw, patterns_for(site), now)
}

/// Parse with an explicit pattern list.
pub fn parse_with(raw: &str, patterns: &[DatePattern], now: NaiveDateTime) -> Option<NaiveDateTime> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    patterns
        .iter()
        .find_map(|pattern| pattern.apply(text, now))
        .flatten()
}
