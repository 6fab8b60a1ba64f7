//! Lenient date parsing.
//!
//! Article pages carry dates as ISO timestamps in meta tags, English prose in
//! cards, or Sinhala month names in older templates. [`parse_date`] never fails:
//! when nothing can be recovered it returns the current instant.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Sinhala month names and their English equivalents.
static SINHALA_MONTHS: &[(&str, &str)] = &[
    ("ජනවාරි", "January"),
    ("පෙබරවාරි", "February"),
    ("මාර්තු", "March"),
    ("අප්‍රේල්", "April"),
    ("මැයි", "May"),
    ("ජුනි", "June"),
    ("ජූලි", "July"),
    ("අගෝස්තු", "August"),
    ("සැප්තැම්බර්", "September"),
    ("ඔක්තෝබර්", "October"),
    ("නොවැම්බර්", "November"),
    ("දෙසැම්බර්", "December"),
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%B %d, %Y %H:%M",
    "%B %d, %Y %I:%M %p",
    "%d %B %Y %H:%M",
    "%d %B %Y %I:%M %p",
    "%d %B %Y - %H:%M",
    "%b %d, %Y %H:%M",
    "%d %b %Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B, %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%b %d %Y",
    "%d %b %Y",
    "%Y %B %d",
];

static WEEKDAY_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(mon|tue|wed|thu|fri|sat|sun)[a-z]*,?\s+").unwrap()
});

static DAY_MONTH_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]{1,2})\s+([A-Za-z]+)\s+([0-9]{4})").unwrap());

static YEAR_MONTH_DAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]{4})-([0-9]{1,2})-([0-9]{1,2})").unwrap());

static DAY_SLASH_MONTH_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]{1,2})/([0-9]{1,2})/([0-9]{4})").unwrap());

/// Parse any supported date string, falling back to now.
pub fn parse_date(raw: &str) -> DateTime<Utc> {
    try_parse_date(raw).unwrap_or_else(Utc::now)
}

/// Parse and render as an ISO 8601 UTC timestamp with millisecond precision.
pub fn format_date(raw: &str) -> String {
    to_timestamp(parse_date(raw))
}

pub fn to_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn now_timestamp() -> String {
    to_timestamp(Utc::now())
}

/// Like [`parse_date`] but reports failure instead of substituting now.
pub fn try_parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(dt) = parse_generic(raw) {
        return Some(dt);
    }

    for (sinhala, english) in SINHALA_MONTHS {
        if raw.contains(sinhala) {
            let replaced = raw.replace(sinhala, english);
            let replaced = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
            if let Some(dt) = parse_generic(&replaced).or_else(|| parse_positional(&replaced)) {
                return Some(dt);
            }
        }
    }

    parse_positional(raw)
}

/// Direct parse against the well-known layouts.
fn parse_generic(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc));
    }

    let stripped = WEEKDAY_PREFIX_RE.replace(raw, "");
    let candidate = stripped.trim();

    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(candidate, fmt) {
            return Some(naive.and_utc());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(candidate, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|n| n.and_utc());
        }
    }
    None
}

/// Pull a date out of surrounding noise with positional patterns.
fn parse_positional(raw: &str) -> Option<DateTime<Utc>> {
    if let Some(caps) = DAY_MONTH_YEAR_RE.captures(raw) {
        let day: u32 = caps[1].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        if let Some(month) = month_number(&caps[2]) {
            if let Some(dt) = ymd(year, month, day) {
                return Some(dt);
            }
        }
    }

    if let Some(caps) = YEAR_MONTH_DAY_RE.captures(raw) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        if let Some(dt) = ymd(year, month, day) {
            return Some(dt);
        }
    }

    if let Some(caps) = DAY_SLASH_MONTH_YEAR_RE.captures(raw) {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        if let Some(dt) = ymd(year, month, day) {
            return Some(dt);
        }
    }

    None
}

fn ymd(year: i32, month: u32, day: u32) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| n.and_utc())
}

fn month_number(name: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "january", "february", "march", "april", "may", "june", "july", "august", "september",
        "october", "november", "december",
    ];
    let lower = name.to_lowercase();
    if lower.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|m| m.starts_with(&lower))
        .map(|i| i as u32 + 1)
}
