//! Listing pages: discover article teasers and enrich them.
//!
//! Homepage and category pages mix several card templates. [`scan_listing`]
//! walks them in a fixed priority order and [`enrich`] fetches every
//! surviving entry's detail page concurrently, returning results in discovery
//! order.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::category::{normalize_category, DEFAULT_CATEGORY};
use crate::config::ScraperConfig;
use crate::date::{format_date, now_timestamp, to_timestamp, try_parse_date};
use crate::extract::{extract_article, HEADLINE_FALLBACK, SUMMARY_FALLBACK};
use crate::fetch::{DocumentFetcher, Page};
use crate::language::detect_language;
use crate::models::{Article, BreakingItem, BreakingKind, DatedEntry, ListingEntry};
use crate::text::{char_prefix, element_text, make_absolute_url, normalize_text, word_count};

pub const FAILED_TO_LOAD: &str = "Failed to load full article";

const MIN_CARD_HEADLINE_CHARS: usize = 10;
const CARD_TEXT_MAX_CHARS: usize = 100;
const SUMMARY_FROM_HEADLINE_CHARS: usize = 150;

// ── Card layouts ─────────────────────────────────────────────────────────────

/// One homepage/listing teaser template.
struct CardLayout {
    name: &'static str,
    card: Selector,
    title: Selector,
}

fn sel(s: &str) -> Selector {
    Selector::parse(s).unwrap()
}

/// Featured cards, then numbered grid cards, then bare section links.
static LAYOUTS: Lazy<[CardLayout; 3]> = Lazy::new(|| {
    [
        CardLayout {
            name: "featured",
            card: sel(".card-featured, .top-story, .featured-news"),
            title: sel(".card-title-featured, .title, h2, h3, h4"),
        },
        CardLayout {
            name: "grid",
            card: sel(".card-v1, .card-v2, .card-v3, .card-v4"),
            title: sel(
                ".card-title-v1, .card-title-v2, .card-title-v3, .card-title-v4, .title, h3, h4",
            ),
        },
        CardLayout {
            name: "link",
            card: sel(
                r#"a[href*="/news/"], a[href*="/sports/"], a[href*="/business/"], a[href*="/entertainment/"]"#,
            ),
            title: sel(".title, h3, h4, .card-title-v1, .card-title-v2, .card-title-v3"),
        },
    ]
});

static ANCHOR_SEL: Lazy<Selector> = Lazy::new(|| sel("a[href]"));
static IMG_SEL: Lazy<Selector> = Lazy::new(|| sel("img"));
static CARD_SUMMARY_SEL: Lazy<Selector> = Lazy::new(|| sel(".description, .summary"));
static CARD_CATEGORY_SEL: Lazy<Selector> =
    Lazy::new(|| sel(".update-category, .category, .category-label"));
static CARD_DATE_SEL: Lazy<Selector> = Lazy::new(|| sel(".update-wrp-lg, .date, time"));

static LONG_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/([0-9]{5,})(?:/|$)").unwrap());

// ── Scanning ─────────────────────────────────────────────────────────────────

/// Collect up to `limit` distinct teasers in discovery order.
pub fn scan_listing(document: &Html, cfg: &ScraperConfig, limit: usize) -> Vec<ListingEntry> {
    let origin_host = cfg.origin_host();
    let mut entries: Vec<ListingEntry> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for layout in LAYOUTS.iter() {
        if entries.len() >= limit {
            break;
        }
        let before = entries.len();

        for card in document.select(&layout.card) {
            if entries.len() >= limit {
                break;
            }
            let Some(entry) = parse_card(card, layout, &cfg.base_url, &origin_host) else {
                continue;
            };
            if seen.insert(dedup_key(&entry.url)) {
                entries.push(entry);
            }
        }

        debug!(layout = layout.name, found = entries.len() - before, "Scanned card layout");
    }

    entries
}

fn parse_card(
    card: ElementRef<'_>,
    layout: &CardLayout,
    base: &Url,
    origin_host: &str,
) -> Option<ListingEntry> {
    let href = if card.value().name() == "a" {
        card.value().attr("href")
    } else {
        card.select(&ANCHOR_SEL).next().and_then(|a| a.value().attr("href"))
    }?;

    let url = make_absolute_url(href, base)?;
    if url.contains('#') || !on_origin(&url, origin_host) {
        return None;
    }

    let headline = card
        .select(&layout.title)
        .map(element_text)
        .find(|t| !t.is_empty())
        .unwrap_or_else(|| {
            char_prefix(&element_text(card), CARD_TEXT_MAX_CHARS)
                .trim()
                .to_string()
        });
    if headline.chars().count() < MIN_CARD_HEADLINE_CHARS || headline.contains("ADVERTISEMENT") {
        return None;
    }

    let thumbnail = card
        .select(&IMG_SEL)
        .next()
        .and_then(|img| img.value().attr("data-src").or_else(|| img.value().attr("src")))
        .and_then(|src| make_absolute_url(src, base));

    let summary = card
        .select(&CARD_SUMMARY_SEL)
        .map(element_text)
        .find(|t| !t.is_empty())
        .unwrap_or_else(|| format!("{}...", char_prefix(&headline, SUMMARY_FROM_HEADLINE_CHARS)));

    let category = card
        .select(&CARD_CATEGORY_SEL)
        .map(element_text)
        .find(|t| !t.is_empty())
        .map(|c| normalize_category(&c));

    let date = card
        .select(&CARD_DATE_SEL)
        .map(element_text)
        .find(|t| !t.is_empty());

    Some(ListingEntry {
        id: extract_article_id(&url),
        headline,
        url,
        thumbnail,
        summary,
        category,
        date,
    })
}

fn on_origin(url: &str, origin_host: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_lowercase()))
        .map(|h| h == origin_host || h.ends_with(&format!(".{}", origin_host)))
        .unwrap_or(false)
}

/// Comparison key for URL dedup: host without `www.`, percent-decoded path
/// without a trailing slash, and the query. Scheme and fragment are ignored.
pub fn dedup_key(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return url.trim_end_matches('/').to_lowercase();
    };
    let host = parsed
        .host_str()
        .map(|h| h.trim_start_matches("www.").to_lowercase())
        .unwrap_or_default();
    let path = urlencoding::decode(parsed.path())
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| parsed.path().to_string());
    let path = path.trim_end_matches('/');
    match parsed.query() {
        Some(q) => format!("{}{}?{}", host, path, q),
        None => format!("{}{}", host, path),
    }
}

/// Numeric article id from a URL: a 5+ digit path segment, else the last
/// all-digit segment.
pub fn extract_article_id(url: &str) -> Option<String> {
    let path = Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string());

    if let Some(caps) = LONG_ID_RE.captures(&path) {
        return Some(caps[1].to_string());
    }

    path.split('/')
        .filter(|p| !p.is_empty())
        .rev()
        .find(|p| p.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
}

// ── Enrichment ───────────────────────────────────────────────────────────────

/// Fetch and extract every entry's detail page concurrently.
///
/// Results are re-associated by index, so output order equals input order. An
/// entry whose page cannot be fetched becomes a degraded stub. Dropping the
/// returned future aborts any detail fetches still in flight.
#[instrument(level = "info", skip_all, fields(entries = entries.len()))]
pub async fn enrich(
    fetcher: Arc<dyn DocumentFetcher>,
    cfg: Arc<ScraperConfig>,
    entries: Vec<ListingEntry>,
) -> Vec<Article> {
    let mut tasks = JoinSet::new();

    for (index, entry) in entries.iter().enumerate() {
        let fetcher = Arc::clone(&fetcher);
        let cfg = Arc::clone(&cfg);
        let url = entry.url.clone();
        let id = entry.id.clone();
        tasks.spawn(async move {
            let article = match fetcher.fetch(&url).await {
                Some(page) => Some(extract_page(&page, id, &cfg)),
                None => None,
            };
            (index, article)
        });
    }

    let mut full: Vec<Option<Article>> = vec![None; entries.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, article)) => full[index] = article,
            Err(e) => warn!(error = %e, "Enrichment task failed"),
        }
    }

    let mut failed = 0usize;
    let articles: Vec<Article> = entries
        .into_iter()
        .zip(full)
        .map(|(entry, article)| match article {
            Some(article) => merge(entry, article),
            None => {
                warn!(url = %entry.url, "Failed to fetch full article");
                failed += 1;
                degraded_stub(entry, &cfg)
            }
        })
        .collect();

    info!(total = articles.len(), failed, "Enriched listing entries");
    articles
}

/// Parsing stays in a sync frame so the `!Send` tree never crosses an await.
fn extract_page(page: &Page, id: Option<String>, cfg: &ScraperConfig) -> Article {
    let document = page.document();
    extract_article(&document, &page.url, id, cfg)
}

/// Full-result fields win, except where the detail page only yielded a
/// default that the teaser can improve on.
pub fn merge(entry: ListingEntry, mut full: Article) -> Article {
    if full.id.is_none() {
        full.id = entry.id;
    }
    if full.headline == HEADLINE_FALLBACK {
        full.headline = entry.headline;
    }
    if full.summary == SUMMARY_FALLBACK {
        full.summary = entry.summary;
    }
    if full.thumbnail.is_none() {
        full.thumbnail = entry.thumbnail;
    }
    full
}

pub fn degraded_stub(entry: ListingEntry, cfg: &ScraperConfig) -> Article {
    let published_date = entry
        .date
        .as_deref()
        .map(format_date)
        .unwrap_or_else(now_timestamp);
    Article {
        id: entry.id,
        language: detect_language(&entry.headline),
        headline: entry.headline,
        url: entry.url,
        thumbnail: entry.thumbnail,
        summary: entry.summary,
        full_text: FAILED_TO_LOAD.to_string(),
        images: Vec::new(),
        category: entry.category.unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        published_date,
        author: cfg.site_name.clone(),
        word_count: word_count(FAILED_TO_LOAD),
        has_full_content: false,
        source: cfg.origin_host(),
        scraped_at: now_timestamp(),
    }
}

// ── Breaking news and dated entries ──────────────────────────────────────────

static TICKER_SEL: Lazy<Selector> =
    Lazy::new(|| sel(".news-marquee a, .news-ticker a, .breaking-news a"));
static FEATURED_SEL: Lazy<Selector> =
    Lazy::new(|| sel(".card-featured, .top-story, .featured-news"));
static FEATURED_TITLE_SEL: Lazy<Selector> = Lazy::new(|| sel(".title, h3, h4"));
static DATE_ELEMENT_SEL: Lazy<Selector> = Lazy::new(|| sel(".update-wrp-lg, .date, time"));
static TITLE_SEL: Lazy<Selector> =
    Lazy::new(|| sel(".title, h3, h4, .card-title-v1, .card-title-v2, .card-title-v3"));

/// Ticker items, with the featured story (if any) placed first.
pub fn scan_breaking(document: &Html, base: &Url, limit: usize) -> Vec<BreakingItem> {
    let timestamp = now_timestamp();
    let mut items: Vec<BreakingItem> = Vec::new();

    for anchor in document.select(&TICKER_SEL) {
        if items.len() >= limit {
            break;
        }
        let headline = element_text(anchor);
        let Some(url) = anchor.value().attr("href").and_then(|h| make_absolute_url(h, base)) else {
            continue;
        };
        if headline.chars().count() >= MIN_CARD_HEADLINE_CHARS {
            items.push(BreakingItem {
                headline,
                url,
                is_breaking: true,
                timestamp: timestamp.clone(),
                kind: BreakingKind::Marquee,
            });
        }
    }

    if items.len() < limit {
        if let Some(featured) = document.select(&FEATURED_SEL).next() {
            let headline = featured
                .select(&FEATURED_TITLE_SEL)
                .map(element_text)
                .find(|t| !t.is_empty());
            let url = featured
                .select(&ANCHOR_SEL)
                .next()
                .or_else(|| (featured.value().name() == "a").then_some(featured))
                .and_then(|a| a.value().attr("href"))
                .and_then(|h| make_absolute_url(h, base));
            if let (Some(headline), Some(url)) = (headline, url) {
                items.insert(
                    0,
                    BreakingItem {
                        headline,
                        url,
                        is_breaking: true,
                        timestamp: timestamp.clone(),
                        kind: BreakingKind::Featured,
                    },
                );
            }
        }
    }

    items.truncate(limit);
    items
}

/// Entries whose visible date falls on `target` (UTC calendar day).
pub fn scan_by_date(
    document: &Html,
    base: &Url,
    target: NaiveDate,
    limit: usize,
) -> Vec<DatedEntry> {
    let mut entries: Vec<DatedEntry> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for date_el in document.select(&DATE_ELEMENT_SEL) {
        if entries.len() >= limit {
            break;
        }
        let raw = normalize_text(&element_text(date_el));
        let Some(parsed) = try_parse_date(&raw) else {
            continue;
        };
        if parsed.date_naive() != target {
            continue;
        }

        let Some(card) = date_el.ancestors().filter_map(ElementRef::wrap).find(|a| {
            matches!(a.value().name(), "a" | "article")
                || a.value().classes().any(|c| matches!(c, "card-v1" | "card-v2" | "card-v3"))
        }) else {
            continue;
        };

        let href = if card.value().name() == "a" {
            card.value().attr("href")
        } else {
            card.select(&ANCHOR_SEL).next().and_then(|a| a.value().attr("href"))
        };
        let Some(url) = href.and_then(|h| make_absolute_url(h, base)) else {
            continue;
        };
        let Some(headline) = card
            .select(&TITLE_SEL)
            .map(element_text)
            .find(|t| !t.is_empty())
        else {
            continue;
        };

        if seen.insert(dedup_key(&url)) {
            entries.push(DatedEntry {
                headline,
                url,
                published_date: to_timestamp(parsed),
                date_match: true,
            });
        }
    }

    entries
}
