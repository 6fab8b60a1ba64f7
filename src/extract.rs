//! Field extraction for article detail pages.
//!
//! The site has shipped several template generations, so every field is
//! recovered by walking an ordered list of [`Strategy`] values and taking the
//! first candidate that passes the field's plausibility check. Missing fields
//! resolve to documented defaults; extraction itself never fails.

use std::collections::HashSet;

use chrono::Utc;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::category::{normalize_category, DEFAULT_CATEGORY};
use crate::config::ScraperConfig;
use crate::date::{format_date, to_timestamp};
use crate::images::{collect_images, is_content_image};
use crate::language::detect_language;
use crate::models::Article;
use crate::text::{
    char_prefix, collect_text, element_text, is_noise, make_absolute_url, strip_boilerplate,
    truncate_with_ellipsis, word_count,
};

// ── Constants ────────────────────────────────────────────────────────────────

pub const HEADLINE_FALLBACK: &str = "Headline not available";
pub const SUMMARY_FALLBACK: &str = "Summary not available";

const MIN_HEADLINE_CHARS: usize = 10;
const MIN_SUMMARY_CHARS: usize = 20;
const MIN_PARAGRAPH_CHARS: usize = 30;
const MIN_DATE_TEXT_CHARS: usize = 6;
const MIN_AUTHOR_CHARS: usize = 3;
pub const SUMMARY_MAX_CHARS: usize = 250;
/// Body text longer than this counts as a full article.
pub const FULL_CONTENT_THRESHOLD: usize = 300;
const BODY_FALLBACK_MAX_CHARS: usize = 10_000;

// ── Strategy tables ──────────────────────────────────────────────────────────

/// One way of recovering a field from a document.
pub enum Strategy {
    /// `content` attribute of the first matching `<meta>`.
    Meta(Selector),
    /// Trimmed text of the first matching element.
    ElementText(Selector),
    /// An attribute of the first matching element.
    ElementAttr(Selector, &'static str),
}

/// Where a winning candidate came from; plausibility rules differ per source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Meta,
    Element,
}

impl Strategy {
    fn evaluate(&self, document: &Html) -> Option<(Source, String)> {
        let (source, value) = match self {
            Strategy::Meta(sel) => (
                Source::Meta,
                document.select(sel).next()?.value().attr("content")?.trim().to_string(),
            ),
            Strategy::ElementText(sel) => {
                (Source::Element, element_text(document.select(sel).next()?))
            }
            Strategy::ElementAttr(sel, attr) => (
                Source::Element,
                document.select(sel).next()?.value().attr(attr)?.trim().to_string(),
            ),
        };
        Some((source, value))
    }
}

/// `meta…` selectors read the content attribute, everything else reads text.
fn text_strategies(selectors: &[&str]) -> Vec<Strategy> {
    selectors
        .iter()
        .filter_map(|s| {
            let sel = Selector::parse(s).ok()?;
            Some(if s.starts_with("meta") {
                Strategy::Meta(sel)
            } else {
                Strategy::ElementText(sel)
            })
        })
        .collect()
}

static HEADLINE_STRATEGIES: Lazy<Vec<Strategy>> = Lazy::new(|| {
    text_strategies(&[
        "h1.article-title",
        "h1.news-title",
        "h1.title",
        "h1",
        ".title h1",
        ".news-heading h1",
        r#"meta[property="og:title"]"#,
        r#"meta[name="twitter:title"]"#,
        ".card-title-featured",
        ".card-title-v1",
        ".card-title-v2",
        ".card-title-v3",
        ".card-title-v4",
    ])
});

static THUMBNAIL_STRATEGIES: Lazy<Vec<Strategy>> = Lazy::new(|| {
    let mut list = text_strategies(&[
        r#"meta[property="og:image"]"#,
        r#"meta[name="twitter:image"]"#,
        r#"meta[property="twitter:image"]"#,
    ]);
    list.extend(
        [
            ".featured-image img",
            ".article-image img",
            ".news-image img",
            ".image-wrp img",
            "article img",
            ".content img",
            r#"img[src*="news_images"]"#,
            r#"img[src*="News_Images"]"#,
        ]
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .map(|sel| Strategy::ElementAttr(sel, "src")),
    );
    list
});

static SUMMARY_STRATEGIES: Lazy<Vec<Strategy>> = Lazy::new(|| {
    text_strategies(&[
        r#"meta[name="description"]"#,
        r#"meta[property="og:description"]"#,
        r#"meta[name="twitter:description"]"#,
        ".article-summary",
        ".news-summary",
        ".summary",
        ".excerpt",
        ".description",
        "p",
        "article > p",
    ])
});

static CATEGORY_STRATEGIES: Lazy<Vec<Strategy>> = Lazy::new(|| {
    text_strategies(&[
        ".breadcrumb a:nth-child(2)",
        ".category a",
        ".news-category",
        ".article-category",
        ".cat-links a",
        r#"meta[property="article:section"]"#,
        r#"meta[name="category"]"#,
        ".update-category",
        ".category-label",
        ".tag",
    ])
});

static DATE_STRATEGIES: Lazy<Vec<Strategy>> = Lazy::new(|| {
    text_strategies(&[
        r#"meta[property="article:published_time"]"#,
        r#"meta[name="published_date"]"#,
        r#"meta[name="date"]"#,
        ".date",
        ".published-date",
        ".article-date",
        ".news-date",
        "time",
        ".update-wrp-lg",
        ".post-date",
        ".timestamp",
    ])
});

static AUTHOR_STRATEGIES: Lazy<Vec<Strategy>> = Lazy::new(|| {
    text_strategies(&[
        r#"meta[name="author"]"#,
        ".author",
        ".article-author",
        ".byline",
        ".reporter",
        ".writer",
        ".post-author",
        r#"meta[property="article:author"]"#,
    ])
});

/// Body containers, most specific first.
static CONTENT_CONTAINERS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        ".article-content",
        ".story-content",
        ".news-detail",
        ".single-news",
        ".news-content",
        "#content",
        "article",
        ".col-lg-8",
        ".content-wrp",
        ".main-content",
        ".entry-content",
    ]
    .iter()
    .filter_map(|s| Selector::parse(s).ok())
    .collect()
});

/// Sub-trees that never hold article prose.
static BOILERPLATE_SEL: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        "script, style, iframe, .advertisement, .share-buttons, .comments, .related-news, \
         .ad, .social-share, .author-box, .tags, .news-meta, .read-more, .btn",
    )
    .unwrap()
});

static PARAGRAPH_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static BODY_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());

// ── Strategy interpreter ─────────────────────────────────────────────────────

/// First strategy whose value passes `accept`.
pub fn first_match<F>(
    document: &Html,
    strategies: &[Strategy],
    accept: F,
) -> Option<(Source, String)>
where
    F: Fn(Source, &str) -> bool,
{
    strategies
        .iter()
        .filter_map(|s| s.evaluate(document))
        .find(|(source, value)| !value.is_empty() && accept(*source, value))
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

// ── Field extractors ─────────────────────────────────────────────────────────

pub fn extract_headline(document: &Html, site_name: &str) -> String {
    let accepted = first_match(document, &HEADLINE_STRATEGIES, |source, value| {
        let value = match source {
            Source::Meta => strip_site_suffix(value, site_name),
            Source::Element => value.to_string(),
        };
        char_len(&value) >= MIN_HEADLINE_CHARS
    });

    match accepted {
        Some((Source::Meta, value)) => strip_site_suffix(&value, site_name),
        Some((Source::Element, value)) => value,
        None => {
            debug!("No plausible headline");
            HEADLINE_FALLBACK.to_string()
        }
    }
}

/// Drop a trailing ` - Site` or ` | Site` from a meta title.
fn strip_site_suffix(title: &str, site_name: &str) -> String {
    for sep in [" - ", " | ", " – "] {
        if let Some(stripped) = title.strip_suffix(&format!("{}{}", sep, site_name)) {
            return stripped.trim().to_string();
        }
    }
    title.trim().to_string()
}

pub fn extract_thumbnail(document: &Html, base: &Url, origin_host: &str) -> Option<String> {
    THUMBNAIL_STRATEGIES
        .iter()
        .filter_map(|s| s.evaluate(document))
        .filter_map(|(_, raw)| make_absolute_url(&raw, base))
        .find(|url| is_content_image(url, origin_host))
}

pub fn extract_summary(document: &Html) -> String {
    match first_match(document, &SUMMARY_STRATEGIES, |_, value| {
        char_len(value) >= MIN_SUMMARY_CHARS
    }) {
        Some((Source::Meta, value)) => value,
        Some((Source::Element, value)) => truncate_with_ellipsis(&value, SUMMARY_MAX_CHARS),
        None => SUMMARY_FALLBACK.to_string(),
    }
}

/// Raw category label; normalisation happens in [`extract_article`].
pub fn extract_category(document: &Html) -> String {
    first_match(document, &CATEGORY_STRATEGIES, |_, _| true)
        .map(|(_, v)| v)
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
}

/// Raw date string, empty when nothing was found.
pub fn extract_published_date(document: &Html) -> String {
    first_match(document, &DATE_STRATEGIES, |source, value| match source {
        Source::Meta => true,
        Source::Element => char_len(value) >= MIN_DATE_TEXT_CHARS,
    })
    .map(|(_, v)| v)
    .unwrap_or_default()
}

pub fn extract_author(document: &Html, site_name: &str) -> String {
    first_match(document, &AUTHOR_STRATEGIES, |source, value| {
        value != site_name
            && match source {
                Source::Meta => true,
                Source::Element => char_len(value) >= MIN_AUTHOR_CHARS,
            }
    })
    .map(|(_, v)| v)
    .unwrap_or_else(|| site_name.to_string())
}

// ── Body text ────────────────────────────────────────────────────────────────

/// Recover the article body.
///
/// Each container selector is tried in order. Paragraphs inside boilerplate
/// sub-trees or matching ad/markup noise are skipped. A container whose joined
/// paragraphs exceed the full-content threshold wins outright; otherwise the
/// first container with any prose is used. With no prose at all, the page
/// body is flattened, stripped of ad markers and capped.
pub fn extract_full_text(document: &Html) -> String {
    let mut partial: Option<String> = None;

    for selector in CONTENT_CONTAINERS.iter() {
        let paragraphs = container_paragraphs(document, selector);
        if paragraphs.is_empty() {
            continue;
        }
        let joined = paragraphs.join("\n\n");
        if char_len(&joined) > FULL_CONTENT_THRESHOLD {
            return joined;
        }
        if partial.is_none() {
            partial = Some(joined);
        }
    }

    if let Some(text) = partial {
        return text;
    }

    debug!("No content container matched; falling back to page body");
    document
        .select(&BODY_SEL)
        .next()
        .map(|body| {
            let cleaned = strip_boilerplate(&collect_text(body));
            char_prefix(&cleaned, BODY_FALLBACK_MAX_CHARS).trim().to_string()
        })
        .unwrap_or_default()
}

fn container_paragraphs(document: &Html, selector: &Selector) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut paragraphs = Vec::new();

    for container in document.select(selector) {
        let blocked: HashSet<_> = container
            .select(&BOILERPLATE_SEL)
            .map(|el| el.id())
            .filter(|id| *id != container.id())
            .collect();

        let inside_blocked = |p: ElementRef<'_>| {
            blocked.contains(&p.id())
                || p.ancestors()
                    .take_while(|a| a.id() != container.id())
                    .any(|a| blocked.contains(&a.id()))
        };

        for p in container.select(&PARAGRAPH_SEL) {
            if !seen.insert(p.id()) || inside_blocked(p) {
                continue;
            }
            let text = element_text(p);
            if char_len(&text) > MIN_PARAGRAPH_CHARS && !is_noise(&text) {
                paragraphs.push(text);
            }
        }
    }

    paragraphs
}

// ── Assembly ─────────────────────────────────────────────────────────────────

/// Build a complete [`Article`] from a detail page.
pub fn extract_article(
    document: &Html,
    url: &str,
    id: Option<String>,
    cfg: &ScraperConfig,
) -> Article {
    let base = &cfg.base_url;
    let origin_host = cfg.origin_host();

    let headline = extract_headline(document, &cfg.site_name);
    let thumbnail = extract_thumbnail(document, base, &origin_host);
    let summary = extract_summary(document);
    let full_text = extract_full_text(document);
    let images = collect_images(document, base, &origin_host, cfg.image_cap);
    let category = normalize_category(&extract_category(document));
    let published_date = format_date(&extract_published_date(document));
    let author = extract_author(document, &cfg.site_name);

    debug!(
        %url,
        headline_chars = char_len(&headline),
        body_chars = char_len(&full_text),
        images = images.len(),
        "Extracted article"
    );

    Article {
        id,
        headline,
        url: url.to_string(),
        thumbnail,
        summary,
        word_count: word_count(&full_text),
        has_full_content: char_len(&full_text) > FULL_CONTENT_THRESHOLD,
        language: detect_language(&full_text),
        full_text,
        images,
        category,
        published_date,
        author,
        source: origin_host,
        scraped_at: to_timestamp(Utc::now()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::try_parse_date;
    use crate::models::Language;

    fn cfg() -> ScraperConfig {
        ScraperConfig::new("https://hirunews.lk", "Hiru News", 20).unwrap()
    }

    fn doc(html: &str) -> Html {
        Html::parse_document(html)
    }

    #[test]
    fn test_minimal_document() {
        let para = "The quick brown fox jumps over the dog."; // 39 chars
        let para = format!("{}!", para);
        assert_eq!(para.chars().count(), 40);
        let html = format!(
            r#"<html><body><h1>Test Headline Here</h1><div class="article-content"><p>{}</p></div></body></html>"#,
            para
        );
        let article = extract_article(
            &doc(&html),
            "https://hirunews.lk/news/123456",
            Some("123456".into()),
            &cfg(),
        );
        assert_eq!(article.headline, "Test Headline Here");
        assert_eq!(article.full_text, para);
        assert!(!article.has_full_content);
        assert_eq!(article.word_count, 8);
        assert_eq!(article.language, Language::English);
        assert_eq!(article.author, "Hiru News");
        assert_eq!(article.category, "General");
        assert!(try_parse_date(&article.published_date).is_some());
        assert!(article.images.is_empty());
        assert_eq!(article.source, "hirunews.lk");
    }

    #[test]
    fn test_headline_prefers_elements_and_checks_length() {
        let html = r#"<head><meta property="og:title" content="Floods hit the south - Hiru News"></head>
            <body><h1>Short</h1></body>"#;
        assert_eq!(extract_headline(&doc(html), "Hiru News"), "Floods hit the south");

        let html = r#"<body><h1 class="title">Cabinet approves new budget</h1></body>"#;
        assert_eq!(extract_headline(&doc(html), "Hiru News"), "Cabinet approves new budget");

        assert_eq!(extract_headline(&doc("<body></body>"), "Hiru News"), HEADLINE_FALLBACK);
    }

    #[test]
    fn test_summary_meta_untruncated_element_truncated() {
        let long = "x".repeat(400);
        let html = format!(r#"<head><meta name="description" content="{}"></head>"#, long);
        assert_eq!(extract_summary(&doc(&html)).len(), 400);

        let html = format!(r#"<body><div class="summary">{}</div></body>"#, long);
        let summary = extract_summary(&doc(&html));
        assert_eq!(summary.chars().count(), 253);
        assert!(summary.ends_with("..."));

        let html = r#"<head><meta name="description" content="too short"></head>"#;
        assert_eq!(extract_summary(&doc(html)), SUMMARY_FALLBACK);
    }

    #[test]
    fn test_thumbnail_must_be_on_origin() {
        let html = r#"<head><meta property="og:image" content="https://other.cdn/x.jpg"></head>
            <body><div class="featured-image"><img src="/uploads/lead.jpg"></div></body>"#;
        let base = Url::parse("https://hirunews.lk").unwrap();
        assert_eq!(
            extract_thumbnail(&doc(html), &base, "hirunews.lk").as_deref(),
            Some("https://hirunews.lk/uploads/lead.jpg")
        );
        assert_eq!(extract_thumbnail(&doc("<body></body>"), &base, "hirunews.lk"), None);
    }

    #[test]
    fn test_full_text_skips_boilerplate_and_noise() {
        let good = "Police said the suspect was arrested near the harbour on Sunday.";
        let html = format!(
            r#"<body><article>
                <p>{good}</p>
                <div class="share-buttons"><p>Share this story with your friends and family now</p></div>
                <p>ADVERTISEMENT ADVERTISEMENT ADVERTISEMENT ADVERTISEMENT</p>
                <p>short</p>
                <div class="related-news"><p>Related: another story that should not be included here</p></div>
            </article></body>"#
        );
        assert_eq!(extract_full_text(&doc(&html)), good);
    }

    #[test]
    fn test_full_text_prefers_sufficient_container() {
        let short = "A short teaser paragraph sitting in the page header.";
        let long_para = "This sentence is long enough to count as a real paragraph of prose. ";
        let long: String = long_para.repeat(6);
        let html = format!(
            r#"<body><div class="story-content"><p>{short}</p></div>
               <article><p>{}</p></article></body>"#,
            long.trim()
        );
        let text = extract_full_text(&doc(&html));
        assert_eq!(text, long.trim());
        assert!(text.chars().count() > FULL_CONTENT_THRESHOLD);
    }

    #[test]
    fn test_full_text_body_fallback() {
        let html = r#"<body><span>Loose text without any paragraphs</span>
            <script>var tracking = 1;</script> ADVERTISEMENT promo ADVERTISEMENT tail</body>"#;
        assert_eq!(extract_full_text(&doc(html)), "Loose text without any paragraphs tail");
    }

    #[test]
    fn test_author_skips_site_name() {
        let html = r#"<head><meta name="author" content="Hiru News"></head>
            <body><span class="byline">Kamal Perera</span></body>"#;
        assert_eq!(extract_author(&doc(html), "Hiru News"), "Kamal Perera");
        assert_eq!(extract_author(&doc("<body></body>"), "Hiru News"), "Hiru News");
    }

    #[test]
    fn test_category_and_date() {
        let html = r#"<head><meta property="article:published_time" content="2026-01-12T08:30:00+05:30"></head>
            <body><div class="news-category">Sports News</div></body>"#;
        let d = doc(html);
        assert_eq!(normalize_category(&extract_category(&d)), "Sports");
        assert_eq!(format_date(&extract_published_date(&d)), "2026-01-12T03:00:00.000Z");
    }
}
