//! Locate an article page from its numeric id.
//!
//! The site serves the same story under several path layouts depending on
//! edition and age. Candidates are tried in order; the first page that fetches
//! and does not look like an error page wins.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use tracing::{debug, info, instrument};

use crate::error::ScrapeError;
use crate::fetch::{DocumentFetcher, Page};
use crate::text::collect_text;

/// Path templates relative to the origin; `{id}` is substituted.
const URL_PATTERNS: &[&str] = &[
    "/{id}",
    "/news/{id}",
    "/en/{id}",
    "/sinhala/{id}",
    "/tm/{id}",
    "/{id}/article",
    "/article/{id}",
];

static NOT_FOUND_MARKERS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"\b404\b", r"Page Not Found", r"Not Found"]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});

/// Candidate URLs for `id`, in resolution order.
pub fn candidate_urls(origin: &str, id: &str) -> Vec<String> {
    URL_PATTERNS
        .iter()
        .map(|p| format!("{}{}", origin, p.replace("{id}", id)))
        .collect()
}

/// Resolution progress.
#[derive(Debug)]
enum State {
    Trying(usize),
    Found(Page),
    NotFound,
}

/// Walk the candidate URLs until one yields a real article page.
#[instrument(level = "info", skip(fetcher))]
pub async fn resolve_article(
    fetcher: &dyn DocumentFetcher,
    origin: &str,
    id: &str,
) -> Result<Page, ScrapeError> {
    let candidates = candidate_urls(origin, id);
    let mut state = State::Trying(0);

    loop {
        state = match state {
            State::Trying(i) if i >= candidates.len() => State::NotFound,
            State::Trying(i) => {
                let url = &candidates[i];
                match fetcher.fetch(url).await {
                    Some(page) if !looks_missing(&page.html) => State::Found(page),
                    Some(_) => {
                        debug!(url = %url, "Page looks like an error page");
                        State::Trying(i + 1)
                    }
                    None => State::Trying(i + 1),
                }
            }
            State::Found(page) => {
                info!(url = %page.url, "Resolved article");
                return Ok(page);
            }
            State::NotFound => return Err(ScrapeError::NotFound { id: id.to_string() }),
        };
    }
}

/// True when the page text is empty or carries a not-found marker.
fn looks_missing(html: &str) -> bool {
    let text = collect_text(Html::parse_document(html).root_element());
    text.trim().is_empty() || NOT_FOUND_MARKERS.iter().any(|re| re.is_match(&text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StaticFetcher;

    const ORIGIN: &str = "https://hirunews.lk";
    const ARTICLE: &str =
        "<html><body><h1>Minister visits flood victims</h1><p>Story text.</p></body></html>";

    #[tokio::test]
    async fn test_third_pattern_wins() {
        let fetcher = StaticFetcher::new()
            .with_page(
                "https://hirunews.lk/news/440221",
                "<html><body><h1>404 Page Not Found</h1></body></html>",
            )
            .with_page("https://hirunews.lk/en/440221", ARTICLE);

        let page = resolve_article(&fetcher, ORIGIN, "440221").await.unwrap();

        assert_eq!(page.url, "https://hirunews.lk/en/440221");
        assert_eq!(
            fetcher.requested(),
            vec![
                "https://hirunews.lk/440221",
                "https://hirunews.lk/news/440221",
                "https://hirunews.lk/en/440221",
            ]
        );
    }

    #[tokio::test]
    async fn test_exhausted_patterns_is_not_found() {
        let fetcher = StaticFetcher::new();
        let err = resolve_article(&fetcher, ORIGIN, "999").await.unwrap_err();
        assert!(matches!(err, ScrapeError::NotFound { ref id } if id == "999"));
        assert_eq!(fetcher.requested().len(), URL_PATTERNS.len());
        assert_eq!(err.to_string(), "Article with ID 999 not found");
    }

    #[test]
    fn test_not_found_markers() {
        assert!(looks_missing("<html><body><h1>Not Found</h1></body></html>"));
        assert!(looks_missing("<html><body></body></html>"));
        assert!(!looks_missing(ARTICLE));
        // digits inside a longer number are not a marker
        assert!(!looks_missing("<html><body><p>Story 140455 about roads.</p></body></html>"));
    }
}
