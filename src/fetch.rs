use std::time::Duration;

use async_trait::async_trait;
use scraper::Html;
use tracing::{debug, warn};

use crate::error::ScrapeError;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// A fetched HTML page.
///
/// The body is kept as text and parsed on demand: `scraper::Html` is not
/// `Send`, so the tree must never be held across an await point.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub html: String,
}

impl Page {
    pub fn document(&self) -> Html {
        Html::parse_document(&self.html)
    }
}

/// Source of documents. `None` is the only failure signal.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Option<Page>;
}

// ── HTTP fetcher ─────────────────────────────────────────────────────────────

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, connect_timeout: Duration) -> Result<Self, ScrapeError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            reqwest::header::HeaderValue::from_static("en-US,en;q=0.5"),
        );

        let client = reqwest::ClientBuilder::new()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| ScrapeError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Option<Page> {
        debug!(%url, "Fetching");

        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                let kind = if e.is_timeout() {
                    "timeout"
                } else if e.is_connect() {
                    "connect"
                } else {
                    "request"
                };
                warn!(%url, kind, error = %e, "Fetch failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "Upstream returned an error");
            return None;
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();
        if !content_type.is_empty() && !content_type.contains("html") {
            warn!(%url, %content_type, "URL did not return HTML");
            return None;
        }

        match response.text().await {
            Ok(html) if !html.trim().is_empty() => Some(Page {
                url: url.to_string(),
                html,
            }),
            Ok(_) => {
                warn!(%url, "Empty response body");
                None
            }
            Err(e) => {
                warn!(%url, error = %e, "Failed reading response body");
                None
            }
        }
    }
}

// ── In-memory fetcher for tests ──────────────────────────────────────────────
