//! The scraping facade the API layer talks to.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{info, instrument, warn};

use crate::category::category_for_listing;
use crate::config::ScraperConfig;
use crate::error::ScrapeError;
use crate::extract::extract_article;
use crate::fetch::{DocumentFetcher, Page};
use crate::listing::{enrich, scan_breaking, scan_by_date, scan_listing};
use crate::models::{Article, BreakingItem, DatedEntry, ListingEntry, SearchResult};
use crate::resolve::resolve_article;
use crate::search::rank;

/// How many homepage teasers search ranks over.
const SEARCH_POOL: usize = 100;

#[derive(Clone)]
pub struct NewsScraper {
    fetcher: Arc<dyn DocumentFetcher>,
    cfg: Arc<ScraperConfig>,
}

impl NewsScraper {
    pub fn new(fetcher: Arc<dyn DocumentFetcher>, cfg: ScraperConfig) -> Self {
        Self {
            fetcher,
            cfg: Arc::new(cfg),
        }
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.cfg
    }

    /// Full article for a numeric id, trying every known URL layout.
    #[instrument(level = "info", skip(self))]
    pub async fn article_by_id(&self, id: &str) -> Result<Article, ScrapeError> {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            return Err(ScrapeError::invalid(format!("Invalid article ID: {}", id)));
        }
        let page = resolve_article(self.fetcher.as_ref(), self.cfg.origin(), id).await?;
        Ok(article_from_page(&page, Some(id.to_string()), &self.cfg))
    }

    /// Homepage teasers, enriched with their full articles.
    ///
    /// The whole operation races `deadline`; on expiry every detail fetch
    /// still running is aborted.
    #[instrument(level = "info", skip(self))]
    pub async fn latest_news(
        &self,
        limit: usize,
        deadline: Duration,
    ) -> Result<Vec<Article>, ScrapeError> {
        let origin = self.cfg.origin().to_string();
        with_deadline(deadline, self.enriched_listing(&origin, limit, None)).await
    }

    /// Articles from a category listing page. Returns the resolved category
    /// name alongside the articles.
    #[instrument(level = "info", skip(self))]
    pub async fn news_by_category(
        &self,
        name: &str,
        limit: usize,
        deadline: Duration,
    ) -> Result<(&'static str, Vec<Article>), ScrapeError> {
        let category = category_for_listing(name);
        let url = format!(
            "{}/news_listing.php?category={}",
            self.cfg.origin(),
            urlencoding::encode(category)
        );
        info!(category, url = %url, "Fetching category listing");
        let listing = self.enriched_listing(&url, limit, Some(category));
        let articles = with_deadline(deadline, listing).await?;
        Ok((category, articles))
    }

    #[instrument(level = "info", skip(self))]
    pub async fn breaking_news(&self, limit: usize) -> Vec<BreakingItem> {
        match self.homepage().await {
            Some(page) => breaking_from_page(&page, &self.cfg, limit),
            None => Vec::new(),
        }
    }

    /// Homepage teasers whose visible date falls on `date`.
    #[instrument(level = "info", skip(self))]
    pub async fn news_by_date(&self, date: NaiveDate, limit: usize) -> Vec<DatedEntry> {
        match self.homepage().await {
            Some(page) => dated_from_page(&page, &self.cfg, date, limit),
            None => Vec::new(),
        }
    }

    /// Keyword search over the homepage teasers.
    #[instrument(level = "info", skip(self))]
    pub async fn search_news(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        let Some(page) = self.homepage().await else {
            return Vec::new();
        };
        let candidates = listing_from_page(&page, &self.cfg, SEARCH_POOL);
        let results = rank(&candidates, query, limit);
        info!(candidates = candidates.len(), results = results.len(), "Search complete");
        results
    }

    async fn homepage(&self) -> Option<Page> {
        let page = self.fetcher.fetch(self.cfg.origin()).await;
        if page.is_none() {
            warn!(url = %self.cfg.origin(), "Homepage unavailable");
        }
        page
    }

    async fn enriched_listing(
        &self,
        url: &str,
        limit: usize,
        category: Option<&'static str>,
    ) -> Vec<Article> {
        let Some(page) = self.fetcher.fetch(url).await else {
            warn!(url = %url, "Listing page unavailable");
            return Vec::new();
        };
        let mut entries = listing_from_page(&page, &self.cfg, limit);
        if let Some(category) = category {
            for entry in entries.iter_mut().filter(|e| e.category.is_none()) {
                entry.category = Some(category.to_string());
            }
        }
        enrich(Arc::clone(&self.fetcher), Arc::clone(&self.cfg), entries).await
    }
}

async fn with_deadline<F, T>(deadline: Duration, fut: F) -> Result<T, ScrapeError>
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(deadline, fut).await.map_err(|_| {
        warn!(deadline_ms = deadline.as_millis() as u64, "Deadline exceeded");
        ScrapeError::Timeout
    })
}

// Parsed trees are `!Send`; these keep them out of async frames.

fn breaking_from_page(page: &Page, cfg: &ScraperConfig, limit: usize) -> Vec<BreakingItem> {
    scan_breaking(&page.document(), &cfg.base_url, limit)
}

fn dated_from_page(
    page: &Page,
    cfg: &ScraperConfig,
    date: NaiveDate,
    limit: usize,
) -> Vec<DatedEntry> {
    scan_by_date(&page.document(), &cfg.base_url, date, limit)
}

fn listing_from_page(page: &Page, cfg: &ScraperConfig, limit: usize) -> Vec<ListingEntry> {
    scan_listing(&page.document(), cfg, limit)
}

fn article_from_page(page: &Page, id: Option<String>, cfg: &ScraperConfig) -> Article {
    extract_article(&page.document(), &page.url, id, cfg)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::fetch::testing::StaticFetcher;
    use crate::listing::FAILED_TO_LOAD;

    const HOMEPAGE: &str = r#"<html><body>
        <div class="news-ticker"><a href="/news/440100">Breaking: Parliament session suspended</a></div>
        <div class="card-v1">
            <a href="/news/440101"><span class="card-title-v1">Heavy rain expected in the western province</span></a>
            <span class="date">12 January 2026</span>
        </div>
        <div class="card-v2">
            <a href="/news/440102"><span class="card-title-v2">Cricket team announced for the tour</span></a>
            <span class="date">11 January 2026</span>
        </div>
    </body></html>"#;

    fn detail(headline: &str) -> String {
        format!(
            r#"<html><head><meta property="article:section" content="Sports News"></head>
            <body><h1>{headline}</h1><div class="article-content">
            <p>Selectors met this morning and confirmed the final squad for the tour.</p>
            </div></body></html>"#
        )
    }

    fn scraper(fetcher: StaticFetcher) -> NewsScraper {
        let cfg = ScraperConfig::new("https://hirunews.lk", "Hiru News", 20).unwrap();
        NewsScraper::new(Arc::new(fetcher), cfg)
    }

    #[tokio::test]
    async fn test_latest_news_enriches_in_order() {
        let fetcher = StaticFetcher::new()
            .with_page("https://hirunews.lk", HOMEPAGE)
            .with_page(
                "https://hirunews.lk/news/440102",
                &detail("Cricket squad named for the tour"),
            );

        let articles = scraper(fetcher)
            .latest_news(5, Duration::from_secs(5))
            .await
            .unwrap();

        // grid cards first, then the ticker link picked up as a bare section link
        let urls: Vec<&str> = articles.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://hirunews.lk/news/440101",
                "https://hirunews.lk/news/440102",
                "https://hirunews.lk/news/440100",
            ]
        );
        assert_eq!(articles[0].full_text, FAILED_TO_LOAD);
        assert_eq!(articles[1].headline, "Cricket squad named for the tour");
        assert_eq!(articles[1].id.as_deref(), Some("440102"));
        assert!(!articles[2].has_full_content);
    }

    #[tokio::test]
    async fn test_latest_news_without_homepage_is_empty() {
        let articles = scraper(StaticFetcher::new())
            .latest_news(5, Duration::from_secs(5))
            .await
            .unwrap();
        assert!(articles.is_empty());
    }

    #[tokio::test]
    async fn test_latest_news_times_out() {
        let fetcher = StaticFetcher::new()
            .with_page("https://hirunews.lk", HOMEPAGE)
            .with_delay(Duration::from_millis(500));
        let err = scraper(fetcher)
            .latest_news(5, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Timeout));
    }

    /// Serves the homepage at once but holds every detail fetch for `delay`,
    /// counting how many detail fetches started and how many ran to the end.
    struct SlowDetailFetcher {
        pages: StaticFetcher,
        delay: Duration,
        started: AtomicUsize,
        completed: AtomicUsize,
    }

    #[async_trait]
    impl DocumentFetcher for SlowDetailFetcher {
        async fn fetch(&self, url: &str) -> Option<Page> {
            if url != "https://hirunews.lk" {
                self.started.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(self.delay).await;
                self.completed.fetch_add(1, Ordering::SeqCst);
            }
            self.pages.fetch(url).await
        }
    }

    #[tokio::test]
    async fn test_deadline_aborts_in_flight_enrichment() {
        let fetcher = Arc::new(SlowDetailFetcher {
            pages: StaticFetcher::new().with_page("https://hirunews.lk", HOMEPAGE),
            delay: Duration::from_millis(300),
            started: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        });
        let cfg = ScraperConfig::new("https://hirunews.lk", "Hiru News", 20).unwrap();
        let scraper = NewsScraper::new(fetcher.clone(), cfg);

        let err = scraper
            .latest_news(5, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Timeout));
        assert_eq!(fetcher.started.load(Ordering::SeqCst), 3);

        // long enough for any surviving detail fetch to finish
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fetcher.completed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_article_by_id() {
        let fetcher = StaticFetcher::new()
            .with_page(
                "https://hirunews.lk/news/440102",
                &detail("Cricket squad named for the tour"),
            );
        let article = scraper(fetcher).article_by_id("440102").await.unwrap();
        assert_eq!(article.id.as_deref(), Some("440102"));
        assert_eq!(article.url, "https://hirunews.lk/news/440102");
        assert_eq!(article.category, "Sports");
    }

    #[tokio::test]
    async fn test_article_by_id_rejects_non_numeric() {
        let err = scraper(StaticFetcher::new()).article_by_id("abc").await.unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_category_listing_url_and_stamp() {
        let listing = r#"<html><body>
            <a href="/sports/440201"><h3>Lions clinch the series in Galle</h3></a>
        </body></html>"#;
        let fetcher = Arc::new(
            StaticFetcher::new()
                .with_page("https://hirunews.lk/news_listing.php?category=Sports", listing),
        );
        let cfg = ScraperConfig::new("https://hirunews.lk", "Hiru News", 20).unwrap();
        let scraper = NewsScraper::new(fetcher.clone(), cfg);

        let (category, articles) = scraper
            .news_by_category("SPORTS", 10, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(category, "Sports");
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].category, "Sports");
        assert_eq!(fetcher.requested()[0], "https://hirunews.lk/news_listing.php?category=Sports");
    }

    #[tokio::test]
    async fn test_breaking_date_and_search() {
        let fetcher = StaticFetcher::new().with_page("https://hirunews.lk", HOMEPAGE);
        let scraper = scraper(fetcher);

        let breaking = scraper.breaking_news(10).await;
        assert_eq!(breaking.len(), 1);
        assert_eq!(breaking[0].url, "https://hirunews.lk/news/440100");

        let dated = scraper
            .news_by_date(NaiveDate::from_ymd_opt(2026, 1, 11).unwrap(), 10)
            .await;
        assert_eq!(dated.len(), 1);
        assert_eq!(dated[0].headline, "Cricket team announced for the tour");

        let results = scraper.search_news("rain western", 10).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, "https://hirunews.lk/news/440101");
    }
}
