//! Runtime configuration.
//!
//! Every option can be given as a flag or through the environment, so the
//! service runs unchanged in a container.

use std::time::Duration;

use clap::Parser;
use url::Url;

use crate::error::ScrapeError;

/// Command-line / environment configuration for the API server.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "JSON API over Hiru News pages")]
pub struct Config {
    /// Address the HTTP server binds to
    #[arg(long, env = "HIRU_BIND", default_value = "0.0.0.0:8000")]
    pub bind: String,

    /// Base URL of the news source
    #[arg(long, env = "HIRU_BASE_URL", default_value = "https://hirunews.lk")]
    pub base_url: String,

    /// Site name, used as the default author and stripped from meta titles
    #[arg(long, env = "HIRU_SITE_NAME", default_value = "Hiru News")]
    pub site_name: String,

    /// Per-page fetch timeout in seconds
    #[arg(long, env = "HIRU_FETCH_TIMEOUT_SECS", default_value_t = 15)]
    pub fetch_timeout_secs: u64,

    /// Connect timeout in seconds
    #[arg(long, env = "HIRU_CONNECT_TIMEOUT_SECS", default_value_t = 5)]
    pub connect_timeout_secs: u64,

    /// How long cached API responses stay fresh, in seconds
    #[arg(long, env = "HIRU_CACHE_TTL_SECS", default_value_t = 300)]
    pub cache_ttl_secs: u64,

    /// Default deadline for aggregate listing requests, in milliseconds
    #[arg(long, env = "HIRU_REQUEST_TIMEOUT_MS", default_value_t = 20_000)]
    pub request_timeout_ms: u64,

    /// Maximum number of images collected from an article page
    #[arg(long, env = "HIRU_IMAGE_CAP", default_value_t = 20)]
    pub image_cap: usize,
}

impl Config {
    pub fn scraper_config(&self) -> Result<ScraperConfig, ScrapeError> {
        ScraperConfig::new(&self.base_url, &self.site_name, self.image_cap)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// The slice of configuration the extraction core needs.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub base_url: Url,
    pub site_name: String,
    pub image_cap: usize,
}

impl ScraperConfig {
    pub fn new(base_url: &str, site_name: &str, image_cap: usize) -> Result<Self, ScrapeError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ScrapeError::invalid(format!("Invalid base URL {}: {}", base_url, e)))?;
        if base_url.host_str().is_none() {
            return Err(ScrapeError::invalid("Base URL has no host"));
        }
        Ok(Self {
            base_url,
            site_name: site_name.to_string(),
            image_cap,
        })
    }

    /// Origin without a trailing slash, e.g. `https://hirunews.lk`.
    pub fn origin(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Host of the base URL with any leading `www.` removed.
    pub fn origin_host(&self) -> String {
        self.base_url
            .host_str()
            .map(|h| h.trim_start_matches("www.").to_lowercase())
            .unwrap_or_default()
    }
}
