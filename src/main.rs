use std::sync::Arc;

use clap::Parser;
use tracing::info;

mod api;
mod cache;
mod category;
mod config;
mod date;
mod error;
mod extract;
mod fetch;
mod images;
mod language;
mod listing;
mod models;
mod resolve;
mod search;
mod service;
mod text;

use api::AppState;
use cache::TtlCache;
use config::Config;
use fetch::HttpFetcher;
use service::NewsScraper;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::parse();
    let fetcher = HttpFetcher::new(config.fetch_timeout(), config.connect_timeout())?;
    let scraper = NewsScraper::new(Arc::new(fetcher), config.scraper_config()?);

    let state = Arc::new(AppState {
        scraper,
        cache: TtlCache::new(config.cache_ttl()),
        request_timeout: config.request_timeout(),
    });
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!(
        addr = %listener.local_addr()?,
        source = %config.base_url,
        "listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}
