//! HTTP surface: routes, input validation and the JSON envelope.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::{error, warn};

use crate::cache::TtlCache;
use crate::category::CANONICAL_CATEGORIES;
use crate::date::now_timestamp;
use crate::error::ScrapeError;
use crate::service::NewsScraper;
use crate::search::MIN_QUERY_CHARS;

const SERVICE_NAME: &str = "Hiru News API";
const MAX_LIMIT: usize = 50;

const DEFAULT_LATEST_LIMIT: usize = 5;
const DEFAULT_BREAKING_LIMIT: usize = 10;
const DEFAULT_CATEGORY_LIMIT: usize = 15;
const DEFAULT_DATE_LIMIT: usize = 10;
const DEFAULT_SEARCH_LIMIT: usize = 10;

static DATE_PARAM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").unwrap());

pub struct AppState {
    pub scraper: NewsScraper,
    pub cache: TtlCache,
    pub request_timeout: Duration,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/latest-news", get(latest_news))
        .route("/api/breaking-news", get(breaking_news))
        .route("/api/article", get(article_by_query))
        .route("/api/article/:id", get(article_by_path))
        .route("/api/category", get(category_by_query))
        .route("/api/category/:name", get(category_by_path))
        .route("/api/date", get(news_by_date))
        .route("/api/search", get(search))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Envelope and errors ──────────────────────────────────────────────────────

/// Success body: `{success, data, count, timestamp}` plus any echoed
/// request parameter.
fn envelope<T: Serialize>(data: &[T], echo: Option<(&str, &str)>) -> Result<Value, ApiError> {
    let mut body = json!({
        "success": true,
        "data": serde_json::to_value(data).map_err(|e| ApiError::Internal(e.to_string()))?,
        "count": data.len(),
        "timestamp": now_timestamp(),
    });
    if let (Some((key, value)), Some(map)) = (echo, body.as_object_mut()) {
        map.insert(key.to_string(), Value::String(value.to_string()));
    }
    Ok(body)
}

#[derive(Debug)]
pub enum ApiError {
    Scrape(ScrapeError),
    Internal(String),
}

impl From<ScrapeError> for ApiError {
    fn from(e: ScrapeError) -> Self {
        ApiError::Scrape(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Scrape(ScrapeError::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            ApiError::Scrape(e @ ScrapeError::NotFound { .. }) => {
                (StatusCode::NOT_FOUND, e.to_string())
            }
            ApiError::Scrape(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        if status.is_server_error() {
            error!(%status, error = %message, "Request failed");
        } else {
            warn!(%status, error = %message, "Request rejected");
        }

        let mut body = json!({
            "success": false,
            "error": message,
            "timestamp": now_timestamp(),
        });
        if let (ApiError::Scrape(ScrapeError::Timeout), Some(map)) = (&self, body.as_object_mut()) {
            map.insert("suggestion".into(), json!("Try reducing the limit parameter"));
        }
        (status, Json(body)).into_response()
    }
}

fn clamp_limit(limit: Option<usize>, default: usize) -> usize {
    limit.unwrap_or(default).clamp(1, MAX_LIMIT)
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health(State(state): State<Arc<AppState>>) -> Response {
    match state.scraper.latest_news(1, state.request_timeout).await {
        Ok(sample) => Json(json!({
            "status": "healthy",
            "service": SERVICE_NAME,
            "version": env!("CARGO_PKG_VERSION"),
            "scraper_working": !sample.is_empty(),
            "sample_articles_available": sample.len(),
            "cached_responses": state.cache.len().await,
            "categories": CANONICAL_CATEGORIES,
            "timestamp": now_timestamp(),
            "endpoints": [
                endpoint("/api/breaking-news", "Breaking/ticker news"),
                endpoint("/api/latest-news", "Latest articles"),
                endpoint("/api/article/{id}", "Full article by ID"),
                endpoint("/api/category/{name}", "News by category"),
                endpoint("/api/date", "News by date"),
                endpoint("/api/search", "Search news"),
            ],
        }))
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "status": "unhealthy",
                "error": e.to_string(),
                "timestamp": now_timestamp(),
            })),
        )
            .into_response(),
    }
}

fn endpoint(path: &str, description: &str) -> Value {
    json!({ "path": path, "method": "GET", "description": description })
}

#[derive(Debug, Deserialize)]
pub struct LatestParams {
    limit: Option<usize>,
    /// Deadline in milliseconds.
    timeout: Option<u64>,
}

async fn latest_news(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LatestParams>,
) -> Result<Json<Value>, ApiError> {
    let limit = clamp_limit(params.limit, DEFAULT_LATEST_LIMIT);
    let deadline = params
        .timeout
        .map(Duration::from_millis)
        .unwrap_or(state.request_timeout);

    let body = state
        .cache
        .get_or_compute(&format!("latest:{}", limit), || async {
            let articles = state.scraper.latest_news(limit, deadline).await?;
            envelope(&articles, None)
        })
        .await?;
    Ok(Json(body))
}

#[derive(Debug, Deserialize)]
pub struct LimitParams {
    limit: Option<usize>,
}

async fn breaking_news(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Value>, ApiError> {
    let limit = clamp_limit(params.limit, DEFAULT_BREAKING_LIMIT);
    let body = state
        .cache
        .get_or_compute(&format!("breaking:{}", limit), || async {
            let items = state.scraper.breaking_news(limit).await;
            envelope(&items, Some(("source", state.scraper.config().origin_host().as_str())))
        })
        .await?;
    Ok(Json(body))
}

#[derive(Debug, Deserialize)]
pub struct IdParams {
    id: Option<String>,
}

async fn article_by_query(
    State(state): State<Arc<AppState>>,
    Query(params): Query<IdParams>,
) -> Result<Json<Value>, ApiError> {
    let id = params
        .id
        .ok_or_else(|| ScrapeError::invalid("Article ID is required"))?;
    article_response(&state, id.trim()).await
}

async fn article_by_path(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    article_response(&state, id.trim()).await
}

async fn article_response(state: &AppState, id: &str) -> Result<Json<Value>, ApiError> {
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        return Err(ScrapeError::invalid(format!("Invalid article ID: {}", id)).into());
    }

    let body = state
        .cache
        .get_or_compute(&format!("article:{}", id), || async {
            let article = state.scraper.article_by_id(id).await?;
            let data =
                serde_json::to_value(&article).map_err(|e| ApiError::Internal(e.to_string()))?;
            Ok::<_, ApiError>(json!({
                "success": true,
                "data": data,
                "timestamp": now_timestamp(),
            }))
        })
        .await?;
    Ok(Json(body))
}

#[derive(Debug, Deserialize)]
pub struct CategoryParams {
    name: Option<String>,
    limit: Option<usize>,
}

async fn category_by_query(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CategoryParams>,
) -> Result<Json<Value>, ApiError> {
    let name = params
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ScrapeError::invalid("Category name is required"))?;
    category_response(&state, &name, params.limit).await
}

async fn category_by_path(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Value>, ApiError> {
    category_response(&state, &name, params.limit).await
}

async fn category_response(
    state: &AppState,
    name: &str,
    limit: Option<usize>,
) -> Result<Json<Value>, ApiError> {
    let limit = clamp_limit(limit, DEFAULT_CATEGORY_LIMIT);
    let name = name.trim();
    let body = state
        .cache
        .get_or_compute(&format!("category:{}:{}", name.to_lowercase(), limit), || async {
            let (_, articles) = state
                .scraper
                .news_by_category(name, limit, state.request_timeout)
                .await?;
            envelope(&articles, Some(("category", name)))
        })
        .await?;
    Ok(Json(body))
}

#[derive(Debug, Deserialize)]
pub struct DateParams {
    date: Option<String>,
    limit: Option<usize>,
}

async fn news_by_date(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DateParams>,
) -> Result<Json<Value>, ApiError> {
    let raw = params
        .date
        .ok_or_else(|| ScrapeError::invalid("Date parameter is required (format YYYY-MM-DD)"))?;
    let date = parse_date_param(&raw)?;
    let limit = clamp_limit(params.limit, DEFAULT_DATE_LIMIT);

    let body = state
        .cache
        .get_or_compute(&format!("date:{}:{}", date, limit), || async {
            let entries = state.scraper.news_by_date(date, limit).await;
            envelope(&entries, Some(("date", raw.as_str())))
        })
        .await?;
    Ok(Json(body))
}

fn parse_date_param(raw: &str) -> Result<NaiveDate, ScrapeError> {
    let invalid =
        || ScrapeError::invalid(format!("Invalid date format: {} (expected YYYY-MM-DD)", raw));
    if !DATE_PARAM_RE.is_match(raw) {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| invalid())
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: Option<String>,
    limit: Option<usize>,
}

async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, ApiError> {
    let query = params.q.unwrap_or_default();
    let query = query.trim();
    if query.chars().count() < MIN_QUERY_CHARS {
        return Err(ScrapeError::invalid("Search query is required (min 2 characters)").into());
    }
    let limit = clamp_limit(params.limit, DEFAULT_SEARCH_LIMIT);

    let body = state
        .cache
        .get_or_compute(&format!("search:{}:{}", query.to_lowercase(), limit), || async {
            let results = state.scraper.search_news(query, limit).await;
            envelope(&results, Some(("query", query)))
        })
        .await?;
    Ok(Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScraperConfig;
    use crate::fetch::testing::StaticFetcher;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    const HOMEPAGE: &str = r#"<html><body>
        <div class="card-v1">
            <a href="/news/440101"><span class="card-title-v1">Heavy rain expected in the western province</span></a>
            <span class="date">12 January 2026</span>
        </div>
    </body></html>"#;

    const ARTICLE: &str = r#"<html><body><h1>Minister visits flood victims</h1>
        <div class="article-content"><p>The minister visited camps in Ratnapura on Monday morning.</p></div>
        </body></html>"#;

    fn app() -> Router {
        let fetcher = StaticFetcher::new()
            .with_page("https://hirunews.lk", HOMEPAGE)
            .with_page("https://hirunews.lk/news/440101", ARTICLE);
        let cfg = ScraperConfig::new("https://hirunews.lk", "Hiru News", 20).unwrap();
        router(Arc::new(AppState {
            scraper: NewsScraper::new(Arc::new(fetcher), cfg),
            cache: TtlCache::new(Duration::from_secs(60)),
            request_timeout: Duration::from_secs(5),
        }))
    }

    async fn get(uri: &str) -> (StatusCode, Value) {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_latest_news_envelope() {
        let (status, body) = get("/api/latest-news?limit=3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"][0]["headline"], "Minister visits flood victims");
        assert_eq!(body["data"][0]["hasFullContent"], false);
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_article_lookup() {
        let (status, body) = get("/api/article/440101").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], "440101");
        assert_eq!(body["data"]["url"], "https://hirunews.lk/news/440101");

        let (status, body) = get("/api/article?id=440101").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["headline"], "Minister visits flood victims");
    }

    #[tokio::test]
    async fn test_article_errors() {
        let (status, body) = get("/api/article/12x").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, body) = get("/api/article/99999").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Article with ID 99999 not found");

        let (status, _) = get("/api/article").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_date_validation_and_echo() {
        let (status, _) = get("/api/date?date=12-01-2026").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get("/api/date?date=2026-02-30").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = get("/api/date?date=2026-01-12").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["date"], "2026-01-12");
        assert_eq!(body["count"], 1);
    }

    #[tokio::test]
    async fn test_search_validation_and_echo() {
        let (status, _) = get("/api/search?q=%20a%20").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = get("/api/search?q=rain").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["query"], "rain");
        assert_eq!(body["count"], 1);
    }

    #[tokio::test]
    async fn test_category_echoes_requested_name() {
        let (status, body) = get("/api/category/sports").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["category"], "sports");
        assert_eq!(body["count"], 0);

        let (status, _) = get("/api/category").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health_lists_endpoints() {
        let (status, body) = get("/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["scraper_working"], true);
        assert_eq!(body["endpoints"].as_array().map(Vec::len), Some(6));
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None, 5), 5);
        assert_eq!(clamp_limit(Some(0), 5), 1);
        assert_eq!(clamp_limit(Some(500), 5), MAX_LIMIT);
    }
}
