use serde::{Deserialize, Serialize};

/// Script tag for the dominant script of an article body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Language {
    #[default]
    #[serde(rename = "si")]
    Sinhala,
    #[serde(rename = "en")]
    English,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ImageInfo {
    pub url: String,
    pub alt: String,
    pub caption: String,
}

/// Canonical article record.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: Option<String>,
    pub headline: String,
    pub url: String,
    pub thumbnail: Option<String>,
    pub summary: String,
    pub full_text: String,
    pub images: Vec<ImageInfo>,
    pub category: String,
    pub published_date: String,
    pub author: String,
    pub word_count: usize,
    pub has_full_content: bool,
    pub language: Language,
    pub source: String,
    pub scraped_at: String,
}

/// A teaser discovered on an index page, before enrichment.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListingEntry {
    pub id: Option<String>,
    pub headline: String,
    pub url: String,
    pub thumbnail: Option<String>,
    pub summary: String,
    pub category: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub headline: String,
    pub url: String,
    pub thumbnail: Option<String>,
    pub summary: String,
    pub relevance: u32,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BreakingKind {
    Marquee,
    Featured,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BreakingItem {
    pub headline: String,
    pub url: String,
    pub is_breaking: bool,
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: BreakingKind,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DatedEntry {
    pub headline: String,
    pub url: String,
    pub published_date: String,
    pub date_match: bool,
}
