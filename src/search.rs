//! Keyword ranking over listing entries.

use crate::date::now_timestamp;
use crate::models::{ListingEntry, SearchResult};

/// Queries shorter than this (after trimming) return nothing.
pub const MIN_QUERY_CHARS: usize = 2;

const OCCURRENCE_WEIGHT: u32 = 10;
const LEADING_BONUS: u32 = 5;

/// Lowercased whitespace-separated terms longer than two characters.
pub fn query_terms(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|t| t.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

/// Relevance of `haystack` (already lowercased) for `terms`, or `None` when
/// any term is missing.
fn score(haystack: &str, terms: &[String]) -> Option<u32> {
    let mut total = 0u32;
    for term in terms {
        let hits = haystack.matches(term.as_str()).count() as u32;
        if hits == 0 {
            return None;
        }
        total += hits * OCCURRENCE_WEIGHT;
        if haystack.starts_with(term.as_str()) {
            total += LEADING_BONUS;
        }
    }
    Some(total)
}

/// Keep entries whose headline or summary contains every term, best first.
///
/// Equal scores keep their input order.
pub fn rank(candidates: &[ListingEntry], query: &str, limit: usize) -> Vec<SearchResult> {
    if query.trim().chars().count() < MIN_QUERY_CHARS {
        return Vec::new();
    }
    let terms = query_terms(query);
    if terms.is_empty() {
        return Vec::new();
    }

    let timestamp = now_timestamp();
    let mut results: Vec<SearchResult> = candidates
        .iter()
        .filter_map(|entry| {
            let haystack = format!("{} {}", entry.headline, entry.summary).to_lowercase();
            score(&haystack, &terms).map(|relevance| SearchResult {
                headline: entry.headline.clone(),
                url: entry.url.clone(),
                thumbnail: entry.thumbnail.clone(),
                summary: entry.summary.clone(),
                relevance,
                timestamp: timestamp.clone(),
            })
        })
        .collect();

    results.sort_by(|a, b| b.relevance.cmp(&a.relevance));
    results.truncate(limit);
    results
}
