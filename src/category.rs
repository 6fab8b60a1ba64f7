use once_cell::sync::Lazy;
use regex::Regex;

pub const DEFAULT_CATEGORY: &str = "General";

/// Labels the API recognises as canonical.
pub const CANONICAL_CATEGORIES: &[&str] = &[
    "General",
    "International",
    "Entertainment",
    "Business",
    "Sports",
    "Technology",
    "Local",
];

/// Lookup key → canonical label. Order matters: the first containment hit wins.
static CATEGORY_TABLE: &[(&str, &str)] = &[
    ("general", "General"),
    ("local", "General"),
    ("international", "International"),
    ("entertainment", "Entertainment"),
    ("business", "Business"),
    ("sports", "Sports"),
    ("technology", "Technology"),
    ("world", "International"),
];

static PUNCT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());

/// Map a noisy category string onto the canonical vocabulary.
///
/// Unmapped strings come back cleaned and capitalised; empty ones become
/// `General`.
pub fn normalize_category(raw: &str) -> String {
    let cleaned = PUNCT_RE.replace_all(raw, "");
    let cleaned = cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    if cleaned.is_empty() {
        return DEFAULT_CATEGORY.to_string();
    }

    if let Some(label) = lookup(&cleaned) {
        return label.to_string();
    }

    capitalize(&cleaned)
}

/// Exact table lookup for a URL-supplied category name, e.g. `sports`.
pub fn category_for_listing(name: &str) -> &'static str {
    let key = name.trim().to_lowercase();
    CATEGORY_TABLE
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
        .unwrap_or(DEFAULT_CATEGORY)
}

fn lookup(cleaned: &str) -> Option<&'static str> {
    CATEGORY_TABLE
        .iter()
        .find(|(key, _)| cleaned.contains(key) || key.contains(cleaned))
        .map(|(_, label)| *label)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maps_noisy_labels() {
        assert_eq!(normalize_category("Sports News"), "Sports");
        assert_eq!(normalize_category("  BUSINESS!! "), "Business");
        assert_eq!(normalize_category("World"), "International");
        assert_eq!(normalize_category("Local"), "General");
        assert_eq!(normalize_category("sport"), "Sports");
    }

    #[test]
    fn test_unmapped_is_capitalised() {
        assert_eq!(normalize_category("Xyzzy"), "Xyzzy");
        assert_eq!(normalize_category("politics"), "Politics");
    }

    #[test]
    fn test_empty_is_general() {
        assert_eq!(normalize_category(""), "General");
        assert_eq!(normalize_category("  ?!  "), "General");
    }

    #[test]
    fn test_output_is_canonical_or_capitalised() {
        for raw in ["Tech & Technology", "entertainment", "gossip", "news"] {
            let cat = normalize_category(raw);
            let first = cat.chars().next().unwrap();
            assert!(CANONICAL_CATEGORIES.contains(&cat.as_str()) || first.is_uppercase());
        }
    }

    #[test]
    fn test_category_for_listing() {
        assert_eq!(category_for_listing("sports"), "Sports");
        assert_eq!(category_for_listing("Local"), "General");
        assert_eq!(category_for_listing("unknown"), "General");
    }
}
