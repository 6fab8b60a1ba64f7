//! Text normalisation helpers shared by the extractors.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::node::Node;
use scraper::ElementRef;
use url::Url;

// ── Lazy static regexes ──────────────────────────────────────────────────────

static AD_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)ADVERTISEMENT.*?ADVERTISEMENT").unwrap());

static ADSBYGOOGLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)adsbygoogle.*?adsbygoogle").unwrap());

static SCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b.*?</script>").unwrap());

static ONLY_DIGITS_OR_SYMBOLS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9\W_]+$").unwrap());

const NOISE_NEEDLES: &[&str] = &["ADVERTISEMENT", "adsbygoogle", "var "];

/// Recursively collect the text of an element, skipping script and style.
pub fn collect_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&text.text),
            Node::Element(e) => {
                if matches!(e.name(), "script" | "style" | "noscript") {
                    continue;
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    out.push_str(&collect_text(child_el));
                }
            }
            _ => {}
        }
    }
    out
}

/// Collapse whitespace runs to one space and trim.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalised text of an element.
pub fn element_text(el: ElementRef<'_>) -> String {
    normalize_text(&collect_text(el))
}

/// Truncate to `max` characters, appending `...` when anything was cut.
pub fn truncate_with_ellipsis(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// First `max` characters, no marker.
pub fn char_prefix(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// True for paragraph text that is ad or markup residue rather than prose.
pub fn is_noise(text: &str) -> bool {
    NOISE_NEEDLES.iter().any(|n| text.contains(n)) || ONLY_DIGITS_OR_SYMBOLS_RE.is_match(text)
}

/// Strip ad markers and inline scripts from already-flattened page text.
pub fn strip_boilerplate(text: &str) -> String {
    let text = normalize_text(text);
    let text = AD_BLOCK_RE.replace_all(&text, "");
    let text = ADSBYGOOGLE_RE.replace_all(&text, "");
    let text = SCRIPT_RE.replace_all(&text, "");
    normalize_text(&text)
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Resolve a raw `href`/`src` against the site origin.
///
/// Empty, `N/A` and `#` are treated as absent. Protocol-relative URLs get
/// `https:`; root- and path-relative ones are joined onto the origin.
pub fn make_absolute_url(raw: &str, base: &Url) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "N/A" || raw == "#" {
        return None;
    }
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return Some(raw.to_string());
    }
    if let Some(rest) = raw.strip_prefix("//") {
        return Some(format!("https://{}", rest));
    }
    base.join(raw).ok().map(|u| u.to_string())
}
