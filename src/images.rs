use std::collections::HashSet;

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::models::ImageInfo;
use crate::text::{element_text, make_absolute_url};

/// Substrings marking decorative or promotional images.
const BLOCKED_SUBSTRINGS: &[&str] = &["logo", "icon", "favicon", "sprite", "banner"];

static IMG_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());
static FIGCAPTION_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("figcaption").unwrap());
static CAPTION_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse(".caption").unwrap());

/// Collect distinct content images in document order, at most `cap`.
pub fn collect_images(
    document: &Html,
    base: &Url,
    origin_host: &str,
    cap: usize,
) -> Vec<ImageInfo> {
    let mut images: Vec<ImageInfo> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for img in document.select(&IMG_SEL) {
        if images.len() >= cap {
            break;
        }

        let Some(url) = image_src(img).and_then(|src| make_absolute_url(src, base)) else {
            continue;
        };
        if !is_content_image(&url, origin_host) || !seen.insert(url.clone()) {
            continue;
        }

        let alt = img
            .value()
            .attr("alt")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("News image {}", images.len() + 1));

        images.push(ImageInfo {
            url,
            alt,
            caption: caption_for(img),
        });
    }

    images
}

/// Lazy-loading attributes first, then `src`.
fn image_src<'a>(img: ElementRef<'a>) -> Option<&'a str> {
    let v = img.value();
    ["data-src", "src", "data-original"]
        .iter()
        .filter_map(|a| v.attr(a))
        .map(str::trim)
        .find(|s| !s.is_empty() && !s.starts_with("data:"))
}

/// Served from the origin host (or one of its subdomains, such as the CDN)
/// and not decorative.
pub fn is_content_image(url: &str, origin_host: &str) -> bool {
    let on_origin = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        .map(|h| {
            !origin_host.is_empty()
                && (h == origin_host || h.ends_with(&format!(".{}", origin_host)))
        })
        .unwrap_or(false);
    if !on_origin {
        return false;
    }

    let lower = url.to_lowercase();

    if BLOCKED_SUBSTRINGS.iter().any(|b| lower.contains(b)) {
        return false;
    }

    !has_ad_token(&lower)
}

/// `ad` only counts as a whole path token (`/ad/`, `ads-300x250`, `advert_1`),
/// so words like `upload` or `headline` stay allowed.
fn has_ad_token(lower_url: &str) -> bool {
    let path = Url::parse(lower_url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| lower_url.to_string());
    path.split(|c: char| !c.is_ascii_alphanumeric())
        .any(|t| t == "ad" || t == "ads" || t.starts_with("advert"))
}

/// title attribute → enclosing figure's figcaption → enclosing div's `.caption`.
fn caption_for(img: ElementRef<'_>) -> String {
    if let Some(title) = img.value().attr("title").map(str::trim).filter(|t| !t.is_empty()) {
        return title.to_string();
    }

    let ancestors = || img.ancestors().filter_map(ElementRef::wrap);

    if let Some(figure) = ancestors().find(|a| a.value().name() == "figure") {
        if let Some(text) = figure
            .select(&FIGCAPTION_SEL)
            .map(element_text)
            .find(|t| !t.is_empty())
        {
            return text;
        }
    }

    if let Some(div) = ancestors().find(|a| a.value().name() == "div") {
        if let Some(text) = div.select(&CAPTION_SEL).map(element_text).find(|t| !t.is_empty()) {
            return text;
        }
    }

    String::new()
}
