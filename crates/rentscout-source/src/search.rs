//! Search URLs and listing ID discovery on result pages.

use regex::Regex;
use rentscout_core::{District, ListingId, SearchConfig};
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::OnceLock;

/// Search URL for one district and result page (1-based).
#[must_use]
pub fn search_url(base_url: &str, district: &District, filters: &SearchConfig, page: u32) -> String {
    let mut url = format!(
        "{}/list?region={}&section={}&price={}_{}&area={}_&kind=0",
        base_url.trim_end_matches('/'),
        filters.region,
        district.code,
        filters.price_min,
        filters.price_max,
        filters.area_min,
    );
    if page > 1 {
        url.push_str(&format!("&page={page}"));
    }
    url
}

fn id_in_href() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/(\d{7,8})(?:[?#/]|\.html|$)").expect("valid regex"))
}

fn id_anywhere() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{7,8})").expect("valid regex"))
}

/// Listing IDs on a search result page, in page order without duplicates.
///
/// IDs come from detail links, `data-id` card attributes and
/// `data-houseid` attributes.
#[must_use]
pub fn discover_ids(html: &str) -> Vec<ListingId> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    let mut push = |raw: &str| {
        if seen.insert(raw.to_string()) {
            if let Ok(id) = ListingId::new(raw) {
                ids.push(id);
            }
        }
    };

    if let Ok(selector) = Selector::parse("a[href], [data-id], [data-houseid]") {
        for element in document.select(&selector) {
            let attrs = element.value();
            if let Some(href) = attrs.attr("href") {
                if let Some(c) = id_in_href().captures(href) {
                    push(&c[1]);
                }
            }
            if let Some(data_id) = attrs.attr("data-id") {
                if !data_id.is_empty() && data_id.chars().all(|c| c.is_ascii_digit()) {
                    push(data_id);
                }
            }
            if let Some(house_id) = attrs.attr("data-houseid") {
                if let Some(m) = id_anywhere().find(house_id) {
                    push(m.as_str());
                }
            }
        }
    }
    ids
}
