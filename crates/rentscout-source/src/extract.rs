//! Field extraction from a 591 listing page.
//!
//! Pages are parsed without running JavaScript. Extraction is best effort:
//! every field that can be found is returned and the rest stay `None`. Only a
//! page with no recognisable listing data at all is a parse failure.

use regex::Regex;
use rentscout_core::{find_district, Amenities, FetchError, ListingFields, TAIPEI_DISTRICTS};
use rentscout_transit::{parse_station_text, Coordinates};
use scraper::{Html, Selector};
use std::sync::OnceLock;

/// Markers the site shows in place of a listing that was taken down.
const REMOVED_MARKERS: &[&str] = &["此房屋已下架", "物件已關閉", "該物件不存在"];

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("valid regex"))
}

/// Extract listing fields from page HTML.
///
/// # Errors
/// `NotFound` when the page says the listing was removed, `Parse` when no
/// listing data could be found.
pub fn extract_listing(html: &str) -> Result<ListingFields, FetchError> {
    let document = Html::parse_document(html);
    let text = page_text(&document);

    if REMOVED_MARKERS.iter().any(|m| text.contains(m)) {
        return Err(FetchError::NotFound("listing taken down".to_string()));
    }

    let mut fields = ListingFields {
        title: title(&document),
        base_rent: parse_rent(html),
        size_ping: parse_size_ping(&text),
        floor: parse_floor(&text),
        address: parse_address(&text),
        deposit_months: parse_deposit_months(&text),
        min_tenancy_months: parse_tenancy(&text),
        management_fee: parse_management_fee(&text),
        coords: parse_coords(html),
        ..ListingFields::default()
    };

    if let Some((layout, rooms, bathrooms)) = parse_layout(&text) {
        fields.layout = Some(layout);
        fields.rooms = rooms;
        fields.bathrooms = bathrooms;
    }

    fields.district = TAIPEI_DISTRICTS
        .iter()
        .find(|d| text.contains(d.name_zh))
        .and_then(|d| find_district(d.name))
        .map(|d| d.name.to_string());

    if let Some(snippet) = station_snippet(&text) {
        let (station, distance) = parse_station_text(&snippet);
        fields.nearest_station = station;
        fields.station_distance_m = distance;
    }

    let has_data = fields.base_rent.is_some()
        || fields.size_ping.is_some()
        || fields.layout.is_some()
        || fields.nearest_station.is_some();
    if !has_data {
        return Err(FetchError::Parse("no listing data on page".to_string()));
    }

    fields.amenities = parse_amenities(&text);
    Ok(fields)
}

fn page_text(document: &Html) -> String {
    document
        .root_element()
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn title(document: &Html) -> Option<String> {
    ["h1", "title"].iter().find_map(|sel| {
        let selector = Selector::parse(sel).ok()?;
        document
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    })
}

fn parse_number(s: &str) -> Option<u32> {
    s.replace(',', "").parse().ok()
}

/// Monthly rent in NT$, tried from the most to the least specific markup.
pub fn parse_rent(html: &str) -> Option<u32> {
    static STRONG: OnceLock<Regex> = OnceLock::new();
    static PER_MONTH: OnceLock<Regex> = OnceLock::new();
    static BARE: OnceLock<Regex> = OnceLock::new();

    let strong = regex(&STRONG, r">(\d{1,3}(?:,\d{3})*)</strong>\s*元/月");
    if let Some(rent) = strong.captures(html).and_then(|c| parse_number(&c[1])) {
        return Some(rent);
    }

    let per_month = regex(&PER_MONTH, r"(\d{1,3}(?:,\d{3})+)\s*元/月");
    if let Some(rent) = per_month
        .captures_iter(html)
        .filter_map(|c| parse_number(&c[1]))
        .find(|&v| v >= 10_000)
    {
        return Some(rent);
    }

    let bare = regex(&BARE, r">(\d{5,6})<");
    bare.captures(html).and_then(|c| parse_number(&c[1]))
}

/// Floor area in ping.
pub fn parse_size_ping(text: &str) -> Option<f64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(\d+(?:\.\d+)?)\s*坪")
        .captures(text)
        .and_then(|c| c[1].parse().ok())
        .filter(|&p: &f64| p > 0.0)
}

/// Layout such as `2房1廳1衛`, with the room and bathroom counts.
pub fn parse_layout(text: &str) -> Option<(String, Option<u32>, Option<u32>)> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let caps = regex(&RE, r"(\d+)房(?:(\d+)廳)?(?:(\d+)衛)?").captures(text)?;
    let rooms = caps[1].parse().ok();
    let bathrooms = caps.get(3).and_then(|m| m.as_str().parse().ok());
    Some((caps[0].to_string(), rooms, bathrooms))
}

/// Floor as `4F/5F` (unit floor over building floors).
pub fn parse_floor(text: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(\d+)\s*[樓F]\s*/\s*(\d+)\s*[樓F]?")
        .captures(text)
        .map(|c| format!("{}F/{}F", &c[1], &c[2]))
}

fn parse_address(text: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        let names: Vec<&str> = TAIPEI_DISTRICTS.iter().map(|d| d.name_zh).collect();
        Regex::new(&format!(r"(?:{})[^\s,，]{{5,50}}", names.join("|"))).expect("valid regex")
    });
    re.find(text).map(|m| m.as_str().to_string())
}

fn chinese_count(s: &str) -> Option<u32> {
    match s {
        "一" => Some(1),
        "二" | "兩" => Some(2),
        "三" => Some(3),
        "四" => Some(4),
        "六" => Some(6),
        _ => s.parse().ok(),
    }
}

fn deposit_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"押金\s*([一二兩三四六]|\d+)\s*個?月")
}

/// Deposit in months of rent.
pub fn parse_deposit_months(text: &str) -> Option<u32> {
    deposit_regex()
        .captures(text)
        .and_then(|c| chinese_count(&c[1]))
}

const LEASE_KEYWORDS: &[(&[&str], u32)] = &[
    (&["一個月", "1個月", "月租"], 1),
    (&["三個月", "3個月"], 3),
    (&["半年", "六個月", "6個月"], 6),
    (&["兩年", "二年", "2年", "24個月"], 24),
    (&["一年", "1年", "12個月"], 12),
];

fn lease_keyword(text: &str) -> Option<u32> {
    LEASE_KEYWORDS
        .iter()
        .find(|(words, _)| words.iter().any(|w| text.contains(w)))
        .map(|(_, months)| *months)
}

/// Minimum tenancy in months from free text such as `半年` or `3個月`.
pub fn parse_lease_months(text: &str) -> Option<u32> {
    static MONTHS: OnceLock<Regex> = OnceLock::new();
    static YEARS: OnceLock<Regex> = OnceLock::new();

    if let Some(months) = lease_keyword(text) {
        return Some(months);
    }
    if let Some(c) = regex(&MONTHS, r"(\d+)\s*個?月").captures(text) {
        return c[1].parse().ok();
    }
    regex(&YEARS, r"(\d+)\s*年")
        .captures(text)
        .and_then(|c| c[1].parse::<u32>().ok())
        .map(|y| y * 12)
}

// Without a labelled tenancy only keywords are trusted, and deposit phrases
// such as 押金一個月 must not read as a lease.
fn parse_tenancy(text: &str) -> Option<u32> {
    static RE: OnceLock<Regex> = OnceLock::new();
    match regex(&RE, r"最短租期[：:\s]*(\S{1,10})").captures(text) {
        Some(c) => parse_lease_months(&c[1]),
        None => lease_keyword(&deposit_regex().replace_all(text, "")),
    }
}

/// Monthly management fee; 0 when included in the rent.
pub fn parse_management_fee(text: &str) -> Option<u32> {
    static LABELLED: OnceLock<Regex> = OnceLock::new();
    static BARE: OnceLock<Regex> = OnceLock::new();

    if ["管理費無", "管理費含", "管理費已含"]
        .iter()
        .any(|m| text.contains(m))
    {
        return Some(0);
    }
    if let Some(c) = regex(&LABELLED, r"管理費[：:]\s*(\d{1,5})\s*元").captures(text) {
        return c[1].parse().ok();
    }
    regex(&BARE, r"管理費\s*(\d{3,5})")
        .captures(text)
        .and_then(|c| c[1].parse().ok())
}

fn parse_amenities(text: &str) -> Amenities {
    let has = |words: &[&str]| words.iter().any(|w| text.contains(w));
    Amenities {
        washing_machine: Some(has(&["洗衣機"])),
        ac: Some(has(&["冷氣", "空調"])),
        balcony: Some(has(&["陽台"])),
        parking: Some(has(&["車位", "停車"])),
        pets_allowed: Some(
            !has(&["不可養寵", "禁止寵物", "不可寵物"])
                && (has(&["可養寵"]) || (has(&["寵物"]) && !has(&["不可"]))),
        ),
    }
}

fn station_snippet(text: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"[\p{Han}]+(?:捷運站|站)[^\d\p{Han}]*(?:\d+\s*(?:公尺|m))?")
        .find(text)
        .map(|m| m.as_str().to_string())
}

fn parse_coords(html: &str) -> Option<Coordinates> {
    static LAT: OnceLock<Regex> = OnceLock::new();
    static LNG: OnceLock<Regex> = OnceLock::new();

    let lat: f64 = regex(&LAT, r#""lat"\s*:\s*"?(\d+\.\d+)"?"#)
        .captures(html)?[1]
        .parse()
        .ok()?;
    let lon: f64 = regex(&LNG, r#""lng"\s*:\s*"?(\d+\.\d+)"?"#)
        .captures(html)?[1]
        .parse()
        .ok()?;
    Some(Coordinates::new(lat, lon)).filter(Coordinates::is_valid)
}
