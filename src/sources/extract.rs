// src/sources/extract.rs
//! Tolerant field extraction shared by the marketplace adapters.
//!
//! Marketplace markup drifts constantly; every helper here degrades to a
//! sentinel (`0`, `None`, placeholder) instead of failing the record.

use chrono::{Datelike, Days, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Substituted when a card carries no usable image (data-URIs included).
pub const PLACEHOLDER_IMAGE: &str =
    "https://upload.wikimedia.org/wikipedia/commons/thumb/a/ac/No_image_available.svg/480px-No_image_available.svg.png";

static RE_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(19|20)\d{2}\b").unwrap());
static RE_KM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,3}(?:\.\d{3})+|\d+)\s*[kK][mM]\b").unwrap());
static RE_DAYS_AGO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)publicado hace\s+(\d+)\s*d[ií]as?").unwrap());
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Decode HTML entities and collapse whitespace to single spaces.
pub fn clean_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    RE_WS.replace_all(decoded.trim(), " ").to_string()
}

/// Digits-only price parse: `"12.500.000"`, `"US$ 45.000"` and `"$1,500"`
/// all reduce to their numeric value. Unparseable text is 0, the
/// price-unavailable sentinel.
pub fn parse_price_text(s: &str) -> u64 {
    let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// First plausible model year in `s`.
pub fn parse_year(s: &str) -> Option<u16> {
    let ceiling = Utc::now().year() as u16 + 1;
    RE_YEAR
        .find_iter(s)
        .filter_map(|m| m.as_str().parse::<u16>().ok())
        .find(|y| (1950..=ceiling).contains(y))
}

/// Mileage in km, thousand-separator dots stripped.
pub fn parse_km(s: &str) -> Option<u32> {
    let caps = RE_KM.captures(s)?;
    caps.get(1)?.as_str().replace('.', "").parse().ok()
}

/// Relative publish dates ("Publicado hace 12 días") to a calendar date.
pub fn parse_published(s: &str) -> Option<NaiveDate> {
    let caps = RE_DAYS_AGO.captures(s)?;
    let days: u64 = caps.get(1)?.as_str().parse().ok()?;
    Utc::now().date_naive().checked_sub_days(Days::new(days))
}

/// A usable image URL or `None`; data-URI thumbnails count as missing.
pub fn usable_image(candidate: Option<&str>) -> Option<String> {
    let c = candidate?.trim();
    if c.is_empty() || c.starts_with("data:image") {
        return None;
    }
    Some(c.to_string())
}

/// Last (largest) candidate URL of a `srcset` attribute.
pub fn last_srcset_candidate(srcset: &str) -> Option<String> {
    srcset
        .split(',')
        .next_back()?
        .split_whitespace()
        .next()
        .map(str::to_string)
}
