// src/model.rs
// Core value types: listings, currencies, score buckets, request/response DTOs.
// Wire-facing structs serialize camelCase to match the consumer contract
// (`priceUSD`, `priceScore`, ...).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Marketplace a listing came from. Also the registry key for adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    MercadoLibre,
    Kavak,
}

impl Source {
    /// Every source the engine knows about, in default priority order.
    pub const ALL: [Source; 2] = [Source::MercadoLibre, Source::Kavak];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::MercadoLibre => "mercadolibre",
            Source::Kavak => "kavak",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized source identifier in a request or config value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSource(pub String);

impl fmt::Display for UnknownSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown source identifier: {}", self.0)
    }
}

impl std::error::Error for UnknownSource {}

impl FromStr for Source {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mercadolibre" => Ok(Source::MercadoLibre),
            "kavak" => Ok(Source::Kavak),
            other => Err(UnknownSource(other.to_string())),
        }
    }
}

/// Currency a listing was priced in at its source. Always resolved;
/// ambiguous markup falls back to the source's declared native currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Ars,
}

/// Qualitative price classification relative to the query batch median.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriceScore {
    VeryGood,
    Good,
    Regular,
    Bad,
    VeryBad,
}

/// Pre-normalization listing as extracted by a source adapter.
///
/// `native_price == 0` means the price text did not parse (or the source
/// showed no price); the record is kept, flagged by the zero itself.
#[derive(Debug, Clone, PartialEq)]
pub struct RawListing {
    pub source: Source,
    pub title: String,
    pub native_price: u64,
    pub currency: Currency,
    pub location: Option<String>,
    pub image: Option<String>,
    pub link: String,
    pub year: Option<u16>,
    pub km: Option<u32>,
    pub published: Option<NaiveDate>,
}

/// One normalized vehicle-for-sale record. Immutable once constructed.
///
/// `price_usd`/`price_ars` are `None` only in the degraded no-rate case for
/// the side that would need conversion; a zero price means "price
/// unavailable" and is zero in both units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    pub title: String,
    pub native_price: u64,
    pub currency: Currency,
    #[serde(rename = "priceUSD")]
    pub price_usd: Option<u64>,
    #[serde(rename = "priceARS")]
    pub price_ars: Option<u64>,
    pub location: Option<String>,
    pub image: String,
    pub link: String,
    pub year: Option<u16>,
    pub km: Option<u32>,
    pub published: Option<NaiveDate>,
    pub source: Source,
    pub price_score: PriceScore,
}

/// Snapshot of the blue-market USD rate used for a request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRate {
    /// Local-currency units per USD. Always positive.
    pub value_per_usd: f64,
    pub fetched_at: DateTime<Utc>,
    /// Set when a refresh failed and this is the previous value.
    pub stale: bool,
}

/// Caller-facing search parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub query: String,
    /// Subset of sources to query; `None` means all configured.
    #[serde(default)]
    pub sources: Option<Vec<Source>>,
    #[serde(default, rename = "minPriceUSD")]
    pub min_price_usd: Option<u64>,
    #[serde(default, rename = "maxPriceUSD")]
    pub max_price_usd: Option<u64>,
    #[serde(default)]
    pub price_score: Option<PriceScore>,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    20
}

impl SearchRequest {
    /// Request with defaults: all sources, no filters, first page of 20.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            sources: None,
            min_price_usd: None,
            max_price_usd: None,
            price_score: None,
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

/// Rate summary surfaced to the caller for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateInfo {
    pub value: f64,
    pub stale: bool,
}

/// One page of results plus the count of everything that matched.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub listings: Vec<Listing>,
    pub total_count: usize,
    /// `None` when no rate could be obtained at all this request.
    pub exchange_rate: Option<RateInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_identifiers_round_trip() {
        for src in Source::ALL {
            assert_eq!(src.as_str().parse::<Source>().unwrap(), src);
        }
        assert_eq!(" KAVAK ".parse::<Source>().unwrap(), Source::Kavak);
        assert!("craigslist".parse::<Source>().is_err());
    }

    #[test]
    fn listing_serializes_consumer_field_names() {
        let listing = Listing {
            id: "kavak:https://www.kavak.com/ar/usados/x".into(),
            title: "Toyota Corolla".into(),
            native_price: 21_500,
            currency: Currency::Usd,
            price_usd: Some(21_500),
            price_ars: Some(21_500_000),
            location: Some("Buenos Aires".into()),
            image: "https://example.com/img.jpg".into(),
            link: "https://www.kavak.com/ar/usados/x".into(),
            year: Some(2021),
            km: Some(45_000),
            published: None,
            source: Source::Kavak,
            price_score: PriceScore::VeryGood,
        };
        let v = serde_json::to_value(&listing).unwrap();
        assert_eq!(v["priceUSD"], 21_500);
        assert_eq!(v["priceARS"], 21_500_000);
        assert_eq!(v["priceScore"], "very-good");
        assert_eq!(v["nativePrice"], 21_500);
        assert_eq!(v["currency"], "USD");
        assert_eq!(v["source"], "kavak");
    }

    #[test]
    fn search_request_defaults_apply() {
        let req: SearchRequest = serde_json::from_str(r#"{"query":"gol trend"}"#).unwrap();
        assert_eq!(req.page, 1);
        assert_eq!(req.page_size, 20);
        assert!(req.sources.is_none());
        assert!(req.min_price_usd.is_none());

        let req: SearchRequest = serde_json::from_str(
            r#"{"query":"corolla","sources":["mercadolibre"],"minPriceUSD":5000,"priceScore":"bad","page":2,"pageSize":10}"#,
        )
        .unwrap();
        assert_eq!(req.sources.as_deref(), Some(&[Source::MercadoLibre][..]));
        assert_eq!(req.min_price_usd, Some(5_000));
        assert_eq!(req.price_score, Some(PriceScore::Bad));
        assert_eq!(req.page, 2);
    }
}
