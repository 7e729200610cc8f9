// src/normalize.rs
//! Currency normalization: every listing leaves with both a USD and an ARS
//! representation, as far as the current rate allows.
//!
//! Degraded path: with no rate available, the side that would need
//! conversion stays `None` and the listing is still emitted. A zero native
//! price is "price unavailable" and normalizes to zero in both units.

use crate::model::{Currency, ExchangeRate, Listing, PriceScore, RawListing};
use crate::sources::extract::PLACEHOLDER_IMAGE;

/// Build a `Listing` from a raw record. `None` when mandatory fields are
/// missing (defensive recheck; adapters already drop those records).
pub fn normalize(raw: RawListing, rate: Option<&ExchangeRate>) -> Option<Listing> {
    let title = raw.title.trim();
    if title.is_empty() || raw.link.trim().is_empty() {
        return None;
    }

    let (price_usd, price_ars) = convert(raw.native_price, raw.currency, rate);

    Some(Listing {
        id: format!("{}:{}", raw.source.as_str(), raw.link),
        title: title.to_string(),
        native_price: raw.native_price,
        currency: raw.currency,
        price_usd,
        price_ars,
        location: raw.location,
        image: raw.image.unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
        link: raw.link,
        year: raw.year,
        km: raw.km,
        published: raw.published,
        source: raw.source,
        // Rescored against the whole batch by the aggregator.
        price_score: PriceScore::Regular,
    })
}

fn convert(
    native: u64,
    currency: Currency,
    rate: Option<&ExchangeRate>,
) -> (Option<u64>, Option<u64>) {
    if native == 0 {
        // Price unavailable: zero in both units, never an error.
        return (Some(0), Some(0));
    }
    match (currency, rate) {
        (Currency::Usd, Some(r)) => (Some(native), Some(to_ars(native, r.value_per_usd))),
        (Currency::Usd, None) => (Some(native), None),
        (Currency::Ars, Some(r)) => (Some(to_usd(native, r.value_per_usd)), Some(native)),
        (Currency::Ars, None) => (None, Some(native)),
    }
}

fn to_ars(usd: u64, value_per_usd: f64) -> u64 {
    (usd as f64 * value_per_usd).round() as u64
}

fn to_usd(ars: u64, value_per_usd: f64) -> u64 {
    (ars as f64 / value_per_usd).round() as u64
}
