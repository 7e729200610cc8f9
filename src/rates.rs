// src/rates.rs
//! Blue-market exchange rate provider.
//!
//! Single-slot cache with a TTL. Refresh is coalesced: the slot sits behind
//! one async mutex held across the upstream fetch, so callers arriving during
//! a refresh wait for the in-flight result instead of issuing their own
//! request. A failed refresh serves the previous value tagged `stale`; with
//! nothing cached yet it is `RateError::Unavailable`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::RateError;
use crate::model::ExchangeRate;

pub const BLUELYTICS_URL: &str = "https://api.bluelytics.com.ar/v2/latest";

/// Upstream quote feed. Production talks HTTP; tests supply stubs.
#[async_trait]
pub trait RateFeed: Send + Sync {
    /// Current local-currency-per-USD quote. Must be positive.
    async fn fetch(&self) -> Result<f64, RateError>;
}

/// Quote payload of the bluelytics endpoint (only the fields we read).
#[derive(Debug, Deserialize)]
struct QuoteBody {
    blue: QuoteSide,
}

#[derive(Debug, Deserialize)]
struct QuoteSide {
    value_avg: f64,
}

/// bluelytics.com.ar blue-market quote feed.
pub struct BluelyticsFeed {
    client: reqwest::Client,
    url: String,
}

impl BluelyticsFeed {
    pub fn new() -> Result<Self, RateError> {
        Self::with_url(BLUELYTICS_URL)
    }

    pub fn with_url(url: &str) -> Result<Self, RateError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| RateError::Unavailable(format!("quote client: {e}")))?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl RateFeed for BluelyticsFeed {
    async fn fetch(&self) -> Result<f64, RateError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| RateError::Unavailable(format!("quote request: {e}")))?;
        if !resp.status().is_success() {
            return Err(RateError::Unavailable(format!(
                "quote endpoint returned {}",
                resp.status()
            )));
        }
        let body: QuoteBody = resp
            .json()
            .await
            .map_err(|e| RateError::Unavailable(format!("quote body: {e}")))?;
        if body.blue.value_avg <= 0.0 {
            return Err(RateError::Unavailable(format!(
                "non-positive quote {}",
                body.blue.value_avg
            )));
        }
        Ok(body.blue.value_avg)
    }
}

struct Slot {
    value_per_usd: f64,
    fetched_at: DateTime<Utc>,
    refreshed: Instant,
}

/// Process-wide single-entry rate cache with coalesced refresh.
pub struct RateProvider {
    feed: Box<dyn RateFeed>,
    ttl: Duration,
    slot: Mutex<Option<Slot>>,
}

impl RateProvider {
    pub fn new(feed: Box<dyn RateFeed>, ttl: Duration) -> Self {
        Self {
            feed,
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// Current rate, served from cache while fresh.
    pub async fn get(&self) -> Result<ExchangeRate, RateError> {
        // Held across the fetch: this is the request-coalescing lock.
        let mut slot = self.slot.lock().await;

        if let Some(s) = slot.as_ref() {
            if s.refreshed.elapsed() <= self.ttl {
                return Ok(ExchangeRate {
                    value_per_usd: s.value_per_usd,
                    fetched_at: s.fetched_at,
                    stale: false,
                });
            }
        }

        match self.feed.fetch().await {
            Ok(value_per_usd) => {
                let fetched_at = Utc::now();
                debug!(value_per_usd, "exchange rate refreshed");
                counter!("rate_refresh_total").increment(1);
                *slot = Some(Slot {
                    value_per_usd,
                    fetched_at,
                    refreshed: Instant::now(),
                });
                Ok(ExchangeRate {
                    value_per_usd,
                    fetched_at,
                    stale: false,
                })
            }
            Err(err) => match slot.as_ref() {
                Some(s) => {
                    warn!(error = %err, "rate refresh failed, serving stale value");
                    counter!("rate_stale_served_total").increment(1);
                    Ok(ExchangeRate {
                        value_per_usd: s.value_per_usd,
                        fetched_at: s.fetched_at,
                        stale: true,
                    })
                }
                None => Err(err),
            },
        }
    }
}
