// src/query.rs
//! Query Service: the façade callers consume.
//!
//! Validates the request, takes one exchange-rate snapshot, hands the fetch
//! to the aggregator, then applies the caller's filters and pagination as
//! pure post-processing. Rate trouble degrades conversion; it never fails
//! the search on its own.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use crate::aggregate::Aggregator;
use crate::config::EngineConfig;
use crate::error::QueryError;
use crate::model::{Listing, RateInfo, SearchRequest, SearchResponse};
use crate::rates::{BluelyticsFeed, RateFeed, RateProvider};
use crate::sources::{KavakAdapter, MercadoLibreAdapter, SourceRegistry};

pub struct QueryService {
    aggregator: Aggregator,
    rates: RateProvider,
}

impl QueryService {
    pub fn new(registry: SourceRegistry, feed: Box<dyn RateFeed>, config: EngineConfig) -> Self {
        let rates = RateProvider::new(feed, config.rate_ttl);
        Self {
            aggregator: Aggregator::new(registry, config),
            rates,
        }
    }

    /// Production wiring: every known adapter plus the blue-market feed.
    pub fn with_default_sources(config: EngineConfig) -> Result<Self, QueryError> {
        let mut registry = SourceRegistry::new(config.source_priority.clone());
        registry.register(Arc::new(
            MercadoLibreAdapter::new().context("building mercadolibre adapter")?,
        ));
        registry.register(Arc::new(
            KavakAdapter::new().context("building kavak adapter")?,
        ));
        let feed = BluelyticsFeed::new().context("building rate feed")?;
        Ok(Self::new(registry, Box::new(feed), config))
    }

    /// Run one search: aggregate, filter, paginate.
    pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse, QueryError> {
        let query = req.query.trim();
        if query.is_empty() {
            return Err(QueryError::InvalidQuery("query must not be empty".into()));
        }
        if req.page == 0 || req.page_size == 0 {
            return Err(QueryError::InvalidQuery(
                "page and pageSize must be positive".into(),
            ));
        }

        let sources = req
            .sources
            .clone()
            .unwrap_or_else(|| self.aggregator.configured_sources());

        let rate = match self.rates.get().await {
            Ok(rate) => Some(rate),
            Err(err) => {
                warn!(error = %err, "exchange rate unavailable, emitting unconverted listings");
                None
            }
        };

        let listings = self.aggregator.aggregate(query, &sources, rate.as_ref()).await?;

        let filtered: Vec<Listing> = listings
            .into_iter()
            .filter(|l| matches_filters(l, &req))
            .collect();
        let total_count = filtered.len();

        let start = (req.page - 1).saturating_mul(req.page_size);
        let page: Vec<Listing> = filtered.into_iter().skip(start).take(req.page_size).collect();

        info!(
            query,
            total_count,
            page = req.page,
            returned = page.len(),
            "search completed"
        );

        Ok(SearchResponse {
            listings: page,
            total_count,
            exchange_rate: rate.map(|r| RateInfo {
                value: r.value_per_usd,
                stale: r.stale,
            }),
        })
    }
}

/// Post-aggregation predicate: USD range, then score equality. A listing
/// with an unknown USD price cannot satisfy an active range filter.
fn matches_filters(listing: &Listing, req: &SearchRequest) -> bool {
    if req.min_price_usd.is_some() || req.max_price_usd.is_some() {
        let Some(price) = listing.price_usd else {
            return false;
        };
        if req.min_price_usd.is_some_and(|min| price < min) {
            return false;
        }
        if req.max_price_usd.is_some_and(|max| price > max) {
            return false;
        }
    }
    if let Some(score) = req.price_score {
        if listing.price_score != score {
            return false;
        }
    }
    true
}
