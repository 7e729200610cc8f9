// src/aggregate.rs
//! Concurrent fan-out across marketplace adapters.
//!
//! One timed fetch per requested source, merged into a single batch:
//! normalize, dedup by link, score against the combined batch, order
//! deterministically, truncate to the global cap. A failing source
//! contributes nothing; only all of them failing fails the aggregation.
//!
//! Cancellation is structural: the fan-out is plain futures (no detached
//! spawns), so dropping the `aggregate` future drops every in-flight fetch
//! with it and no partial batch can outlive a cancelled request.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::QueryError;
use crate::model::{ExchangeRate, Listing, RawListing, Source};
use crate::normalize::normalize;
use crate::scoring::score_batch;
use crate::sources::{SourceAdapter, SourceRegistry};

/// One-time metric registration (series show up before the first increment).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "listings_parsed_total",
            "Raw listings extracted by source adapters."
        );
        describe_counter!(
            "listings_kept_total",
            "Listings surviving normalization, dedup, and the global cap."
        );
        describe_counter!(
            "source_errors_total",
            "Adapter fetches that failed or timed out."
        );
        describe_counter!("rate_refresh_total", "Successful exchange-rate refreshes.");
        describe_counter!(
            "rate_stale_served_total",
            "Requests served with a stale exchange rate."
        );
        describe_histogram!("source_fetch_ms", "Per-source fetch time in milliseconds.");
        describe_histogram!("source_parse_ms", "Per-source parse time in milliseconds.");
    });
}

pub struct Aggregator {
    registry: SourceRegistry,
    config: EngineConfig,
}

impl Aggregator {
    pub fn new(registry: SourceRegistry, config: EngineConfig) -> Self {
        Self { registry, config }
    }

    /// Registered sources in priority order.
    pub fn configured_sources(&self) -> Vec<Source> {
        self.registry.configured()
    }

    /// Fan out to the requested sources and assemble the combined, scored,
    /// ordered result. `rate` is the per-request snapshot; `None` degrades
    /// conversion but never drops listings.
    pub async fn aggregate(
        &self,
        query: &str,
        sources: &[Source],
        rate: Option<&ExchangeRate>,
    ) -> Result<Vec<Listing>, QueryError> {
        ensure_metrics_described();

        // Resolve in configured priority order; that order decides dedup
        // winners and ordering tie-breaks.
        let requested: Vec<(Source, Arc<dyn SourceAdapter>)> = self
            .registry
            .configured()
            .into_iter()
            .filter(|s| sources.contains(s))
            .filter_map(|s| self.registry.get(s).map(|a| (s, a)))
            .collect();
        for missing in sources
            .iter()
            .filter(|s| !requested.iter().any(|(r, _)| r == *s))
        {
            warn!(source = missing.as_str(), "requested source is not configured, ignoring");
        }
        if requested.is_empty() {
            return Err(QueryError::AllSourcesFailed);
        }

        let limit = self.config.limit_per_source;
        let per_source_timeout = self.config.per_source_timeout;

        let fetches = requested.iter().map(|(src, adapter)| {
            let src = *src;
            let adapter = Arc::clone(adapter);
            async move {
                let started = Instant::now();
                let outcome = timeout(per_source_timeout, adapter.search(query, limit)).await;
                let elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0;
                histogram!("source_fetch_ms", "source" => src.as_str()).record(elapsed_ms);
                match outcome {
                    Ok(Ok(batch)) => {
                        debug!(source = src.as_str(), count = batch.len(), "source responded");
                        Some(batch)
                    }
                    Ok(Err(err)) => {
                        warn!(source = src.as_str(), error = %err, "source failed");
                        counter!("source_errors_total", "source" => src.as_str()).increment(1);
                        None
                    }
                    Err(_) => {
                        warn!(
                            source = src.as_str(),
                            timeout_ms = per_source_timeout.as_millis() as u64,
                            "source timed out"
                        );
                        counter!("source_errors_total", "source" => src.as_str()).increment(1);
                        None
                    }
                }
            }
        });
        let batches: Vec<Option<Vec<RawListing>>> = join_all(fetches).await;

        if batches.iter().all(Option::is_none) {
            return Err(QueryError::AllSourcesFailed);
        }

        // Merge in priority order (join_all preserves input order) and drop
        // duplicate links: first seen wins.
        let mut seen_links = HashSet::new();
        let mut merged: Vec<Listing> = Vec::new();
        for raw in batches.into_iter().flatten().flatten() {
            let Some(listing) = normalize(raw, rate) else {
                continue;
            };
            if !seen_links.insert(listing.link.clone()) {
                continue;
            }
            merged.push(listing);
        }

        // Scoring must run over the combined batch: the median is query-wide.
        score_batch(&mut merged);

        // Ascending USD price with unknown prices last; ties by source
        // priority, then id, so identical inputs order identically.
        merged.sort_by(|a, b| {
            cmp_price(a.price_usd, b.price_usd)
                .then_with(|| {
                    self.registry
                        .priority_index(a.source)
                        .cmp(&self.registry.priority_index(b.source))
                })
                .then_with(|| a.id.cmp(&b.id))
        });

        merged.truncate(self.config.max_results);
        counter!("listings_kept_total").increment(merged.len() as u64);
        Ok(merged)
    }
}

fn cmp_price(a: Option<u64>, b: Option<u64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
