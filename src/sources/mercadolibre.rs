// src/sources/mercadolibre.rs
//! MercadoLibre classifieds adapter.
//!
//! Native currency is ARS, but individual cards carry an explicit currency
//! symbol, so USD-priced listings are detected per item. Result pages are
//! walked with the site's `_Desde_` offset scheme (48 cards per page) until
//! the limit is met.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::error::SourceError;
use crate::model::{Currency, RawListing, Source};
use crate::sources::extract::{
    clean_text, last_srcset_candidate, parse_km, parse_price_text, parse_published, parse_year,
    usable_image,
};
use crate::sources::SourceAdapter;

const BASE_URL: &str = "https://listado.mercadolibre.com.ar";
const ITEM_BASE_URL: &str = "https://www.mercadolibre.com.ar";
const PAGE_SIZE: usize = 48;
const MAX_PAGES: usize = 3;
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub struct MercadoLibreAdapter {
    mode: Mode,
}

enum Mode {
    Http {
        client: reqwest::Client,
        base_url: String,
    },
    /// Parse a captured results page instead of fetching (tests).
    Fixture(String),
}

impl MercadoLibreAdapter {
    pub fn new() -> Result<Self, SourceError> {
        Self::with_base_url(BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SourceError::Unreachable(format!("http client: {e}")))?;
        Ok(Self {
            mode: Mode::Http {
                client,
                base_url: base_url.to_string(),
            },
        })
    }

    pub fn from_fixture(html: &str) -> Self {
        Self {
            mode: Mode::Fixture(html.to_string()),
        }
    }

    fn search_url(base_url: &str, query: &str, offset: usize) -> String {
        let slug = query.split_whitespace().collect::<Vec<_>>().join("-");
        if offset == 0 {
            format!("{base_url}/{slug}")
        } else {
            format!("{base_url}/{slug}_Desde_{}", offset + 1)
        }
    }

    fn parse_page(html: &str) -> Result<Vec<RawListing>, SourceError> {
        let started = Instant::now();

        let item_sel = sel("li.ui-search-layout__item")?;
        let link_sel = sel("a[href]")?;
        let img_sel = sel("img")?;
        let price_sel = sel("span.andes-money-amount")?;
        let symbol_sel = sel("span.andes-money-amount__currency-symbol")?;
        let fraction_sel = sel("span.andes-money-amount__fraction")?;
        let title_sel = sel("h2.ui-search-item__title, h3.poly-component__title-wrapper")?;
        let location_sel = sel("span.poly-component__location, span.ui-search-item__location")?;
        let attrs_sel = sel(
            "ul.poly-attributes_list li, ul.poly-component__attributes-list li, ul.ui-search-item__attributes li",
        )?;

        let doc = Html::parse_document(html);
        let mut out = Vec::new();

        for item in doc.select(&item_sel) {
            let img = item.select(&img_sel).next();

            // Title lives in the thumbnail alt text; header nodes are the fallback.
            let mut title = img
                .and_then(|el| el.value().attr("alt"))
                .map(clean_text)
                .unwrap_or_default();
            if title.is_empty() {
                title = item
                    .select(&title_sel)
                    .next()
                    .map(|el| clean_text(&el.text().collect::<String>()))
                    .unwrap_or_default();
            }

            let link = item
                .select(&link_sel)
                .next()
                .and_then(|el| el.value().attr("href"))
                .map(|href| {
                    if href.starts_with('/') {
                        format!("{ITEM_BASE_URL}{href}")
                    } else {
                        href.to_string()
                    }
                })
                .unwrap_or_default();

            if title.is_empty() || link.is_empty() {
                // Not a listing card (ad slot, banner); skip without failing the page.
                debug!("skipping card without title or link");
                continue;
            }

            let (native_price, currency) = item
                .select(&price_sel)
                .next()
                .map(|price| parse_price_node(&price, &symbol_sel, &fraction_sel))
                .unwrap_or((0, Currency::Ars));
            if native_price == 0 {
                warn!(link = %link, "mercadolibre price did not parse, keeping zero");
            }

            let location = item
                .select(&location_sel)
                .next()
                .map(|el| clean_text(&el.text().collect::<String>()))
                .filter(|s| !s.is_empty());

            let mut year = None;
            let mut km = None;
            for attr in item.select(&attrs_sel) {
                let text = attr.text().collect::<String>();
                if km.is_none() {
                    km = parse_km(&text);
                }
                if year.is_none() {
                    year = parse_year(&text);
                }
            }

            let item_text = item.text().collect::<Vec<_>>().join(" ");
            let published = parse_published(&item_text);

            let image = img.and_then(|el| {
                usable_image(el.value().attr("src"))
                    .or_else(|| usable_image(el.value().attr("data-src")))
                    .or_else(|| {
                        el.value()
                            .attr("data-srcset")
                            .and_then(last_srcset_candidate)
                            .and_then(|c| usable_image(Some(&c)))
                    })
            });

            out.push(RawListing {
                source: Source::MercadoLibre,
                title,
                native_price,
                currency,
                location,
                image,
                link,
                year,
                km,
                published,
            });
        }

        let elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0;
        histogram!("source_parse_ms", "source" => Source::MercadoLibre.as_str()).record(elapsed_ms);
        counter!("listings_parsed_total", "source" => Source::MercadoLibre.as_str())
            .increment(out.len() as u64);
        Ok(out)
    }
}

/// Currency symbol + fraction children of an `andes-money-amount` node.
/// `US$` marks a dollar-priced card; everything else is pesos.
fn parse_price_node(
    price: &ElementRef<'_>,
    symbol_sel: &Selector,
    fraction_sel: &Selector,
) -> (u64, Currency) {
    let currency = price
        .select(symbol_sel)
        .next()
        .map(|el| el.text().collect::<String>())
        .filter(|s| s.contains("US"))
        .map(|_| Currency::Usd)
        .unwrap_or(Currency::Ars);
    let native = price
        .select(fraction_sel)
        .next()
        .map(|el| parse_price_text(&el.text().collect::<String>()))
        .unwrap_or(0);
    (native, currency)
}

fn sel(css: &str) -> Result<Selector, SourceError> {
    Selector::parse(css).map_err(|e| SourceError::Parse(format!("selector {css}: {e}")))
}

#[async_trait]
impl SourceAdapter for MercadoLibreAdapter {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RawListing>, SourceError> {
        match &self.mode {
            Mode::Fixture(html) => {
                let mut listings = Self::parse_page(html)?;
                listings.truncate(limit);
                Ok(listings)
            }
            Mode::Http { client, base_url } => {
                let mut out = Vec::new();
                let pages = limit.div_ceil(PAGE_SIZE).clamp(1, MAX_PAGES);
                for page in 0..pages {
                    let url = Self::search_url(base_url, query, page * PAGE_SIZE);
                    debug!(%url, "fetching mercadolibre page");
                    let resp = client.get(&url).send().await.map_err(SourceError::from)?;
                    if !resp.status().is_success() {
                        if page == 0 {
                            return Err(SourceError::Unreachable(format!(
                                "status {}",
                                resp.status()
                            )));
                        }
                        // Deeper pages failing just end the walk.
                        warn!(status = %resp.status(), page, "mercadolibre page fetch failed, stopping");
                        break;
                    }
                    let body = resp
                        .text()
                        .await
                        .map_err(|e| SourceError::Parse(format!("body: {e}")))?;
                    let batch = Self::parse_page(&body)?;
                    if batch.is_empty() {
                        break;
                    }
                    out.extend(batch);
                    if out.len() >= limit {
                        break;
                    }
                }
                out.truncate(limit);
                Ok(out)
            }
        }
    }

    fn source(&self) -> Source {
        Source::MercadoLibre
    }
}
