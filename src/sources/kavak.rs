// src/sources/kavak.rs
//! Kavak dealer adapter. The inventory is USD-denominated and single-page;
//! cards carry title, price, a `year • km` subtitle, and a relative link.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::error::SourceError;
use crate::model::{Currency, RawListing, Source};
use crate::sources::extract::{clean_text, parse_km, parse_price_text, parse_year, usable_image};
use crate::sources::SourceAdapter;

const BASE_URL: &str = "https://www.kavak.com/ar/usados";
const ITEM_BASE_URL: &str = "https://www.kavak.com";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Kavak keeps its inventory in one metro area; cards carry no location node.
const DEFAULT_LOCATION: &str = "Buenos Aires";

pub struct KavakAdapter {
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

impl KavakAdapter {
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

    fn search_url(base_url: &str, query: &str) -> String {
        let slug = query
            .trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-");
        format!("{base_url}/{slug}")
    }

    fn parse_page(html: &str) -> Result<Vec<RawListing>, SourceError> {
        let started = Instant::now();

        let card_sel = sel(r#"a[class*="card-product"]"#)?;
        let title_sel = sel(r#"h3[class*="title"]"#)?;
        let price_sel = sel(r#"span[class*="price"]"#)?;
        let subtitle_sel = sel(r#"p[class*="subtitle"]"#)?;
        let img_sel = sel("img")?;

        let doc = Html::parse_document(html);
        let mut out = Vec::new();

        for card in doc.select(&card_sel) {
            // A card without a title node is some other anchor reusing the class.
            let Some(title_el) = card.select(&title_sel).next() else {
                continue;
            };
            let title = clean_text(&title_el.text().collect::<String>());

            let link = card
                .value()
                .attr("href")
                .map(|href| {
                    if href.starts_with('/') {
                        format!("{ITEM_BASE_URL}{href}")
                    } else {
                        href.to_string()
                    }
                })
                .unwrap_or_default();

            if title.is_empty() || link.is_empty() {
                continue;
            }

            let native_price = card
                .select(&price_sel)
                .next()
                .map(|el| parse_price_text(&el.text().collect::<String>()))
                .unwrap_or(0);
            if native_price == 0 {
                warn!(link = %link, "kavak price did not parse, keeping zero");
            }

            let (year, km) = card
                .select(&subtitle_sel)
                .next()
                .map(|el| {
                    let text = el.text().collect::<String>();
                    (parse_year(&text), parse_km(&text))
                })
                .unwrap_or((None, None));

            let image = card
                .select(&img_sel)
                .next()
                .and_then(|el| usable_image(el.value().attr("src")));

            out.push(RawListing {
                source: Source::Kavak,
                title,
                native_price,
                currency: Currency::Usd,
                location: Some(DEFAULT_LOCATION.to_string()),
                image,
                link,
                year,
                km,
                published: None,
            });
        }

        let elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0;
        histogram!("source_parse_ms", "source" => Source::Kavak.as_str()).record(elapsed_ms);
        counter!("listings_parsed_total", "source" => Source::Kavak.as_str())
            .increment(out.len() as u64);
        Ok(out)
    }
}

fn sel(css: &str) -> Result<Selector, SourceError> {
    Selector::parse(css).map_err(|e| SourceError::Parse(format!("selector {css}: {e}")))
}

#[async_trait]
impl SourceAdapter for KavakAdapter {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RawListing>, SourceError> {
        let html = match &self.mode {
            Mode::Fixture(html) => html.clone(),
            Mode::Http { client, base_url } => {
                let url = Self::search_url(base_url, query);
                debug!(%url, "fetching kavak page");
                let resp = client.get(&url).send().await.map_err(SourceError::from)?;
                if !resp.status().is_success() {
                    return Err(SourceError::Unreachable(format!("status {}", resp.status())));
                }
                resp.text()
                    .await
                    .map_err(|e| SourceError::Parse(format!("body: {e}")))?
            }
        };

        let mut listings = Self::parse_page(&html)?;
        listings.truncate(limit);
        Ok(listings)
    }

    fn source(&self) -> Source {
        Source::Kavak
    }
}
