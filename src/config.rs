// src/config.rs
// Engine tunables: coded defaults with CARSCAN_* environment overrides.
// Bad values fall back to the default with a warn, never a panic.

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::model::Source;

const ENV_SOURCE_TIMEOUT: &str = "CARSCAN_SOURCE_TIMEOUT_SECS";
const ENV_LIMIT_PER_SOURCE: &str = "CARSCAN_LIMIT_PER_SOURCE";
const ENV_MAX_RESULTS: &str = "CARSCAN_MAX_RESULTS";
const ENV_RATE_TTL: &str = "CARSCAN_RATE_TTL_SECS";
const ENV_SOURCE_PRIORITY: &str = "CARSCAN_SOURCE_PRIORITY";

/// Engine-wide configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on one adapter fetch; a slower source contributes nothing.
    pub per_source_timeout: Duration,
    /// Top-N records each adapter considers, in source-native ranking order.
    pub limit_per_source: usize,
    /// Global cap on the merged result set, applied before pagination.
    pub max_results: usize,
    /// How long a fetched exchange rate is served without a refresh.
    pub rate_ttl: Duration,
    /// Dedup winner and ordering tie-break order across sources.
    pub source_priority: Vec<Source>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            per_source_timeout: Duration::from_secs(8),
            limit_per_source: 48,
            max_results: 100,
            rate_ttl: Duration::from_secs(600),
            source_priority: Source::ALL.to_vec(),
        }
    }
}

impl EngineConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(secs) = env_parse::<u64>(ENV_SOURCE_TIMEOUT) {
            cfg.per_source_timeout = Duration::from_secs(secs);
        }
        if let Some(n) = env_parse::<usize>(ENV_LIMIT_PER_SOURCE) {
            cfg.limit_per_source = n;
        }
        if let Some(n) = env_parse::<usize>(ENV_MAX_RESULTS) {
            cfg.max_results = n;
        }
        if let Some(secs) = env_parse::<u64>(ENV_RATE_TTL) {
            cfg.rate_ttl = Duration::from_secs(secs);
        }
        if let Ok(raw) = std::env::var(ENV_SOURCE_PRIORITY) {
            let parsed = parse_priority(&raw);
            if parsed.is_empty() {
                warn!(value = %raw, "no usable sources in {ENV_SOURCE_PRIORITY}, keeping default");
            } else {
                cfg.source_priority = parsed;
            }
        }
        cfg
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable env override");
            None
        }
    }
}

/// Comma-separated source identifiers; unknown entries are skipped.
fn parse_priority(raw: &str) -> Vec<Source> {
    let mut out = Vec::new();
    for token in raw.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        match token.parse::<Source>() {
            Ok(src) => {
                if !out.contains(&src) {
                    out.push(src);
                }
            }
            Err(_) => warn!(token, "unknown source in {ENV_SOURCE_PRIORITY}, skipping"),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn priority_parse_skips_unknown_and_dups() {
        let out = parse_priority("kavak, nosuch,mercadolibre,kavak");
        assert_eq!(out, vec![Source::Kavak, Source::MercadoLibre]);
        assert!(parse_priority(" ,nosuch").is_empty());
    }

    #[serial_test::serial]
    #[test]
    fn env_overrides_and_fallbacks() {
        env::set_var(ENV_SOURCE_TIMEOUT, "3");
        env::set_var(ENV_MAX_RESULTS, "not-a-number");
        env::set_var(ENV_SOURCE_PRIORITY, "kavak,mercadolibre");

        let cfg = EngineConfig::from_env();
        assert_eq!(cfg.per_source_timeout, Duration::from_secs(3));
        // unparseable value keeps the default
        assert_eq!(cfg.max_results, EngineConfig::default().max_results);
        assert_eq!(
            cfg.source_priority,
            vec![Source::Kavak, Source::MercadoLibre]
        );

        env::remove_var(ENV_SOURCE_TIMEOUT);
        env::remove_var(ENV_MAX_RESULTS);
        env::remove_var(ENV_SOURCE_PRIORITY);
    }
}
