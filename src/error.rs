// src/error.rs
// Error taxonomy. Per-source and rate failures degrade inside the pipeline;
// only the variants of `QueryError` ever reach the caller.

use thiserror::Error;

/// Transient failure of one marketplace fetch. Caught at the aggregation
/// boundary and converted into zero contribution for that source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source timed out")]
    Timeout,
    #[error("source unreachable: {0}")]
    Unreachable(String),
    #[error("source response did not parse: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout
        } else if err.is_decode() || err.is_body() {
            SourceError::Parse(err.to_string())
        } else {
            SourceError::Unreachable(err.to_string())
        }
    }
}

/// Exchange rate could not be obtained and nothing is cached. Degrades
/// conversion of foreign-currency listings; never fails the whole query.
#[derive(Debug, Error)]
pub enum RateError {
    #[error("exchange rate unavailable: {0}")]
    Unavailable(String),
}

/// What the Query Service boundary surfaces.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Bad caller input; never retried.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    /// Every requested source failed; retryable by the caller.
    #[error("all requested sources failed")]
    AllSourcesFailed,
    /// Unexpected internal failure (wiring, client construction).
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
