//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over market-data sources so the download
//! controller can be exercised against a mock in tests.

use super::range::TimeRange;
use chrono::NaiveDate;
use thiserror::Error;

/// Raw daily OHLCV bar as returned by a data provider.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: u64,
}

/// Structured error types for data operations.
///
/// Every variant is displayable in log output; none of them aborts a batch run.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no rows returned for {symbol} (delisted or invalid symbol?)")]
    EmptySeries { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("listing error: {0}")]
    Listing(String),

    #[error("data error: {0}")]
    Other(String),
}

/// Result of a successful data fetch for a single symbol.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    pub bars: Vec<RawBar>,
}

/// Trait for market-data providers.
///
/// Providers only fetch. Persisting the bars is the storage layer's job.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily OHLCV bars for a symbol over a time range.
    fn fetch(&self, symbol: &str, range: &TimeRange) -> Result<FetchResult, DataError>;
}
