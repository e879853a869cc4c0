//! Yahoo Finance data provider.
//!
//! Fetches daily OHLCV bars from Yahoo's v8 chart API. One request per call:
//! the batch controller owns pacing, and a failed symbol is simply counted.
//! The circuit breaker turns a ban or sustained throttling into fast failures.
//!
//! Yahoo Finance has no official API and is subject to unannounced format changes.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataError, DataProvider, FetchResult, RawBar};
use super::range::TimeRange;
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const CHART_BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl YahooProvider {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
        })
    }

    /// Build the chart API URL. `today` closes an open-ended date window.
    fn chart_url(symbol: &str, range: &TimeRange, today: NaiveDate) -> String {
        match range {
            TimeRange::Period(period) => format!(
                "{CHART_BASE_URL}/{symbol}?range={period}&interval=1d&includeAdjustedClose=true"
            ),
            TimeRange::Dates { start, end } => {
                let start_ts = start.and_time(NaiveTime::MIN).and_utc().timestamp();
                let end_ts = end
                    .unwrap_or(today)
                    .and_time(NaiveTime::MIN)
                    .and_utc()
                    .timestamp()
                    + 86_399;
                format!(
                    "{CHART_BASE_URL}/{symbol}?period1={start_ts}&period2={end_ts}\
                     &interval=1d&includeAdjustedClose=true"
                )
            }
        }
    }

    /// Parse the chart API response into RawBars.
    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<Vec<RawBar>, DataError> {
        let result = match (resp.chart.result, resp.chart.error) {
            (Some(result), _) => result,
            (None, Some(err)) if err.code == "Not Found" => {
                return Err(DataError::SymbolNotFound {
                    symbol: symbol.to_string(),
                })
            }
            (None, Some(err)) => {
                return Err(DataError::ResponseFormatChanged(format!(
                    "{}: {}",
                    err.code, err.description
                )))
            }
            (None, None) => {
                return Err(DataError::ResponseFormatChanged(
                    "empty result with no error".into(),
                ))
            }
        };

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

        // A valid symbol with no trades in the window comes back without timestamps.
        let Some(timestamps) = data.timestamp else {
            return Err(DataError::EmptySeries {
                symbol: symbol.to_string(),
            });
        };

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

        let adj_closes = data
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose);

        let mut bars = Vec::with_capacity(timestamps.len());

        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.date_naive())
                .ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            let open = quote.open.get(i).copied().flatten();
            let high = quote.high.get(i).copied().flatten();
            let low = quote.low.get(i).copied().flatten();
            let close = quote.close.get(i).copied().flatten();
            let volume = quote.volume.get(i).copied().flatten();

            // Holidays and halted sessions come back as all-null rows.
            if open.is_none()
                && high.is_none()
                && low.is_none()
                && close.is_none()
                && volume.is_none()
            {
                continue;
            }

            let close = close.unwrap_or(f64::NAN);
            let adj_close = adj_closes
                .as_ref()
                .and_then(|v| v.get(i).copied().flatten())
                .unwrap_or(close);

            bars.push(RawBar {
                date,
                open: open.unwrap_or(f64::NAN),
                high: high.unwrap_or(f64::NAN),
                low: low.unwrap_or(f64::NAN),
                close,
                adj_close,
                volume: volume.unwrap_or(0),
            });
        }

        if bars.is_empty() {
            return Err(DataError::EmptySeries {
                symbol: symbol.to_string(),
            });
        }

        Ok(bars)
    }

    fn request(&self, symbol: &str, range: &TimeRange) -> Result<Vec<RawBar>, DataError> {
        if !self.circuit_breaker.is_allowed() {
            tracing::debug!(
                %symbol,
                remaining_secs = self.circuit_breaker.remaining_cooldown().as_secs(),
                "circuit breaker open, request not sent"
            );
            return Err(DataError::CircuitBreakerTripped);
        }

        let url = Self::chart_url(symbol, range, chrono::Local::now().date_naive());
        tracing::debug!(%symbol, %url, "requesting chart");

        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;
        let status = resp.status();

        if status == reqwest::StatusCode::FORBIDDEN {
            self.circuit_breaker.trip();
            return Err(DataError::CircuitBreakerTripped);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            self.circuit_breaker.record_failure();
            let retry_after_secs = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(DataError::RateLimited { retry_after_secs });
        }

        // Yahoo answers unknown symbols with 404 and a JSON error body.
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        if !status.is_success() {
            self.circuit_breaker.record_failure();
            return Err(DataError::Other(format!("HTTP {status} for {symbol}")));
        }

        let chart: ChartResponse = resp.json().map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
        })?;

        self.circuit_breaker.record_success();
        Self::parse_response(symbol, chart)
    }
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(&self, symbol: &str, range: &TimeRange) -> Result<FetchResult, DataError> {
        let bars = self.request(symbol, range)?;
        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::range::Period;

    fn parse(symbol: &str, json: &str) -> Result<Vec<RawBar>, DataError> {
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        YahooProvider::parse_response(symbol, resp)
    }

    #[test]
    fn period_url_uses_range_token() {
        let url = YahooProvider::chart_url(
            "AAPL",
            &TimeRange::Period(Period::YearToDate),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        );
        assert_eq!(
            url,
            "https://query2.finance.yahoo.com/v8/finance/chart/AAPL\
             ?range=ytd&interval=1d&includeAdjustedClose=true"
        );
    }

    #[test]
    fn date_url_covers_whole_end_day() {
        let range = TimeRange::Dates {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: Some(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()),
        };
        let url = YahooProvider::chart_url("MSFT", &range, NaiveDate::default());
        // 2024-01-01T00:00:00Z and 2024-01-02T23:59:59Z
        assert!(url.contains("period1=1704067200&period2=1704239999"));
    }

    #[test]
    fn open_ended_dates_stop_at_today() {
        let range = TimeRange::Dates {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: None,
        };
        let url = YahooProvider::chart_url("MSFT", &range, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert!(url.contains("period1=1704067200&period2=1704153599"));
    }

    #[test]
    fn parses_bars_and_skips_null_rows() {
        let json = r#"{"chart":{"result":[{
            "timestamp":[1704205800,1704292200,1704378600],
            "indicators":{
                "quote":[{
                    "open":[187.15,null,182.15],
                    "high":[188.44,null,183.09],
                    "low":[183.89,null,180.88],
                    "close":[185.64,null,181.91],
                    "volume":[82488700,null,71983600]
                }],
                "adjclose":[{"adjclose":[184.94,null,181.22]}]
            }
        }],"error":null}}"#;

        let bars = parse("AAPL", json).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bars[0].close, 185.64);
        assert_eq!(bars[0].adj_close, 184.94);
        assert_eq!(bars[1].volume, 71983600);
    }

    #[test]
    fn missing_adjclose_falls_back_to_close() {
        let json = r#"{"chart":{"result":[{
            "timestamp":[1704205800],
            "indicators":{"quote":[{"open":[1.0],"high":[2.0],"low":[0.5],"close":[1.5],"volume":[10]}]}
        }],"error":null}}"#;

        let bars = parse("X", json).unwrap();
        assert_eq!(bars[0].adj_close, 1.5);
    }

    #[test]
    fn not_found_error_maps_to_symbol_not_found() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        assert!(matches!(
            parse("ZZZZ", json),
            Err(DataError::SymbolNotFound { symbol }) if symbol == "ZZZZ"
        ));
    }

    #[test]
    fn no_timestamps_is_empty_series() {
        let json = r#"{"chart":{"result":[{"indicators":{"quote":[{}]}}],"error":null}}"#;
        assert!(matches!(parse("OLD", json), Err(DataError::EmptySeries { .. })));
    }

    #[test]
    fn all_null_rows_is_empty_series() {
        let json = r#"{"chart":{"result":[{
            "timestamp":[1704205800],
            "indicators":{"quote":[{"open":[null],"high":[null],"low":[null],"close":[null],"volume":[null]}]}
        }],"error":null}}"#;
        assert!(matches!(parse("OLD", json), Err(DataError::EmptySeries { .. })));
    }
}
