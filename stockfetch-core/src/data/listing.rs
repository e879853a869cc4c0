//! Exchange listings from the NASDAQ stock screener.
//!
//! One GET per exchange; the `data.rows` array is saved verbatim as
//! `{listings_dir}/{exchange}.json`. Those files later feed the symbol source.

use super::provider::DataError;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

const SCREENER_URL: &str = "https://api.nasdaq.com/api/screener/stocks";
const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:85.0) Gecko/20100101 Firefox/85.0";

/// Exchanges covered by the screener, in load order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exchange {
    Nasdaq,
    Amex,
    Nyse,
}

impl Exchange {
    pub const ALL: [Exchange; 3] = [Exchange::Nasdaq, Exchange::Amex, Exchange::Nyse];

    pub fn as_str(self) -> &'static str {
        match self {
            Exchange::Nasdaq => "nasdaq",
            Exchange::Amex => "amex",
            Exchange::Nyse => "nyse",
        }
    }

    /// `nasdaq.json`, `amex.json`, `nyse.json`
    pub fn file_name(self) -> String {
        format!("{}.json", self.as_str())
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Exchange {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Exchange::ALL
            .into_iter()
            .find(|e| e.as_str() == lower)
            .ok_or_else(|| DataError::Listing(format!("unknown exchange '{s}'")))
    }
}

/// One screener row. Only `symbol` matters downstream; the rest is kept for
/// callers that want to filter by sector or market cap.
///
/// The screener is loose about types (`ipoyear` may be a string or a number),
/// so every field accepts any scalar and anything else reads as `None`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ListingRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub lastsale: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub netchange: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub pctchange: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub volume: Option<String>,
    #[serde(default, rename = "marketCap", deserialize_with = "lenient_string")]
    pub market_cap: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub ipoyear: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub industry: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub sector: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: Option<String>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// Path of the persisted listing for an exchange.
pub fn listing_path(listings_dir: &Path, exchange: Exchange) -> PathBuf {
    listings_dir.join(exchange.file_name())
}

/// Load the persisted listing for one exchange.
pub fn load_listing(listings_dir: &Path, exchange: Exchange) -> Result<Vec<ListingRecord>, DataError> {
    let path = listing_path(listings_dir, exchange);
    let content = fs::read_to_string(&path)
        .map_err(|e| DataError::Listing(format!("read {}: {e}", path.display())))?;
    let rows: Vec<Value> = serde_json::from_str(&content)
        .map_err(|e| DataError::Listing(format!("parse {}: {e}", path.display())))?;

    // A malformed row costs only that row.
    let records = rows
        .into_iter()
        .filter_map(|row| match ListingRecord::deserialize(row) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::debug!(%exchange, error = %e, "skipping malformed listing row");
                None
            }
        })
        .collect();
    Ok(records)
}

/// Pull `data.rows` out of a screener response. Missing or null parts yield
/// an empty list.
pub fn extract_rows(mut response: Value) -> Result<Vec<Value>, DataError> {
    let rows = response
        .get_mut("data")
        .and_then(|d| d.get_mut("rows"))
        .map(Value::take);

    match rows {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(rows)) => Ok(rows),
        Some(other) => Err(DataError::Listing(format!(
            "expected data.rows to be an array, got {other}"
        ))),
    }
}

/// HTTP client for the screener endpoint.
pub struct ListingClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl ListingClient {
    pub fn new() -> Result<Self, DataError> {
        Self::with_base_url(SCREENER_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn screener_url(&self, exchange: Exchange) -> String {
        format!("{}?exchange={exchange}&download=true", self.base_url)
    }

    /// Fetch the raw screener rows for one exchange.
    pub fn fetch_rows(&self, exchange: Exchange) -> Result<Vec<Value>, DataError> {
        let url = self.screener_url(exchange);
        tracing::debug!(%exchange, %url, "requesting screener listing");

        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DataError::Listing(format!("HTTP {status} for {exchange}")));
        }

        let body: Value = resp
            .json()
            .map_err(|e| DataError::Listing(format!("invalid JSON for {exchange}: {e}")))?;
        extract_rows(body)
    }

    /// Fetch one exchange and persist its rows. Returns the row count.
    pub fn fetch_and_save(&self, exchange: Exchange, listings_dir: &Path) -> Result<usize, DataError> {
        let rows = self.fetch_rows(exchange)?;
        save_rows(&rows, &listing_path(listings_dir, exchange))?;
        Ok(rows.len())
    }

    /// Fetch every requested exchange. A failure is logged and does not stop
    /// the remaining exchanges.
    pub fn fetch_all(
        &self,
        exchanges: &[Exchange],
        listings_dir: &Path,
    ) -> Vec<(Exchange, Result<usize, DataError>)> {
        exchanges
            .iter()
            .map(|&exchange| {
                let result = self.fetch_and_save(exchange, listings_dir);
                match &result {
                    Ok(count) => tracing::info!(
                        %exchange,
                        count,
                        path = %listing_path(listings_dir, exchange).display(),
                        "saved listing"
                    ),
                    Err(e) => tracing::error!(%exchange, error = %e, "failed to fetch listing"),
                }
                (exchange, result)
            })
            .collect()
    }
}

/// Write rows as pretty JSON, atomically.
pub fn save_rows(rows: &[Value], path: &Path) -> Result<(), DataError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| DataError::Listing(format!("create {}: {e}", parent.display())))?;
        }
    }

    let json = serde_json::to_string_pretty(rows)
        .map_err(|e| DataError::Listing(format!("serialize listing: {e}")))?;

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, json)
        .map_err(|e| DataError::Listing(format!("write {}: {e}", tmp_path.display())))?;
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        DataError::Listing(format!("rename into {}: {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn exchange_order_and_file_names() {
        let names: Vec<String> = Exchange::ALL.iter().map(|e| e.file_name()).collect();
        assert_eq!(names, vec!["nasdaq.json", "amex.json", "nyse.json"]);
        assert_eq!("NYSE".parse::<Exchange>().unwrap(), Exchange::Nyse);
        assert!("lse".parse::<Exchange>().is_err());
    }

    #[test]
    fn screener_url_format() {
        let client = ListingClient::new().unwrap();
        assert_eq!(
            client.screener_url(Exchange::Amex),
            "https://api.nasdaq.com/api/screener/stocks?exchange=amex&download=true"
        );
    }

    #[test]
    fn extract_rows_from_nested_payload() {
        let body = json!({
            "data": {
                "headers": {"symbol": "Symbol"},
                "rows": [{"symbol": "AAPL", "name": "Apple Inc."}, {"symbol": "MSFT"}]
            },
            "status": {"rCode": 200}
        });
        let rows = extract_rows(body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["symbol"], "AAPL");
    }

    #[test]
    fn extract_rows_missing_is_empty() {
        assert!(extract_rows(json!({"status": {}})).unwrap().is_empty());
        assert!(extract_rows(json!({"data": null})).unwrap().is_empty());
        assert!(extract_rows(json!({"data": {"rows": null}})).unwrap().is_empty());
        assert!(extract_rows(json!({"data": {"rows": 5}})).is_err());
    }

    #[test]
    fn saved_rows_load_as_records() {
        let tmp = tempfile::tempdir().unwrap();
        let rows = vec![
            json!({"symbol": "AAPL", "name": "Apple Inc.", "marketCap": "3000000000000", "extra": 1}),
            json!({"name": "No Symbol Corp"}),
        ];
        save_rows(&rows, &listing_path(tmp.path(), Exchange::Nasdaq)).unwrap();

        let records = load_listing(tmp.path(), Exchange::Nasdaq).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].symbol.as_deref(), Some("AAPL"));
        assert_eq!(records[0].market_cap.as_deref(), Some("3000000000000"));
        assert_eq!(records[1].symbol, None);
    }

    #[test]
    fn mistyped_fields_do_not_drop_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let rows = vec![
            json!({"symbol": "AAPL", "ipoyear": 1980, "lastsale": null, "url": {"href": "x"}}),
            json!({"symbol": "MSFT", "volume": 21_000_000}),
            json!("not an object"),
        ];
        save_rows(&rows, &listing_path(tmp.path(), Exchange::Nasdaq)).unwrap();

        let records = load_listing(tmp.path(), Exchange::Nasdaq).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].symbol.as_deref(), Some("AAPL"));
        assert_eq!(records[0].ipoyear.as_deref(), Some("1980"));
        assert_eq!(records[0].lastsale, None);
        assert_eq!(records[0].url, None);
        assert_eq!(records[1].volume.as_deref(), Some("21000000"));
    }

    #[test]
    fn missing_listing_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(load_listing(tmp.path(), Exchange::Amex).is_err());
    }
}
