//! CSV artifact store: one file per symbol.
//!
//! Layout: `{storage_dir}/{SYMBOL}.csv`
//!
//! - Atomic writes (write to `.csv.tmp`, rename into place), so a file with
//!   the final name is always complete
//! - Presence of `{SYMBOL}.csv` is the only "already downloaded" signal;
//!   there is no staleness check

use super::provider::{DataError, RawBar};
use std::fs;
use std::path::{Path, PathBuf};

/// File extension of completed artifacts.
pub const ARTIFACT_EXTENSION: &str = "csv";

const HEADER: [&str; 7] = ["Date", "Open", "High", "Low", "Close", "Adj Close", "Volume"];

pub struct CsvStore {
    storage_dir: PathBuf,
}

impl CsvStore {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Create the storage directory if needed.
    pub fn ensure_dir(&self) -> Result<(), DataError> {
        if !self.storage_dir.exists() {
            fs::create_dir_all(&self.storage_dir).map_err(|e| {
                DataError::Storage(format!(
                    "failed to create {}: {e}",
                    self.storage_dir.display()
                ))
            })?;
            tracing::info!(dir = %self.storage_dir.display(), "created storage directory");
        }
        Ok(())
    }

    /// `{storage_dir}/{SYMBOL}.csv`
    pub fn artifact_path(&self, symbol: &str) -> PathBuf {
        self.storage_dir
            .join(format!("{symbol}.{ARTIFACT_EXTENSION}"))
    }

    fn tmp_path(&self, symbol: &str) -> PathBuf {
        self.storage_dir
            .join(format!("{symbol}.{ARTIFACT_EXTENSION}.tmp"))
    }

    /// Whether a completed artifact exists for `symbol`.
    pub fn exists(&self, symbol: &str) -> bool {
        self.artifact_path(symbol).is_file()
    }

    /// Write bars for a symbol. Returns the number of rows written.
    pub fn write(&self, symbol: &str, bars: &[RawBar]) -> Result<usize, DataError> {
        if bars.is_empty() {
            return Err(DataError::EmptySeries {
                symbol: symbol.to_string(),
            });
        }

        self.ensure_dir()?;

        let path = self.artifact_path(symbol);
        let tmp_path = self.tmp_path(symbol);

        if let Err(e) = write_csv(&tmp_path, bars) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::Storage(format!("atomic rename failed for {symbol}: {e}"))
        })?;

        Ok(bars.len())
    }
}

/// Completed artifacts match on extension; `.csv.tmp` leftovers do not.
pub(crate) fn is_artifact(path: &Path) -> bool {
    path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(ARTIFACT_EXTENSION)
}

fn write_csv(path: &Path, bars: &[RawBar]) -> Result<(), DataError> {
    let map_err = |e: csv::Error| DataError::Storage(format!("write {}: {e}", path.display()));

    let mut wtr = csv::Writer::from_path(path).map_err(map_err)?;
    wtr.write_record(HEADER).map_err(map_err)?;

    for bar in bars {
        wtr.write_record([
            bar.date.format("%Y-%m-%d").to_string(),
            format_price(bar.open),
            format_price(bar.high),
            format_price(bar.low),
            format_price(bar.close),
            format_price(bar.adj_close),
            bar.volume.to_string(),
        ])
        .map_err(map_err)?;
    }

    wtr.flush()
        .map_err(|e| DataError::Storage(format!("flush {}: {e}", path.display())))?;
    Ok(())
}

// Missing prices are left blank rather than written as "NaN".
fn format_price(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.6}")
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_bars() -> Vec<RawBar> {
        vec![
            RawBar {
                date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                open: 100.0,
                high: 102.0,
                low: 99.0,
                close: 101.0,
                adj_close: 100.5,
                volume: 1000,
            },
            RawBar {
                date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
                open: 101.0,
                high: 103.0,
                low: f64::NAN,
                close: 102.0,
                adj_close: 101.5,
                volume: 1100,
            },
        ]
    }

    #[test]
    fn write_creates_dir_and_csv() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CsvStore::new(tmp.path().join("stock_data"));

        assert!(!store.exists("SPY"));
        let rows = store.write("SPY", &sample_bars()).unwrap();
        assert_eq!(rows, 2);
        assert!(store.exists("SPY"));

        let content = fs::read_to_string(store.artifact_path("SPY")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "Date,Open,High,Low,Close,Adj Close,Volume");
        assert_eq!(
            lines[1],
            "2024-01-02,100.000000,102.000000,99.000000,101.000000,100.500000,1000"
        );
        assert_eq!(lines[2], "2024-01-03,101.000000,103.000000,,102.000000,101.500000,1100");
        assert!(!store.tmp_path("SPY").exists());
    }

    #[test]
    fn empty_series_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CsvStore::new(tmp.path());

        assert!(matches!(
            store.write("DEAD", &[]),
            Err(DataError::EmptySeries { .. })
        ));
        assert!(!store.exists("DEAD"));
    }

    #[test]
    fn leftover_tmp_file_is_not_an_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CsvStore::new(tmp.path());
        fs::write(store.tmp_path("MSFT"), "Date,Open\n2024-01").unwrap();

        assert!(!store.exists("MSFT"));
        assert!(!is_artifact(&store.tmp_path("MSFT")));
    }

    #[test]
    fn missing_dir_has_no_artifacts() {
        let store = CsvStore::new("/nonexistent/stockfetch/data");
        assert!(!store.exists("SPY"));
    }
}
