//! Symbol sources: explicit lists, line-delimited files, persisted listings.
//!
//! Loading never fails. A missing or unreadable source contributes no
//! symbols and logs a warning; the caller decides what an empty result means.

use super::listing::{load_listing, Exchange};
use std::fs;
use std::path::PathBuf;

/// Where the symbols for a run come from.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolSource {
    /// Symbols given directly, e.g. on the command line.
    List(Vec<String>),
    /// One symbol per line.
    File(PathBuf),
    /// Every persisted exchange listing in this directory.
    Listings(PathBuf),
}

impl SymbolSource {
    /// Produce the ordered symbol sequence. Order is preserved and duplicates are kept.
    pub fn load(&self) -> Vec<String> {
        match self {
            SymbolSource::List(raw) => {
                let symbols: Vec<String> = raw.iter().filter_map(|s| normalize(s)).collect();
                tracing::info!(count = symbols.len(), "using symbols from command line");
                symbols
            }
            SymbolSource::File(path) => match fs::read_to_string(path) {
                Ok(content) => {
                    let symbols: Vec<String> = content.lines().filter_map(normalize).collect();
                    tracing::info!(
                        count = symbols.len(),
                        path = %path.display(),
                        "loaded symbols from file"
                    );
                    symbols
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to read symbols file");
                    Vec::new()
                }
            },
            SymbolSource::Listings(dir) => {
                let mut symbols = Vec::new();
                for exchange in Exchange::ALL {
                    match load_listing(dir, exchange) {
                        Ok(records) => {
                            let before = symbols.len();
                            symbols.extend(
                                records
                                    .into_iter()
                                    .filter_map(|r| r.symbol)
                                    .filter_map(|s| normalize(&s)),
                            );
                            tracing::info!(
                                %exchange,
                                count = symbols.len() - before,
                                "loaded symbols from listing"
                            );
                        }
                        Err(e) => tracing::warn!(%exchange, error = %e, "listing unavailable"),
                    }
                }
                tracing::info!(total = symbols.len(), "loaded symbols from listings");
                symbols
            }
        }
    }

    /// The first `n` symbols of this source.
    pub fn sample(&self, n: usize) -> Vec<String> {
        let mut symbols = self.load();
        symbols.truncate(n);
        tracing::info!(count = symbols.len(), "using sample of symbols");
        symbols
    }
}

/// Trim and uppercase; blank input yields `None`.
///
/// Class-share slashes (`BRK/B`) become the provider's dash form (`BRK-B`).
/// A symbol names both a file and a URL path segment, so anything outside
/// `[A-Z0-9.^=_-]`, or made only of dots, is rejected.
pub fn normalize(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let symbol = trimmed.to_uppercase().replace('/', "-");
    let allowed = symbol
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '^' | '=' | '_' | '-'));
    if !allowed || symbol.chars().all(|c| c == '.') {
        tracing::warn!(symbol = trimmed, "ignoring invalid symbol");
        return None;
    }
    Some(symbol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::listing::{listing_path, save_rows};
    use serde_json::json;

    #[test]
    fn list_uppercases_and_keeps_order_and_duplicates() {
        let source = SymbolSource::List(vec!["msft".into(), "aapl".into(), "MSFT".into()]);
        assert_eq!(source.load(), vec!["MSFT", "AAPL", "MSFT"]);
    }

    #[test]
    fn file_skips_blank_lines_and_trims() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("symbols.txt");
        fs::write(&path, "aapl\n\n  goog \r\n\t\nbrk-b\n").unwrap();

        let source = SymbolSource::File(path);
        assert_eq!(source.load(), vec!["AAPL", "GOOG", "BRK-B"]);
    }

    #[test]
    fn missing_file_yields_nothing() {
        let source = SymbolSource::File(PathBuf::from("/nonexistent/symbols.txt"));
        assert!(source.load().is_empty());
    }

    #[test]
    fn listings_concatenate_in_exchange_order() {
        let tmp = tempfile::tempdir().unwrap();
        save_rows(
            &[json!({"symbol": "NYA"}), json!({"symbol": "NYB"})],
            &listing_path(tmp.path(), Exchange::Nyse),
        )
        .unwrap();
        save_rows(
            &[json!({"symbol": "AAPL"}), json!({"name": "no symbol"}), json!({"symbol": ""})],
            &listing_path(tmp.path(), Exchange::Nasdaq),
        )
        .unwrap();
        // amex.json missing on purpose

        let source = SymbolSource::Listings(tmp.path().to_path_buf());
        assert_eq!(source.load(), vec!["AAPL", "NYA", "NYB"]);
    }

    #[test]
    fn numeric_listing_fields_keep_the_exchange() {
        let tmp = tempfile::tempdir().unwrap();
        save_rows(
            &[json!({"symbol": "AAPL", "ipoyear": 1980}), json!({"symbol": "MSFT"})],
            &listing_path(tmp.path(), Exchange::Nasdaq),
        )
        .unwrap();

        let source = SymbolSource::Listings(tmp.path().to_path_buf());
        assert_eq!(source.load(), vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn corrupt_listing_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(listing_path(tmp.path(), Exchange::Nasdaq), "{not json").unwrap();
        save_rows(&[json!({"symbol": "XYZ"})], &listing_path(tmp.path(), Exchange::Amex)).unwrap();

        let source = SymbolSource::Listings(tmp.path().to_path_buf());
        assert_eq!(source.load(), vec!["XYZ"]);
    }

    #[test]
    fn class_share_slash_becomes_dash() {
        assert_eq!(normalize("brk/b").as_deref(), Some("BRK-B"));
        assert_eq!(normalize("^gspc").as_deref(), Some("^GSPC"));
        assert_eq!(normalize("eurusd=x").as_deref(), Some("EURUSD=X"));
    }

    #[test]
    fn path_like_symbols_rejected() {
        assert_eq!(normalize(".."), None);
        assert_eq!(normalize("."), None);
        assert_eq!(normalize("..\\WIN"), None);
        assert_eq!(normalize("A B"), None);
        assert_eq!(normalize("AAPL?x=1"), None);

        let source = SymbolSource::List(vec!["aapl".into(), "..".into(), "brk/a".into()]);
        assert_eq!(source.load(), vec!["AAPL", "BRK-A"]);
    }

    #[test]
    fn sample_takes_prefix() {
        let source = SymbolSource::List(vec!["a".into(), "b".into(), "c".into()]);
        assert_eq!(source.sample(2), vec!["A", "B"]);
        assert_eq!(source.sample(10).len(), 3);
    }
}
