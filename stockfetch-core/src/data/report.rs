//! Read-only reporting: run summaries, storage statistics, listing counts.

use super::download::RunSummary;
use super::listing::{listing_path, load_listing, Exchange};
use super::store::is_artifact;
use std::fs;
use std::path::Path;

/// On-disk artifact statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStats {
    pub artifact_count: usize,
    pub total_bytes: u64,
}

impl StorageStats {
    pub fn total_megabytes(&self) -> f64 {
        self.total_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Count `*.csv` artifacts in `storage_dir` and sum their sizes.
/// A missing directory reports zeros.
pub fn inspect_storage(storage_dir: &Path) -> StorageStats {
    let Ok(entries) = fs::read_dir(storage_dir) else {
        tracing::info!(dir = %storage_dir.display(), "storage directory does not exist");
        return StorageStats::default();
    };

    entries
        .flatten()
        .filter(|entry| is_artifact(&entry.path()))
        .fold(StorageStats::default(), |mut stats, entry| {
            stats.artifact_count += 1;
            stats.total_bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
            stats
        })
}

/// Log storage statistics and return the report text.
pub fn report_storage(storage_dir: &Path) -> String {
    let stats = inspect_storage(storage_dir);
    tracing::info!(
        files = stats.artifact_count,
        megabytes = stats.total_megabytes(),
        "storage statistics"
    );
    format!(
        "Downloaded files: {}\nTotal size: {:.2} MB",
        stats.artifact_count,
        stats.total_megabytes()
    )
}

/// Log the run counters and return a one-line summary.
pub fn summarize(summary: &RunSummary) -> String {
    if !summary.failed_symbols.is_empty() {
        tracing::warn!(symbols = ?summary.failed_symbols, "failed symbols");
    }
    let line = format!(
        "Download finished: {} succeeded ({} downloaded, {} already present), {} failed, {} total",
        summary.succeeded,
        summary.downloaded(),
        summary.skipped,
        summary.failed,
        summary.total
    );
    tracing::info!("{line}");
    line
}

/// Listing status for one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingCount {
    Count(usize),
    Missing,
    Unreadable(String),
}

/// Count records per persisted exchange listing.
pub fn summarize_listings(listings_dir: &Path) -> Vec<(Exchange, ListingCount)> {
    Exchange::ALL
        .into_iter()
        .map(|exchange| {
            let count = if !listing_path(listings_dir, exchange).exists() {
                ListingCount::Missing
            } else {
                match load_listing(listings_dir, exchange) {
                    Ok(records) => ListingCount::Count(records.len()),
                    Err(e) => ListingCount::Unreadable(e.to_string()),
                }
            };
            (exchange, count)
        })
        .collect()
}

/// Render the listing analysis table.
pub fn format_listing_report(counts: &[(Exchange, ListingCount)]) -> String {
    let mut out = String::new();
    out.push_str(&"=".repeat(50));
    out.push_str("\nListing report\n");
    out.push_str(&"=".repeat(50));
    out.push('\n');

    let mut total = 0;
    for (exchange, count) in counts {
        let name = exchange.as_str().to_uppercase();
        match count {
            ListingCount::Count(n) => {
                total += n;
                out.push_str(&format!("{name:>6}: {n:>5} symbols\n"));
            }
            ListingCount::Missing => out.push_str(&format!("{name:>6}: file not found\n")),
            ListingCount::Unreadable(reason) => {
                out.push_str(&format!("{name:>6}: unreadable - {reason}\n"))
            }
        }
    }

    out.push_str(&"-".repeat(50));
    out.push_str(&format!("\n{:>6}: {total:>5} symbols\n", "Total"));
    out.push_str(&"=".repeat(50));
    out
}
