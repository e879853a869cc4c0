//! Batch download controller: partitions symbols into batches, paces
//! requests, skips symbols already on disk, and tallies outcomes.
//!
//! The loop is sequential on purpose. Pacing is the rate limit; there is no
//! retry and no cancellation. An interrupted run resumes on the next
//! invocation because completed artifacts are skipped.

use super::provider::{DataError, DataProvider};
use super::range::TimeRange;
use super::store::CsvStore;
use crate::config::BatchJobConfig;
use std::time::Duration;

/// Per-symbol result of one run. Never persisted.
#[derive(Debug)]
pub enum DownloadOutcome {
    /// Fetched and written `rows` rows.
    Success { rows: usize },
    /// Artifact already present; the fetcher was not called.
    Skipped,
    Failed(DataError),
}

/// Run-level counters.
///
/// `total == succeeded + failed` always holds. `skipped` is the part of
/// `succeeded` that was already on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failed_symbols: Vec<String>,
}

impl RunSummary {
    pub fn record(&mut self, symbol: &str, outcome: &DownloadOutcome) {
        self.total += 1;
        match outcome {
            DownloadOutcome::Success { .. } => self.succeeded += 1,
            DownloadOutcome::Skipped => {
                self.succeeded += 1;
                self.skipped += 1;
            }
            DownloadOutcome::Failed(_) => {
                self.failed += 1;
                self.failed_symbols.push(symbol.to_string());
            }
        }
    }

    /// Symbols actually fetched during this run.
    pub fn downloaded(&self) -> usize {
        self.succeeded - self.skipped
    }
}

/// Fetches one symbol and persists it. Returns the number of rows written.
pub trait SeriesFetcher {
    fn fetch(&self, symbol: &str, range: &TimeRange) -> Result<usize, DataError>;
}

/// Fetcher backed by a market-data provider and the CSV store.
pub struct ProviderFetcher<'a> {
    provider: &'a dyn DataProvider,
    store: &'a CsvStore,
}

impl<'a> ProviderFetcher<'a> {
    pub fn new(provider: &'a dyn DataProvider, store: &'a CsvStore) -> Self {
        Self { provider, store }
    }
}

impl SeriesFetcher for ProviderFetcher<'_> {
    fn fetch(&self, symbol: &str, range: &TimeRange) -> Result<usize, DataError> {
        let result = self.provider.fetch(symbol, range)?;
        if result.bars.is_empty() {
            return Err(DataError::EmptySeries {
                symbol: symbol.to_string(),
            });
        }
        self.store.write(&result.symbol, &result.bars)
    }
}

/// Pacing between requests. Tests substitute a recorder to count calls
/// without waiting.
pub trait Pacer {
    /// Pause after an item that is not the last in its batch.
    fn between_items(&self, delay: Duration);

    /// Pause after every batch except the last.
    fn between_batches(&self, delay: Duration);
}

/// Blocks the current thread for the requested delay.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn between_items(&self, delay: Duration) {
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }

    fn between_batches(&self, delay: Duration) {
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

/// Observer for a batch run.
pub trait BatchProgress {
    fn on_run_start(&self, total: usize, batch_count: usize, config: &BatchJobConfig);

    /// `batch_index` is 0-based.
    fn on_batch_start(&self, batch_index: usize, batch_count: usize, batch_len: usize);

    fn on_item_complete(&self, symbol: &str, store: &CsvStore, outcome: &DownloadOutcome);

    fn on_batch_pause(&self, batch_index: usize, delay: Duration);

    fn on_run_complete(&self, summary: &RunSummary);
}

/// Reports progress as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl BatchProgress for TracingProgress {
    fn on_run_start(&self, total: usize, batch_count: usize, config: &BatchJobConfig) {
        tracing::info!(
            total,
            batches = batch_count,
            batch_size = config.batch_size(),
            delay_secs = config.inter_item_delay().as_secs_f64(),
            range = %config.time_range(),
            "starting download"
        );
    }

    fn on_batch_start(&self, batch_index: usize, batch_count: usize, batch_len: usize) {
        tracing::info!(
            "processing batch {}/{} ({batch_len} symbols)",
            batch_index + 1,
            batch_count
        );
    }

    fn on_item_complete(&self, symbol: &str, store: &CsvStore, outcome: &DownloadOutcome) {
        match outcome {
            DownloadOutcome::Success { rows } => tracing::info!(
                %symbol,
                rows,
                path = %store.artifact_path(symbol).display(),
                "downloaded"
            ),
            DownloadOutcome::Skipped => {
                tracing::info!(%symbol, "already downloaded, skipping")
            }
            DownloadOutcome::Failed(e @ DataError::EmptySeries { .. }) => {
                tracing::warn!(%symbol, "{e}")
            }
            DownloadOutcome::Failed(e) => tracing::error!(%symbol, error = %e, "download failed"),
        }
    }

    fn on_batch_pause(&self, batch_index: usize, delay: Duration) {
        tracing::info!(
            "batch {} complete, waiting {:.1}s before continuing",
            batch_index + 1,
            delay.as_secs_f64()
        );
    }

    fn on_run_complete(&self, summary: &RunSummary) {
        tracing::info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            "download complete"
        );
    }
}

/// Download every symbol in batches of `config.batch_size()`.
///
/// Per symbol: skip if `{SYMBOL}.csv` exists, otherwise fetch. Within a batch
/// the controller waits `inter_item_delay` after each symbol except the last;
/// between batches it waits twice that. Item failures are counted, never
/// propagated.
pub fn download_batches(
    symbols: &[String],
    config: &BatchJobConfig,
    store: &CsvStore,
    fetcher: &dyn SeriesFetcher,
    pacer: &dyn Pacer,
    progress: &dyn BatchProgress,
) -> RunSummary {
    let mut summary = RunSummary::default();
    let batch_count = config.batch_count(symbols.len());

    progress.on_run_start(symbols.len(), batch_count, config);

    if symbols.is_empty() {
        progress.on_run_complete(&summary);
        return summary;
    }

    // Writes create the directory too; this only surfaces the problem early.
    if let Err(e) = store.ensure_dir() {
        tracing::error!(error = %e, "storage directory unavailable, downloads will fail");
    }

    for (batch_index, batch) in symbols.chunks(config.batch_size()).enumerate() {
        progress.on_batch_start(batch_index, batch_count, batch.len());

        for (i, symbol) in batch.iter().enumerate() {
            let outcome = if store.exists(symbol) {
                DownloadOutcome::Skipped
            } else {
                match fetcher.fetch(symbol, config.time_range()) {
                    Ok(rows) => DownloadOutcome::Success { rows },
                    Err(e) => DownloadOutcome::Failed(e),
                }
            };

            progress.on_item_complete(symbol, store, &outcome);
            summary.record(symbol, &outcome);

            if i + 1 < batch.len() {
                pacer.between_items(config.inter_item_delay());
            }
        }

        if batch_index + 1 < batch_count {
            progress.on_batch_pause(batch_index, config.inter_batch_delay());
            pacer.between_batches(config.inter_batch_delay());
        }
    }

    progress.on_run_complete(&summary);
    summary
}
