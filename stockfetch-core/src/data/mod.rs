//! Symbol sources, market data, storage and the batch download controller.

pub mod circuit_breaker;
pub mod download;
pub mod listing;
pub mod provider;
pub mod range;
pub mod report;
pub mod store;
pub mod symbols;
pub mod yahoo;

pub use circuit_breaker::CircuitBreaker;
pub use download::{
    download_batches, BatchProgress, DownloadOutcome, Pacer, ProviderFetcher, RunSummary,
    SeriesFetcher, ThreadPacer, TracingProgress,
};
pub use listing::{Exchange, ListingClient, ListingRecord};
pub use provider::{DataError, DataProvider, FetchResult, RawBar};
pub use range::{Period, TimeRange};
pub use report::{inspect_storage, summarize, StorageStats};
pub use store::CsvStore;
pub use symbols::SymbolSource;
pub use yahoo::YahooProvider;
