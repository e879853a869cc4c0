//! stockfetch core: bulk retrieval of daily price history for exchange-listed symbols.
//!
//! - Symbol sources (explicit list, line file, persisted exchange listings)
//! - Exchange listings from the NASDAQ screener
//! - Yahoo Finance chart provider guarded by a circuit breaker
//! - CSV artifact store, one file per symbol
//! - Batched, paced, resumable download controller
//! - Run and storage reporting

pub mod config;
pub mod data;

pub use config::{BatchJobConfig, ConfigError, DownloadSettings};
