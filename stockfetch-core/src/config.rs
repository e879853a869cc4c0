//! Download configuration: TOML settings file and the validated job config.
//!
//! Settings arrive from three layers (built-in defaults, an optional TOML
//! file, command-line flags). They are merged into [`DownloadSettings`] and
//! validated exactly once into an immutable [`BatchJobConfig`].

use crate::data::range::TimeRange;
use chrono::NaiveDate;
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_STORAGE_DIR: &str = "stock_data";
pub const DEFAULT_LISTINGS_DIR: &str = ".";
pub const DEFAULT_BATCH_SIZE: usize = 20;
pub const DEFAULT_DELAY_SECS: f64 = 1.0;

/// Configuration errors. All of them are fatal and reported before any work starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("start date {start} is after end date {end}")]
    InvertedDateRange { start: NaiveDate, end: NaiveDate },

    #[error("--end requires --start")]
    EndWithoutStart,

    #[error("invalid period '{0}'. Valid: 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max")]
    InvalidPeriod(String),

    #[error("batch size must be a positive integer, got {0}")]
    InvalidBatchSize(i64),

    #[error("delay must be a finite, non-negative number of seconds, got {0}")]
    InvalidDelay(f64),

    #[error("read config file {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("parse config TOML: {0}")]
    Parse(String),
}

/// Immutable parameters of one batch download run.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchJobConfig {
    batch_size: NonZeroUsize,
    inter_item_delay: Duration,
    time_range: TimeRange,
}

impl BatchJobConfig {
    /// Validate raw inputs. A signed batch size lets callers pass through
    /// user input untouched and still get a precise error.
    pub fn new(
        batch_size: i64,
        delay_secs: f64,
        time_range: TimeRange,
    ) -> Result<Self, ConfigError> {
        let batch_size = usize::try_from(batch_size)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or(ConfigError::InvalidBatchSize(batch_size))?;

        // The inter-batch pause is twice the item delay, so both must fit in a Duration.
        let inter_item_delay = Duration::try_from_secs_f64(delay_secs)
            .ok()
            .filter(|delay| delay.checked_mul(2).is_some())
            .ok_or(ConfigError::InvalidDelay(delay_secs))?;

        Ok(Self {
            batch_size,
            inter_item_delay,
            time_range,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size.get()
    }

    pub fn inter_item_delay(&self) -> Duration {
        self.inter_item_delay
    }

    /// Cooldown between batches: twice the inter-item delay.
    pub fn inter_batch_delay(&self) -> Duration {
        self.inter_item_delay.saturating_mul(2)
    }

    pub fn time_range(&self) -> &TimeRange {
        &self.time_range
    }

    /// Number of batches needed for `total` items.
    pub fn batch_count(&self, total: usize) -> usize {
        total.div_ceil(self.batch_size())
    }
}

/// Settings file contents.
///
/// ```toml
/// [download]
/// storage_dir = "stock_data"
/// batch_size = 20
/// delay_secs = 1.0
/// period = "1y"
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SettingsFile {
    #[serde(default)]
    pub download: DownloadSettings,
}

/// Unvalidated download settings; every field may be absent.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DownloadSettings {
    pub storage_dir: Option<PathBuf>,
    pub listings_dir: Option<PathBuf>,
    pub batch_size: Option<i64>,
    pub delay_secs: Option<f64>,
    pub period: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl DownloadSettings {
    /// Load settings from the `[download]` table of a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let file: SettingsFile =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(file.download)
    }

    /// Overlay `other` on top of `self`: any field set in `other` wins.
    pub fn merged_with(self, other: DownloadSettings) -> DownloadSettings {
        DownloadSettings {
            storage_dir: other.storage_dir.or(self.storage_dir),
            listings_dir: other.listings_dir.or(self.listings_dir),
            batch_size: other.batch_size.or(self.batch_size),
            delay_secs: other.delay_secs.or(self.delay_secs),
            period: other.period.or(self.period),
            start: other.start.or(self.start),
            end: other.end.or(self.end),
        }
    }

    pub fn storage_dir(&self) -> PathBuf {
        self.storage_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR))
    }

    pub fn listings_dir(&self) -> PathBuf {
        self.listings_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LISTINGS_DIR))
    }

    /// Validate into a job config, applying defaults for missing fields.
    pub fn job_config(&self) -> Result<BatchJobConfig, ConfigError> {
        let time_range = TimeRange::from_parts(
            self.period.as_deref(),
            self.start.as_deref(),
            self.end.as_deref(),
        )?;
        BatchJobConfig::new(
            self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE as i64),
            self.delay_secs.unwrap_or(DEFAULT_DELAY_SECS),
            time_range,
        )
    }
}
