//! Time-range selection for price history requests.
//!
//! A request covers either a relative period understood by the provider
//! (`1y`, `ytd`, `max`, ...) or an explicit calendar window.

use crate::config::ConfigError;
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

/// Relative lookback periods accepted by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Period {
    OneDay,
    FiveDays,
    OneMonth,
    ThreeMonths,
    SixMonths,
    #[default]
    OneYear,
    TwoYears,
    FiveYears,
    TenYears,
    YearToDate,
    Max,
}

impl Period {
    pub const ALL: [Period; 11] = [
        Period::OneDay,
        Period::FiveDays,
        Period::OneMonth,
        Period::ThreeMonths,
        Period::SixMonths,
        Period::OneYear,
        Period::TwoYears,
        Period::FiveYears,
        Period::TenYears,
        Period::YearToDate,
        Period::Max,
    ];

    /// Token used on the command line and in the provider's `range` parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            Period::OneDay => "1d",
            Period::FiveDays => "5d",
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::TwoYears => "2y",
            Period::FiveYears => "5y",
            Period::TenYears => "10y",
            Period::YearToDate => "ytd",
            Period::Max => "max",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ConfigError::InvalidPeriod(s.to_string()))
    }
}

/// Exactly one of a relative period or an explicit date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    Period(Period),
    /// `end` is inclusive; `None` means "up to today".
    Dates {
        start: NaiveDate,
        end: Option<NaiveDate>,
    },
}

impl Default for TimeRange {
    fn default() -> Self {
        TimeRange::Period(Period::default())
    }
}

impl TimeRange {
    /// Build an explicit date window, rejecting `start > end`.
    pub fn dates(start: NaiveDate, end: Option<NaiveDate>) -> Result<Self, ConfigError> {
        if let Some(end) = end {
            if start > end {
                return Err(ConfigError::InvertedDateRange { start, end });
            }
        }
        Ok(TimeRange::Dates { start, end })
    }

    /// Assemble a range from raw user input.
    ///
    /// Dates win over the period when `start` is given. `end` without `start`
    /// is rejected rather than silently ignored.
    pub fn from_parts(
        period: Option<&str>,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let start = start.map(parse_date).transpose()?;
        let end = end.map(parse_date).transpose()?;

        match (start, end) {
            (Some(start), end) => Self::dates(start, end),
            (None, Some(_)) => Err(ConfigError::EndWithoutStart),
            (None, None) => {
                let period = period.map(str::parse::<Period>).transpose()?.unwrap_or_default();
                Ok(TimeRange::Period(period))
            }
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeRange::Period(p) => write!(f, "period {p}"),
            TimeRange::Dates { start, end: Some(end) } => write!(f, "{start} to {end}"),
            TimeRange::Dates { start, end: None } => write!(f, "from {start}"),
        }
    }
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(s: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| ConfigError::InvalidDate(s.to_string()))
}
