//! Job configuration.
//!
//! Every constant the update job depends on lives in [`JobConfig`]. The
//! binary runs with `JobConfig::default()`; library callers and tests can
//! override fields directly or load a TOML document.

use crate::data::provider::DataError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://api.kraken.com/0/public";
pub const DEFAULT_DATASET_PATH: &str = "kraken_usd_pairs_close_history.csv";

/// Kraken's OHLC endpoint returns at most this many candles per request.
pub const KRAKEN_OHLC_PAGE_SIZE: usize = 720;

/// Upper bound on `lookback_days` (a century).
pub const MAX_LOOKBACK_DAYS: i64 = 36_500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Base URL of the public REST API, without a trailing slash.
    pub api_base_url: String,

    /// CSV file holding the consolidated dataset.
    pub dataset_path: PathBuf,

    /// Days of history to backfill for a new pair or an empty dataset.
    pub lookback_days: i64,

    /// Candle interval requested from the OHLC endpoint (1440 = one day).
    pub interval_minutes: u32,

    /// Per-request candle cap of the OHLC endpoint. A shorter page ends pagination.
    pub max_page_size: usize,

    /// Flat pause between page requests and after each pair.
    pub request_delay_ms: u64,

    /// Pairs must end with this quote suffix.
    pub quote_suffix: String,

    /// Pairs containing this marker (derivatives, indices) are skipped.
    pub excluded_marker: String,

    pub user_agent: String,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
            lookback_days: 730,
            interval_minutes: 1440,
            max_page_size: KRAKEN_OHLC_PAGE_SIZE,
            request_delay_ms: 1000,
            quote_suffix: "USD".to_string(),
            excluded_marker: ".d".to_string(),
            user_agent: concat!("closefeed/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl JobConfig {
    /// Load a config from a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, DataError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DataError::Config(format!("read {}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, DataError> {
        let config: Self =
            toml::from_str(content).map_err(|e| DataError::Config(format!("parse TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DataError> {
        if self.api_base_url.trim().is_empty() {
            return Err(DataError::Config("api_base_url is empty".into()));
        }
        if self.max_page_size == 0 {
            return Err(DataError::Config("max_page_size must be positive".into()));
        }
        if self.interval_minutes == 0 {
            return Err(DataError::Config("interval_minutes must be positive".into()));
        }
        if !(0..=MAX_LOOKBACK_DAYS).contains(&self.lookback_days) {
            return Err(DataError::Config(format!(
                "lookback_days must be within 0..={MAX_LOOKBACK_DAYS}, got {}",
                self.lookback_days
            )));
        }
        Ok(())
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn lookback(&self) -> Result<chrono::TimeDelta, DataError> {
        chrono::TimeDelta::try_days(self.lookback_days).ok_or_else(|| {
            DataError::Config(format!("lookback_days {} is out of range", self.lookback_days))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_kraken_daily_job() {
        let cfg = JobConfig::default();
        assert_eq!(cfg.api_base_url, "https://api.kraken.com/0/public");
        assert_eq!(cfg.dataset_path, PathBuf::from("kraken_usd_pairs_close_history.csv"));
        assert_eq!(cfg.lookback_days, 730);
        assert_eq!(cfg.interval_minutes, 1440);
        assert_eq!(cfg.max_page_size, 720);
        assert_eq!(cfg.request_delay(), Duration::from_secs(1));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = JobConfig::from_toml(
            r#"
dataset_path = "/tmp/prices.csv"
request_delay_ms = 0
"#,
        )
        .unwrap();
        assert_eq!(cfg.dataset_path, PathBuf::from("/tmp/prices.csv"));
        assert_eq!(cfg.request_delay_ms, 0);
        assert_eq!(cfg.lookback_days, 730);
        assert_eq!(cfg.quote_suffix, "USD");
    }

    #[test]
    fn zero_page_size_rejected() {
        let err = JobConfig::from_toml("max_page_size = 0").unwrap_err();
        assert!(matches!(err, DataError::Config(_)));
    }

    #[test]
    fn oversized_lookback_rejected() {
        let err = JobConfig::from_toml("lookback_days = 100000000").unwrap_err();
        assert!(matches!(err, DataError::Config(_)));

        let cfg = JobConfig {
            lookback_days: i64::MAX,
            ..JobConfig::default()
        };
        assert!(cfg.validate().is_err());
        assert!(cfg.lookback().is_err());
    }

    #[test]
    fn negative_lookback_rejected() {
        let err = JobConfig::from_toml("lookback_days = -1").unwrap_err();
        assert!(matches!(err, DataError::Config(_)));
    }

    #[test]
    fn unparseable_toml_rejected() {
        let err = JobConfig::from_toml("lookback_days = \"two years\"").unwrap_err();
        assert!(err.to_string().starts_with("config error: parse TOML"));
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = JobConfig::from_file(Path::new("/nonexistent/closefeed.toml")).unwrap_err();
        assert!(matches!(err, DataError::Config(_)));
    }
}
