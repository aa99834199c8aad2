//! Candle — one interval's aggregated price/volume bar as reported by the exchange.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

/// OHLC candle for a single pair over one interval (one day by default).
///
/// Every price field is already coerced to `f64`; the exchange sends them as
/// decimal strings. Only `close` survives past the fetch stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Interval open time, seconds since the Unix epoch.
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub vwap: f64,
    pub volume: f64,
    pub count: u64,
}

impl Candle {
    /// UTC calendar day the candle opens on, or `None` if `time` is out of range.
    pub fn date(&self) -> Option<NaiveDate> {
        DateTime::from_timestamp(self.time, 0).map(|dt| dt.date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_candle(time: i64) -> Candle {
        Candle {
            time,
            open: 100.0,
            high: 105.0,
            low: 98.0,
            close: 103.0,
            vwap: 101.5,
            volume: 12.5,
            count: 42,
        }
    }

    #[test]
    fn date_is_utc_day_of_open_time() {
        // 2024-01-02T00:00:00Z
        let candle = sample_candle(1_704_153_600);
        assert_eq!(candle.date(), NaiveDate::from_ymd_opt(2024, 1, 2));
    }

    #[test]
    fn intraday_time_truncates_to_day() {
        // 2024-01-02T23:59:59Z
        let candle = sample_candle(1_704_239_999);
        assert_eq!(candle.date(), NaiveDate::from_ymd_opt(2024, 1, 2));
    }

    #[test]
    fn out_of_range_time_has_no_date() {
        assert_eq!(sample_candle(i64::MAX).date(), None);
    }
}
