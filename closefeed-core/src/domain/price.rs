//! PriceRecord — the persisted unit of the close-price dataset.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Dedup and sort key of a price record: (pair, date).
pub type PriceKey = (String, NaiveDate);

/// Closing price of one pair on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub pair: String,
    pub date: NaiveDate,
    pub close: f64,
}

impl PriceRecord {
    pub fn new(pair: impl Into<String>, date: NaiveDate, close: f64) -> Self {
        Self {
            pair: pair.into(),
            date,
            close,
        }
    }

    pub fn key(&self) -> PriceKey {
        (self.pair.clone(), self.date)
    }

    /// Midnight UTC of `date`, in seconds since the epoch.
    pub fn timestamp(&self) -> i64 {
        self.date.and_time(NaiveTime::MIN).and_utc().timestamp()
    }
}
