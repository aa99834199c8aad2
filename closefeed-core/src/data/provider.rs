//! Exchange provider trait and structured error types.
//!
//! The ExchangeApi trait abstracts over the exchange's REST surface so the
//! update job can be driven by the Kraken client in production and by a
//! scripted mock in tests.

use crate::domain::Candle;
use thiserror::Error;

/// Structured error types for data operations.
///
/// Network, HTTP, API and format errors are recoverable: the component that
/// hits them logs and degrades to an empty or partial result. Everything else
/// is fatal and propagates to the binary.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("HTTP {status} from {endpoint}")]
    HttpStatus { endpoint: String, status: u16 },

    #[error("exchange API error: {}", .0.join("; "))]
    Api(Vec<String>),

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("malformed {field} value '{value}' for {pair}")]
    MalformedNumber {
        pair: String,
        field: &'static str,
        value: String,
    },

    #[error("invalid timestamp {time} for {pair}")]
    InvalidTimestamp { pair: String, time: i64 },

    #[error("dataset I/O error: {0}")]
    DatasetIo(#[from] std::io::Error),

    #[error("dataset CSV error: {0}")]
    DatasetCsv(#[from] csv::Error),

    #[error("invalid dataset row {row}: {reason}")]
    DatasetRow { row: usize, reason: String },

    #[error("config error: {0}")]
    Config(String),
}

impl DataError {
    /// True if this error must abort the run instead of being swallowed at a
    /// component boundary.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            DataError::NetworkUnreachable(_)
                | DataError::HttpStatus { .. }
                | DataError::Api(_)
                | DataError::ResponseFormatChanged(_)
        )
    }
}

/// One page of OHLC history.
#[derive(Debug, Clone, PartialEq)]
pub struct OhlcPage {
    pub candles: Vec<Candle>,
    /// Server-reported cursor for the next request's `since`.
    pub last: i64,
}

/// The two public endpoints the update job needs.
///
/// Implementations must coerce every numeric field before returning and
/// report a malformed value as [`DataError::MalformedNumber`].
pub trait ExchangeApi {
    /// Human-readable name of this exchange.
    fn name(&self) -> &str;

    /// Every tradable instrument identifier, unfiltered.
    fn asset_pairs(&self) -> Result<Vec<String>, DataError>;

    /// One page of candles for `pair`, starting after `since` when given.
    fn ohlc(
        &self,
        pair: &str,
        interval_minutes: u32,
        since: Option<i64>,
    ) -> Result<OhlcPage, DataError>;
}
