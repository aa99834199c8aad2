//! Paginated history fetcher.
//!
//! Per pair the fetcher walks the exchange's `since` cursor forward:
//! request a page, append it, move the cursor to the server-reported `last`
//! value, and stop on an empty page or a page shorter than the page cap.
//! The cursor is taken verbatim from the server. It can differ from the last
//! candle's time, and deriving it locally risks gaps or refetch loops.

use super::provider::{DataError, ExchangeApi};
use crate::domain::Candle;
use std::cell::Cell;
use std::time::Duration;
use tracing::{debug, warn};

/// Flat blocking pause used for rate-limit courtesy. Not a backoff.
///
/// Every call to [`Pacer::pause`] is counted, including zero-length ones.
#[derive(Debug, Clone)]
pub struct Pacer {
    delay: Duration,
    pauses: Cell<usize>,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pauses: Cell::new(0),
        }
    }

    /// A pacer that never sleeps, for tests and offline replays.
    pub fn none() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn pause(&self) {
        self.pauses.set(self.pauses.get() + 1);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
    }

    pub fn pauses(&self) -> usize {
        self.pauses.get()
    }
}

/// Pagination parameters for one fetch.
#[derive(Debug, Clone)]
pub struct FetchParams {
    pub interval_minutes: u32,
    pub max_page_size: usize,
    pub pacer: Pacer,
}

/// Everything gathered for one pair.
#[derive(Debug, Clone, Default)]
pub struct History {
    pub candles: Vec<Candle>,
    /// Requests issued, including the one that failed, if any.
    pub requests: usize,
    /// True if a recoverable error cut pagination short.
    pub interrupted: bool,
}

/// Fetch every candle for `pair` from `since` onward.
///
/// `since` of `None` or `Some(0)` asks for the full available history.
/// Recoverable errors end the walk and keep what was gathered. Fatal errors
/// (malformed numbers) propagate.
pub fn fetch_history(
    api: &dyn ExchangeApi,
    pair: &str,
    since: Option<i64>,
    params: &FetchParams,
) -> Result<History, DataError> {
    let mut history = History::default();
    let mut cursor = since.filter(|&s| s != 0);

    loop {
        history.requests += 1;
        let page = match api.ohlc(pair, params.interval_minutes, cursor) {
            Ok(page) => page,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(pair, error = %e, "error fetching OHLC data");
                history.interrupted = true;
                break;
            }
        };

        let returned = page.candles.len();
        if returned == 0 {
            break;
        }

        history.candles.extend(page.candles);
        debug!(pair, returned, last = page.last, "fetched OHLC page");

        if returned < params.max_page_size {
            break;
        }

        if cursor == Some(page.last) {
            warn!(pair, cursor = page.last, "OHLC cursor did not advance, stopping");
            break;
        }
        cursor = Some(page.last);

        params.pacer.pause();
    }

    Ok(history)
}
