//! Update orchestrator: load → discover → fetch per pair → merge → write.
//!
//! This is the only component that touches the dataset file. A pair whose
//! fetch fails contributes whatever it gathered and the run moves on; only
//! fatal errors (malformed data, dataset I/O) abort. If discovery finds
//! nothing, or no pair yields a row, the file is left untouched.

use super::dataset::{merge_records, Dataset, DatasetStore};
use super::discovery::list_usd_pairs;
use super::history::{fetch_history, FetchParams, Pacer};
use super::provider::{DataError, ExchangeApi};
use crate::config::JobConfig;
use crate::domain::{Candle, PriceRecord};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::info;

/// Per-pair fetch starting points for one run.
#[derive(Debug, Clone)]
pub struct StartPlan {
    /// Resume point for pairs already in the dataset.
    default_since: i64,
    /// Full-lookback start used for new pairs.
    lookback_since: i64,
    known_pairs: HashSet<String>,
}

impl StartPlan {
    /// Derive start points from the existing dataset.
    ///
    /// With no dataset (or an empty one) every pair starts at `now - lookback`.
    /// Otherwise known pairs resume from the dataset's latest date and pairs
    /// missing from it start at `now - lookback`. A lookback reaching past
    /// the representable date range is a config error.
    pub fn new(
        existing: Option<&Dataset>,
        now: DateTime<Utc>,
        lookback: chrono::TimeDelta,
    ) -> Result<Self, DataError> {
        let lookback_since = now
            .checked_sub_signed(lookback)
            .ok_or_else(|| {
                let days = lookback.num_days();
                DataError::Config(format!("lookback of {days} days is out of range"))
            })?
            .timestamp();

        let resume = existing.and_then(|ds| {
            ds.records()
                .iter()
                .max_by_key(|r| r.date)
                .map(|latest| (latest.timestamp(), ds))
        });

        Ok(match resume {
            Some((default_since, ds)) => Self {
                default_since,
                lookback_since,
                known_pairs: ds.pairs().into_iter().map(str::to_string).collect(),
            },
            None => Self {
                default_since: lookback_since,
                lookback_since,
                known_pairs: HashSet::new(),
            },
        })
    }

    pub fn default_since(&self) -> i64 {
        self.default_since
    }

    pub fn lookback_since(&self) -> i64 {
        self.lookback_since
    }

    /// True if the dataset has rows but none for `pair`.
    pub fn is_new(&self, pair: &str) -> bool {
        !self.known_pairs.is_empty() && !self.known_pairs.contains(pair)
    }

    pub fn since_for(&self, pair: &str) -> i64 {
        if self.known_pairs.contains(pair) {
            self.default_since
        } else {
            self.lookback_since
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Discovery returned nothing; the dataset was not touched.
    NoPairs,
    /// No pair returned a candle; the dataset was not touched.
    NoNewData,
    /// The dataset was rewritten.
    Written { rows: usize, hash: String },
}

#[derive(Debug, Clone)]
pub struct UpdateSummary {
    pub pairs: usize,
    pub new_pairs: usize,
    /// Pairs whose pagination was cut short by a recoverable error.
    pub interrupted: Vec<String>,
    pub requests: usize,
    /// Courtesy pauses taken between pages and after each pair.
    pub pauses: usize,
    pub rows_fetched: usize,
    pub outcome: UpdateOutcome,
}

impl UpdateSummary {
    fn empty(outcome: UpdateOutcome) -> Self {
        Self {
            pairs: 0,
            new_pairs: 0,
            interrupted: Vec::new(),
            requests: 0,
            pauses: 0,
            rows_fetched: 0,
            outcome,
        }
    }

    pub fn wrote_dataset(&self) -> bool {
        matches!(self.outcome, UpdateOutcome::Written { .. })
    }
}

/// Project a candle onto the persisted (pair, date, close) record.
pub fn price_record(pair: &str, candle: &Candle) -> Result<PriceRecord, DataError> {
    let date = candle.date().ok_or_else(|| DataError::InvalidTimestamp {
        pair: pair.to_string(),
        time: candle.time,
    })?;
    Ok(PriceRecord::new(pair, date, candle.close))
}

/// Run one incremental update of the dataset at `config.dataset_path`.
pub fn run_update(
    config: &JobConfig,
    api: &dyn ExchangeApi,
    now: DateTime<Utc>,
) -> Result<UpdateSummary, DataError> {
    config.validate()?;
    let store = DatasetStore::new(&config.dataset_path);

    let existing = store.load()?;
    match existing.as_ref().and_then(Dataset::max_date) {
        Some(last_update) => info!(
            path = %store.path().display(),
            rows = existing.as_ref().map_or(0, Dataset::len),
            %last_update,
            "found existing data"
        ),
        None => info!(
            path = %store.path().display(),
            days = config.lookback_days,
            "no existing data, fetching full history"
        ),
    }
    let plan = StartPlan::new(existing.as_ref(), now, config.lookback()?)?;

    let pairs = list_usd_pairs(api, config);
    if pairs.is_empty() {
        info!("no USD pairs found, exiting");
        return Ok(UpdateSummary::empty(UpdateOutcome::NoPairs));
    }

    let params = FetchParams {
        interval_minutes: config.interval_minutes,
        max_page_size: config.max_page_size,
        pacer: Pacer::new(config.request_delay()),
    };

    let mut summary = UpdateSummary::empty(UpdateOutcome::NoNewData);
    summary.pairs = pairs.len();
    let mut fetched: Vec<PriceRecord> = Vec::new();

    for (i, pair) in pairs.iter().enumerate() {
        info!(pair = pair.as_str(), "[{}/{}] processing", i + 1, pairs.len());

        if plan.is_new(pair) {
            info!(pair = pair.as_str(), "new pair found, fetching full history");
            summary.new_pairs += 1;
        }

        let history = fetch_history(api, pair, Some(plan.since_for(pair)), &params)?;
        summary.requests += history.requests;
        if history.interrupted {
            summary.interrupted.push(pair.clone());
        }

        for candle in &history.candles {
            fetched.push(price_record(pair, candle)?);
        }

        params.pacer.pause();
    }
    summary.pauses = params.pacer.pauses();

    if fetched.is_empty() {
        info!("no new data to update");
        return Ok(summary);
    }

    summary.rows_fetched = fetched.len();
    let existing_records = existing.map(Dataset::into_records).unwrap_or_default();
    let merged = merge_records(existing_records, fetched);
    let hash = store.write(&merged)?;

    info!(
        path = %store.path().display(),
        rows = merged.len(),
        fetched = summary.rows_fetched,
        %hash,
        "dataset updated"
    );
    summary.outcome = UpdateOutcome::Written {
        rows: merged.len(),
        hash,
    };
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn no_dataset_uses_lookback_for_everything() {
        let plan = StartPlan::new(None, now(), chrono::Duration::days(730)).unwrap();
        let expected = (now() - chrono::Duration::days(730)).timestamp();
        assert_eq!(plan.default_since(), expected);
        assert_eq!(plan.since_for("XXBTZUSD"), expected);
        assert!(!plan.is_new("XXBTZUSD"));
    }

    #[test]
    fn empty_dataset_behaves_like_missing() {
        let ds = Dataset::default();
        let plan = StartPlan::new(Some(&ds), now(), chrono::Duration::days(730)).unwrap();
        assert_eq!(plan.default_since(), plan.lookback_since());
        assert!(!plan.is_new("XXBTZUSD"));
    }

    #[test]
    fn known_pair_resumes_from_global_max_date() {
        let ds = Dataset::new(vec![
            PriceRecord::new("ETHUSD", d(2024, 5, 20), 1.0),
            PriceRecord::new("XXBTZUSD", d(2024, 5, 30), 1.0),
        ]);
        let plan = StartPlan::new(Some(&ds), now(), chrono::Duration::days(730)).unwrap();
        let resume = d(2024, 5, 30).and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp();
        assert_eq!(plan.default_since(), resume);
        // Global max, not the pair's own last date.
        assert_eq!(plan.since_for("ETHUSD"), resume);
        assert_eq!(plan.since_for("XXBTZUSD"), resume);
    }

    #[test]
    fn unknown_pair_uses_lookback() {
        let ds = Dataset::new(vec![PriceRecord::new("XXBTZUSD", d(2024, 5, 30), 1.0)]);
        let plan = StartPlan::new(Some(&ds), now(), chrono::Duration::days(730)).unwrap();
        assert!(plan.is_new("SOLUSD"));
        assert_eq!(
            plan.since_for("SOLUSD"),
            (now() - chrono::Duration::days(730)).timestamp()
        );
    }

    #[test]
    fn lookback_past_date_range_is_config_error() {
        // Within TimeDelta's range but beyond what DateTime can represent.
        let lookback = chrono::TimeDelta::try_days(100_000_000).unwrap();
        let err = StartPlan::new(None, now(), lookback).unwrap_err();
        assert!(matches!(err, DataError::Config(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn candle_projects_to_close_record() {
        let candle = Candle {
            time: 1_704_153_600,
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
            vwap: 1.2,
            volume: 10.0,
            count: 3,
        };
        let rec = price_record("XXBTZUSD", &candle).unwrap();
        assert_eq!(rec, PriceRecord::new("XXBTZUSD", d(2024, 1, 2), 1.5));
    }

    #[test]
    fn out_of_range_candle_time_is_fatal() {
        let candle = Candle {
            time: i64::MAX,
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            vwap: 1.0,
            volume: 1.0,
            count: 1,
        };
        let err = price_record("XXBTZUSD", &candle).unwrap_err();
        assert!(err.is_fatal());
    }
}
