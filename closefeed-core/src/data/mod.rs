//! Exchange access, history pagination, and dataset reconciliation

pub mod dataset;
pub mod discovery;
pub mod history;
pub mod kraken;
pub mod provider;
pub mod reconcile;

pub use dataset::{merge_records, Dataset, DatasetStore};
pub use discovery::{is_tracked_pair, list_usd_pairs};
pub use history::{fetch_history, FetchParams, History, Pacer};
pub use kraken::KrakenClient;
pub use provider::{DataError, ExchangeApi, OhlcPage};
pub use reconcile::{run_update, StartPlan, UpdateOutcome, UpdateSummary};
