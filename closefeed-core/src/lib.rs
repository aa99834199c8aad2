//! closefeed core — keeps a consolidated daily close-price history for an
//! exchange's USD pairs.
//!
//! - Domain types (candles, price records)
//! - Job configuration with Kraken defaults
//! - Exchange provider trait and the Kraken REST adapter
//! - Cursor-driven history pagination with a flat pacing delay
//! - CSV dataset store with last-write-wins merge and atomic replace

pub mod config;
pub mod data;
pub mod domain;

pub use config::JobConfig;
pub use data::{run_update, DataError, UpdateOutcome, UpdateSummary};
