//! CSV dataset store.
//!
//! Layout: one file, header `pair,date,close`, one row per (pair, day), sorted
//! by pair then date. Dates are written as `YYYY-MM-DD`.
//!
//! Features:
//! - Whole-file reads and writes, no append mode
//! - Atomic writes (write to .tmp, rename into place)
//! - Last-write-wins merge keyed on (pair, date)
//! - BLAKE3 hash of the written bytes for run-to-run comparison

use super::provider::DataError;
use crate::domain::{PriceKey, PriceRecord};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

pub const HEADER: [&str; 3] = ["pair", "date", "close"];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Row as read from disk; `date` is parsed leniently afterwards.
#[derive(Debug, Deserialize)]
struct CsvRow {
    pair: String,
    date: String,
    close: f64,
}

/// In-memory dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<PriceRecord>,
}

impl Dataset {
    pub fn new(records: Vec<PriceRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[PriceRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<PriceRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Latest date across all pairs.
    pub fn max_date(&self) -> Option<NaiveDate> {
        self.records.iter().map(|r| r.date).max()
    }

    /// Distinct pairs present in the dataset.
    pub fn pairs(&self) -> HashSet<&str> {
        self.records.iter().map(|r| r.pair.as_str()).collect()
    }
}

/// Merge `existing` with `fetched` into a deduplicated, sorted record list.
///
/// When a (pair, date) key appears more than once the last occurrence wins;
/// fetched rows come after existing rows, and later pages after earlier ones.
pub fn merge_records(existing: Vec<PriceRecord>, fetched: Vec<PriceRecord>) -> Vec<PriceRecord> {
    let mut by_key: BTreeMap<PriceKey, f64> = BTreeMap::new();
    for rec in existing.into_iter().chain(fetched) {
        by_key.insert((rec.pair, rec.date), rec.close);
    }
    by_key
        .into_iter()
        .map(|((pair, date), close)| PriceRecord { pair, date, close })
        .collect()
}

/// Accept `YYYY-MM-DD`, or a date-time whose time part is dropped.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

/// Serialize records to CSV bytes, header included.
pub fn encode_csv(records: &[PriceRecord]) -> Result<Vec<u8>, DataError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(HEADER)?;
    for r in records {
        let date = r.date.format(DATE_FORMAT).to_string();
        let close = r.close.to_string();
        wtr.write_record([r.pair.as_str(), date.as_str(), close.as_str()])?;
    }
    wtr.into_inner()
        .map_err(|e| DataError::DatasetIo(e.into_error()))
}

/// Parse CSV bytes into records, in file order.
pub fn decode_csv(bytes: &[u8]) -> Result<Vec<PriceRecord>, DataError> {
    let mut rdr = csv::Reader::from_reader(bytes);
    let mut records = Vec::new();

    for (i, row) in rdr.deserialize::<CsvRow>().enumerate() {
        // Line 1 is the header.
        let line = i + 2;
        let row = row?;
        let date = parse_date(&row.date).ok_or_else(|| DataError::DatasetRow {
            row: line,
            reason: format!("unparseable date '{}'", row.date),
        })?;
        records.push(PriceRecord {
            pair: row.pair,
            date,
            close: row.close,
        });
    }

    Ok(records)
}

/// The dataset file on disk.
pub struct DatasetStore {
    path: PathBuf,
}

impl DatasetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Load the dataset, or `None` if the file does not exist yet.
    pub fn load(&self) -> Result<Option<Dataset>, DataError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(Dataset::new(decode_csv(&bytes)?)))
    }

    /// Replace the file with `records`. Returns the BLAKE3 hash of what was written.
    ///
    /// Writes are atomic: the CSV goes to `<file>.tmp` and is renamed into place.
    pub fn write(&self, records: &[PriceRecord]) -> Result<String, DataError> {
        let bytes = encode_csv(records)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, &bytes)
            .and_then(|()| fs::rename(&tmp_path, &self.path))
            .map_err(|e| {
                // Never leave a partial temp file behind
                let _ = fs::remove_file(&tmp_path);
                DataError::DatasetIo(e)
            })?;

        Ok(blake3::hash(&bytes).to_hex().to_string())
    }
}
