//! Kraken public REST provider.
//!
//! Two endpoints are used: `AssetPairs` (the tradable universe, keyed by pair
//! identifier) and `OHLC` (candles for one pair plus a `last` pagination
//! cursor). Both wrap their payload in `{"error": [...], "result": ...}`; a
//! non-empty `error` list is an API failure even on HTTP 200.
//!
//! Prices arrive as decimal strings (bare JSON numbers are accepted too) and
//! are coerced here. A value that does not parse is reported as
//! `DataError::MalformedNumber`, never zeroed.

use super::provider::{DataError, ExchangeApi, OhlcPage};
use crate::config::JobConfig;
use crate::domain::Candle;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// Response envelope shared by every public endpoint.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    error: Vec<String>,
    result: Option<T>,
}

/// `OHLC` result: one pair-keyed candle array next to the `last` cursor.
#[derive(Debug, Deserialize)]
struct OhlcResult {
    last: i64,
    #[serde(flatten)]
    series: HashMap<String, serde_json::Value>,
}

/// A price field as sent on the wire.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDecimal {
    Text(String),
    Number(f64),
}

/// `[time, open, high, low, close, vwap, volume, count]`
type RawCandle = (
    i64,
    RawDecimal,
    RawDecimal,
    RawDecimal,
    RawDecimal,
    RawDecimal,
    RawDecimal,
    u64,
);

/// Kraken REST client.
pub struct KrakenClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl KrakenClient {
    pub fn new(config: &JobConfig) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| {
                DataError::NetworkUnreachable(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.base_url)
    }

    /// GET an endpoint and return the raw body of a 2xx response.
    fn get_body(&self, endpoint: &str, query: &[(&str, String)]) -> Result<String, DataError> {
        let resp = self
            .client
            .get(self.endpoint_url(endpoint))
            .query(query)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        resp.text().map_err(|e| DataError::NetworkUnreachable(e.to_string()))
    }
}

impl ExchangeApi for KrakenClient {
    fn name(&self) -> &str {
        "kraken"
    }

    fn asset_pairs(&self) -> Result<Vec<String>, DataError> {
        let body = self.get_body("AssetPairs", &[])?;
        parse_asset_pairs(&body)
    }

    fn ohlc(
        &self,
        pair: &str,
        interval_minutes: u32,
        since: Option<i64>,
    ) -> Result<OhlcPage, DataError> {
        let mut query = vec![
            ("pair", pair.to_string()),
            ("interval", interval_minutes.to_string()),
        ];
        if let Some(since) = since {
            query.push(("since", since.to_string()));
        }
        let body = self.get_body("OHLC", &query)?;
        parse_ohlc(pair, &body)
    }
}

/// Unwrap the envelope, turning a non-empty `error` list into `DataError::Api`.
fn unwrap_envelope<T: DeserializeOwned>(body: &str) -> Result<T, DataError> {
    let envelope: Envelope<T> = serde_json::from_str(body)
        .map_err(|e| DataError::ResponseFormatChanged(format!("unparseable response: {e}")))?;

    if !envelope.error.is_empty() {
        return Err(DataError::Api(envelope.error));
    }

    envelope
        .result
        .ok_or_else(|| DataError::ResponseFormatChanged("response has no result".into()))
}

/// Parse an `AssetPairs` body into pair identifiers, in key order.
pub fn parse_asset_pairs(body: &str) -> Result<Vec<String>, DataError> {
    let result: BTreeMap<String, IgnoredAny> = unwrap_envelope(body)?;
    Ok(result.into_keys().collect())
}

/// Parse an `OHLC` body for `pair` into a coerced page.
///
/// The candle array is looked up under the requested identifier. Kraken may
/// key it under the pair's canonical name instead, so a result holding exactly
/// one series is accepted as that pair's series. Anything else is a format error.
pub fn parse_ohlc(pair: &str, body: &str) -> Result<OhlcPage, DataError> {
    let mut result: OhlcResult = unwrap_envelope(body)?;

    let series = match result.series.remove(pair) {
        Some(series) => series,
        None if result.series.len() == 1 => result
            .series
            .into_values()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("series vanished".into()))?,
        None => {
            let mut keys: Vec<_> = result.series.keys().cloned().collect();
            keys.sort();
            return Err(DataError::ResponseFormatChanged(format!(
                "no series for {pair} among [{}]",
                keys.join(", ")
            )));
        }
    };

    let raw: Vec<RawCandle> = serde_json::from_value(series).map_err(|e| {
        DataError::ResponseFormatChanged(format!("candle array for {pair}: {e}"))
    })?;

    let candles = raw
        .into_iter()
        .map(|c| coerce_candle(pair, c))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(OhlcPage {
        candles,
        last: result.last,
    })
}

fn coerce_candle(pair: &str, raw: RawCandle) -> Result<Candle, DataError> {
    let (time, open, high, low, close, vwap, volume, count) = raw;
    Ok(Candle {
        time,
        open: parse_decimal(pair, "open", &open)?,
        high: parse_decimal(pair, "high", &high)?,
        low: parse_decimal(pair, "low", &low)?,
        close: parse_decimal(pair, "close", &close)?,
        vwap: parse_decimal(pair, "vwap", &vwap)?,
        volume: parse_decimal(pair, "volume", &volume)?,
        count,
    })
}

fn parse_decimal(pair: &str, field: &'static str, value: &RawDecimal) -> Result<f64, DataError> {
    match value {
        RawDecimal::Number(n) => Ok(*n),
        RawDecimal::Text(text) => text.trim().parse::<f64>().map_err(|_| {
            DataError::MalformedNumber {
                pair: pair.to_string(),
                field,
                value: text.clone(),
            }
        }),
    }
}
