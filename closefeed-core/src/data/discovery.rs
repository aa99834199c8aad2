//! Pair discovery: the USD-quoted, non-derivative slice of the exchange universe.

use super::provider::ExchangeApi;
use crate::config::JobConfig;
use tracing::{info, warn};

/// True if `pair` ends with the quote suffix and carries no derivative marker.
pub fn is_tracked_pair(pair: &str, quote_suffix: &str, excluded_marker: &str) -> bool {
    pair.ends_with(quote_suffix) && (excluded_marker.is_empty() || !pair.contains(excluded_marker))
}

/// List the pairs the job should track, keeping the order `api.asset_pairs()`
/// yields them in. The Kraken adapter sorts by pair identifier.
///
/// Never fails: a transport or API error is logged and yields an empty list,
/// which the caller treats as "nothing to do".
pub fn list_usd_pairs(api: &dyn ExchangeApi, config: &JobConfig) -> Vec<String> {
    let pairs = match api.asset_pairs() {
        Ok(pairs) => pairs,
        Err(e) => {
            warn!(exchange = api.name(), error = %e, "error fetching USD pairs");
            return Vec::new();
        }
    };

    let total = pairs.len();
    let tracked: Vec<String> = pairs
        .into_iter()
        .filter(|p| is_tracked_pair(p, &config.quote_suffix, &config.excluded_marker))
        .collect();

    info!(
        exchange = api.name(),
        total,
        tracked = tracked.len(),
        "discovered {} pairs",
        config.quote_suffix
    );
    tracked
}
