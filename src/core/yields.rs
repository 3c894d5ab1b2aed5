//! Dividend yield collection with cache and per-instrument fallbacks.

use crate::core::cache::YieldStore;
use crate::core::config::Instrument;
use crate::core::dividend::{DividendProvider, is_plausible_yield};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where a yield map came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YieldSource {
    Cache,
    Fetched,
}

/// Fetches a yield for every instrument, substituting the instrument's default
/// whenever the provider fails or reports an implausible value.
///
/// Requests are spaced by `delay`, whether or not the previous one succeeded.
pub async fn fetch_yields(
    provider: &dyn DividendProvider,
    instruments: &[Instrument],
    delay: Duration,
    on_progress: &(dyn Fn() + Sync),
) -> BTreeMap<String, f64> {
    let mut rates = BTreeMap::new();
    for (idx, instrument) in instruments.iter().enumerate() {
        if idx > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let fetched = provider
            .fetch_dividend_profile(&instrument.code)
            .await
            .and_then(|profile| profile.dividend_yield());
        let rate = match fetched {
            Ok(rate) => {
                info!("{} dividend yield: {}%", instrument.name, rate);
                rate
            }
            Err(e) => {
                warn!(
                    "{} dividend yield unavailable, using default {}%: {:#}",
                    instrument.name, instrument.default_yield, e
                );
                instrument.default_yield
            }
        };
        rates.insert(instrument.code.clone(), rate);
        on_progress();
    }
    rates
}

#[derive(Debug, Clone, Copy)]
pub struct RefreshPolicy {
    pub today: NaiveDate,
    pub max_age_days: i64,
    pub delay: Duration,
    /// Ignore the cache even when it is fresh.
    pub force: bool,
}

/// Returns cached yields while the cache is fresh, covers the basket and holds
/// only plausible rates, otherwise refetches all of them and rewrites the cache.
pub async fn load_or_refresh_yields(
    store: &dyn YieldStore,
    provider: &dyn DividendProvider,
    instruments: &[Instrument],
    policy: &RefreshPolicy,
    on_progress: &(dyn Fn() + Sync),
) -> (BTreeMap<String, f64>, YieldSource) {
    if !policy.force {
        if let Some(cache) = store.load() {
            let codes = instruments.iter().map(|i| i.code.as_str());
            let plausible = cache.rates.values().all(|v| is_plausible_yield(*v));
            if !plausible {
                warn!(
                    "Yield cache from {} holds implausible rates, refreshing",
                    cache.last_update
                );
            } else if cache.is_fresh(policy.today, policy.max_age_days) && cache.covers(codes) {
                info!("Using cached dividend yields from {}", cache.last_update);
                return (cache.rates, YieldSource::Cache);
            } else {
                debug!(
                    "Yield cache from {} is stale or incomplete, refreshing",
                    cache.last_update
                );
            }
        }
    }

    let rates = fetch_yields(provider, instruments, policy.delay, on_progress).await;
    if let Err(e) = store.save(&rates, policy.today) {
        warn!("Failed to save yield cache: {:#}", e);
    }
    (rates, YieldSource::Fetched)
}
