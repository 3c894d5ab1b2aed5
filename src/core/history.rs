//! Price history collection across the basket.

use crate::core::config::Instrument;
use crate::core::price::{PriceHistoryProvider, PriceSeries, normalize_raw_history};
use anyhow::Context;
use chrono::{Duration as ChronoDuration, NaiveDate};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct HistoryFetch {
    pub series: BTreeMap<String, PriceSeries>,
    /// Codes whose history could not be fetched or normalized.
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct HistoryWindow {
    pub end: NaiveDate,
    pub days: i64,
    /// Minimum number of observations for a usable series.
    pub min_len: usize,
}

impl HistoryWindow {
    pub fn start(&self) -> NaiveDate {
        self.end - ChronoDuration::days(self.days)
    }
}

/// Fetches and normalizes daily closes for every instrument. Failures are
/// recorded per instrument and never abort the loop.
pub async fn fetch_price_history(
    provider: &dyn PriceHistoryProvider,
    instruments: &[Instrument],
    window: &HistoryWindow,
    delay: Duration,
    on_progress: &(dyn Fn() + Sync),
) -> HistoryFetch {
    let mut result = HistoryFetch::default();
    for (idx, instrument) in instruments.iter().enumerate() {
        if idx > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let outcome = provider
            .fetch_daily_history(&instrument.code, window.start(), window.end)
            .await
            .and_then(|raw| {
                normalize_raw_history(&raw, window.min_len)
                    .with_context(|| format!("Unusable history for {}", instrument.code))
            });
        match outcome {
            Ok(series) => {
                info!(
                    "{}({}): {} daily closes",
                    instrument.name,
                    instrument.code,
                    series.len()
                );
                result.series.insert(instrument.code.clone(), series);
            }
            Err(e) => {
                warn!(
                    "{}({}) price history unavailable: {:#}",
                    instrument.name, instrument.code, e
                );
                result.failed.push(instrument.code.clone());
            }
        }
        on_progress();
    }
    result
}
