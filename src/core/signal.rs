//! Momentum/volatility scoring blended with dividend yield.
//!
//! For every instrument with at least `lookback_days` closes:
//!
//! - `r[t] = ln(close[t] / close[t-1])`
//! - `momentum[t] = close[t] / close[t-L] - 1`
//! - `vol[t] = stdev(r[t-L+1..=t]) * sqrt(252)` (sample stdev)
//! - `sharpe[t] = (momentum[t] - rf/252) / vol[t]`, or `momentum[t] * 10` when `vol[t]` is zero
//! - `score[t] = 0.7 * sharpe[t] + 0.3 * yield / 100`
//!
//! Scores are only defined from index `L` onwards. A row of the resulting
//! table exists only for dates on which every tracked instrument has a score.

use crate::core::config::FALLBACK_YIELD;
use crate::core::price::PriceSeries;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
pub const MOMENTUM_WEIGHT: f64 = 0.7;
pub const YIELD_WEIGHT: f64 = 0.3;
/// Applied to momentum when volatility is zero.
pub const FLAT_MOMENTUM_MULTIPLIER: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalParams {
    pub lookback_days: usize,
    pub risk_free_rate: f64,
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            lookback_days: 60,
            risk_free_rate: 0.02,
        }
    }
}

/// Intermediate values behind a single score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreComponents {
    pub date: NaiveDate,
    pub momentum: f64,
    pub volatility: f64,
    pub sharpe: f64,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRow {
    pub date: NaiveDate,
    /// Keyed by instrument code; iteration order is code order.
    pub scores: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreTable {
    /// Instruments that had enough history to be scored.
    pub instruments: Vec<String>,
    pub rows: Vec<ScoreRow>,
}

impl ScoreTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn latest(&self) -> Option<&ScoreRow> {
        self.rows.last()
    }
}

fn log_returns(closes: &[f64]) -> Vec<f64> {
    closes.windows(2).map(|w| (w[1] / w[0]).ln()).collect()
}

fn sample_stdev(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.max(0.0).sqrt()
}

/// Computes per-date score components for one series.
///
/// Returns an empty vector for series shorter than `lookback_days + 1`, since
/// momentum needs a close `lookback_days` sessions back.
pub fn score_series(
    series: &PriceSeries,
    yield_pct: f64,
    params: &SignalParams,
) -> Vec<ScoreComponents> {
    let lookback = params.lookback_days;
    let points = series.points();
    if lookback < 2 || points.len() <= lookback {
        return Vec::new();
    }

    let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
    // returns[i] is the return realised on day i + 1
    let returns = log_returns(&closes);
    let yield_component = (yield_pct / 100.0) * YIELD_WEIGHT;
    let daily_rf = params.risk_free_rate / TRADING_DAYS_PER_YEAR;

    (lookback..closes.len())
        .map(|t| {
            let momentum = closes[t] / closes[t - lookback] - 1.0;
            let window = &returns[t - lookback..t];
            let volatility = sample_stdev(window) * TRADING_DAYS_PER_YEAR.sqrt();
            let sharpe = if volatility == 0.0 {
                momentum * FLAT_MOMENTUM_MULTIPLIER
            } else {
                (momentum - daily_rf) / volatility
            };
            ScoreComponents {
                date: points[t].date,
                momentum,
                volatility,
                sharpe,
                score: sharpe * MOMENTUM_WEIGHT + yield_component,
            }
        })
        .collect()
}

/// Scores every instrument with enough history and aligns them by date.
///
/// Instruments with fewer than `lookback_days` observations are left out of
/// the table entirely. Missing yields blend in at [`FALLBACK_YIELD`].
pub fn compute_signals(
    series: &BTreeMap<String, PriceSeries>,
    yields: &BTreeMap<String, f64>,
    params: &SignalParams,
) -> ScoreTable {
    let mut instruments = Vec::new();
    let mut per_instrument: Vec<HashMap<NaiveDate, f64>> = Vec::new();

    for (code, prices) in series {
        if prices.len() < params.lookback_days {
            debug!(
                "Skipping {}: {} observations, need {}",
                code,
                prices.len(),
                params.lookback_days
            );
            continue;
        }
        let yield_pct = yields.get(code).copied().unwrap_or(FALLBACK_YIELD);
        let scores = score_series(prices, yield_pct, params)
            .into_iter()
            .filter(|c| c.score.is_finite())
            .map(|c| (c.date, c.score))
            .collect();
        instruments.push(code.clone());
        per_instrument.push(scores);
    }

    // Any tracked instrument must score every retained date, so the first
    // instrument's dates bound the candidate set.
    let mut candidate_dates: Vec<NaiveDate> = per_instrument
        .first()
        .map(|scores| scores.keys().copied().collect())
        .unwrap_or_default();
    candidate_dates.sort();

    let rows = candidate_dates
        .into_iter()
        .filter_map(|date| {
            let scores = instruments
                .iter()
                .zip(&per_instrument)
                .map(|(code, by_date)| by_date.get(&date).map(|s| (code.clone(), *s)))
                .collect::<Option<BTreeMap<_, _>>>()?;
            Some(ScoreRow { date, scores })
        })
        .collect::<Vec<_>>();

    debug!(
        "Computed {} complete score rows across {} instruments",
        rows.len(),
        instruments.len()
    );
    ScoreTable { instruments, rows }
}
