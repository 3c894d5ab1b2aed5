use super::ui;
use crate::core::config::{AppConfig, FALLBACK_YIELD};
use crate::core::history::{HistoryWindow, fetch_price_history};
use crate::core::notify::notify_best_effort;
use crate::core::recommend::{Recommendation, recommend};
use crate::core::signal::{SignalParams, compute_signals};
use crate::core::yields::{RefreshPolicy, YieldSource, load_or_refresh_yields};
use crate::core::{DividendProvider, Notifier, PriceHistoryProvider, YieldStore};
use anyhow::Result;
use chrono::NaiveDate;
use comfy_table::Cell;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, warn};

/// Options for a single signal run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Push the recommendation even if the config leaves notifications off.
    pub notify: bool,
    /// Refetch yields even when the cache is fresh.
    pub refresh_yields: bool,
}

/// How a run ended, from best to worst.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    /// A recommendation was produced without these instruments.
    PartialData { missing: Vec<String> },
    /// No instrument returned usable price history.
    NoPriceData,
    /// Price data arrived but no date had a score for every instrument.
    EmptySignals,
}

impl RunOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            RunOutcome::Success => 0,
            RunOutcome::PartialData { .. } => 2,
            RunOutcome::NoPriceData => 3,
            RunOutcome::EmptySignals => 4,
        }
    }
}

/// The collaborators a run talks to.
pub struct SignalServices<'a> {
    pub yield_store: &'a dyn YieldStore,
    pub dividends: &'a dyn DividendProvider,
    pub prices: &'a dyn PriceHistoryProvider,
    pub notifier: Option<&'a dyn Notifier>,
}

#[derive(Debug)]
pub struct SignalReport {
    pub outcome: RunOutcome,
    pub yields: BTreeMap<String, f64>,
    pub yield_source: YieldSource,
    pub recommendation: Option<Recommendation>,
    /// `None` when no notification was attempted.
    pub notified: Option<bool>,
}

/// Ranking table with yields, funds without price data and the trading plan.
pub fn render_recommendation(
    recommendation: &Recommendation,
    config: &AppConfig,
    yields: &BTreeMap<String, f64>,
    missing: &[String],
) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Rank"),
        ui::header_cell("Fund"),
        ui::header_cell("Code"),
        ui::header_cell("Dividend Yield"),
        ui::header_cell("Score"),
    ]);

    for (rank, entry) in recommendation.ranking.iter().enumerate() {
        let yield_cell = yields
            .get(&entry.code)
            .map_or_else(|| ui::na_cell(false), |y| ui::percent_cell(*y));
        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(&entry.name),
            Cell::new(&entry.code),
            yield_cell,
            ui::score_cell(entry.score),
        ]);
    }
    for code in missing {
        let name = config.instrument(code).map_or(code.as_str(), |i| i.name.as_str());
        table.add_row(vec![
            Cell::new("-"),
            Cell::new(name),
            Cell::new(code),
            ui::na_cell(true),
            ui::na_cell(true),
        ]);
    }

    let strategy = &config.strategy;
    let mut output = format!(
        "Signals as of {} {}\n\n",
        ui::style_text(&recommendation.as_of.to_string(), ui::StyleType::Title),
        ui::style_text("(higher is better)", ui::StyleType::Subtle)
    );
    output.push_str(&table.to_string());
    output.push_str(&format!(
        "\n\nRecommended: {}",
        ui::style_text(&recommendation.top().label(), ui::StyleType::Highlight)
    ));
    output.push_str(&format!(
        "\n{}",
        ui::style_text(
            &format!(
                "Hold {} trading days, enter in {} batches, stop-loss at {:.0}%",
                strategy.holding_days,
                strategy.batch_size,
                strategy.stop_loss * 100.0
            ),
            ui::StyleType::Subtle
        )
    ));
    output
}

/// Runs the whole pipeline once: yields, prices, scores, recommendation and
/// the optional notification.
pub async fn run(
    config: &AppConfig,
    services: &SignalServices<'_>,
    options: &RunOptions,
    today: NaiveDate,
) -> Result<SignalReport> {
    let strategy = &config.strategy;
    let instruments = &config.instruments;
    let delay = Duration::from_secs(strategy.request_delay_secs);

    let pb = ui::new_progress_bar(instruments.len() as u64);
    pb.set_message("Fetching dividend yields...");
    let policy = RefreshPolicy {
        today,
        max_age_days: strategy.div_cache_days,
        delay,
        force: options.refresh_yields,
    };
    let (yields, yield_source) = load_or_refresh_yields(
        services.yield_store,
        services.dividends,
        instruments,
        &policy,
        &|| pb.inc(1),
    )
    .await;
    pb.finish_and_clear();

    let pb = ui::new_progress_bar(instruments.len() as u64);
    pb.set_message("Fetching price history...");
    let window = HistoryWindow {
        end: today,
        days: strategy.history_days,
        min_len: strategy.lookback_days,
    };
    let history =
        fetch_price_history(services.prices, instruments, &window, delay, &|| pb.inc(1)).await;
    pb.finish_and_clear();

    let mut report = SignalReport {
        outcome: RunOutcome::NoPriceData,
        yields,
        yield_source,
        recommendation: None,
        notified: None,
    };

    if history.series.is_empty() {
        println!(
            "{}",
            ui::style_text(
                "Price data unavailable for every fund, cannot continue",
                ui::StyleType::Error
            )
        );
        return Ok(report);
    }

    let params = SignalParams {
        lookback_days: strategy.lookback_days,
        risk_free_rate: strategy.risk_free_rate,
    };
    let table = compute_signals(&history.series, &report.yields, &params);
    info!(
        "{} score rows for {:?} (missing yields blend at {}%)",
        table.rows.len(),
        table.instruments,
        FALLBACK_YIELD
    );

    let Some(recommendation) = recommend(&table, instruments) else {
        report.outcome = RunOutcome::EmptySignals;
        println!(
            "{}",
            ui::style_text(
                "No date has a complete set of scores, no signal generated",
                ui::StyleType::Error
            )
        );
        return Ok(report);
    };

    println!(
        "{}",
        render_recommendation(&recommendation, config, &report.yields, &history.failed)
    );

    if options.notify || config.notifier.enabled {
        report.notified = match services.notifier {
            Some(notifier) => Some(
                notify_best_effort(notifier, &config.notifier.title, &recommendation.message())
                    .await,
            ),
            None => {
                warn!("Notification requested but no notifier is configured");
                Some(false)
            }
        };
    }

    report.outcome = if history.failed.is_empty() {
        RunOutcome::Success
    } else {
        RunOutcome::PartialData {
            missing: history.failed,
        }
    };
    report.recommendation = Some(recommendation);
    Ok(report)
}
