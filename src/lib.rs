pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

pub use cli::signal::{RunOptions, RunOutcome, SignalReport};

use crate::core::Notifier;
use crate::core::config::AppConfig;
use crate::providers::aktools::AkToolsProvider;
use crate::providers::serverchan::ServerChanNotifier;
use crate::store::DiskYieldStore;
use anyhow::Result;
use std::time::Duration;
use tracing::{debug, info, warn};

pub enum AppCommand {
    Signal(RunOptions),
}

pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

fn build_notifier(config: &AppConfig, options: &RunOptions) -> Option<ServerChanNotifier> {
    if !(options.notify || config.notifier.enabled) {
        return None;
    }
    match ServerChanNotifier::from_env(&config.notifier.base_url, &config.notifier.sendkey_env) {
        Ok(notifier) => Some(notifier),
        Err(e) => {
            warn!("Notifications disabled: {:#}", e);
            None
        }
    }
}

pub async fn run_signal(config: &AppConfig, options: &RunOptions) -> Result<SignalReport> {
    info!("Dividend rotation signal starting...");

    let market = AkToolsProvider::new(
        config.aktools_base_url(),
        Duration::from_secs(config.request_timeout_secs()),
    )?;
    let yield_store = DiskYieldStore::new(config.yield_cache_path()?);
    let notifier = build_notifier(config, options);

    let services = cli::signal::SignalServices {
        yield_store: &yield_store,
        dividends: &market,
        prices: &market,
        notifier: notifier.as_ref().map(|n| n as &dyn Notifier),
    };
    let today = chrono::Local::now().date_naive();
    cli::signal::run(config, &services, options, today).await
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<RunOutcome> {
    let config = load_config(config_path)?;

    match command {
        AppCommand::Signal(options) => {
            let report = run_signal(&config, &options).await?;
            Ok(report.outcome)
        }
    }
}
