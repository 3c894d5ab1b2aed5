use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::{fs, path::PathBuf};
use tracing::debug;

/// Yield used in the score blend when an instrument has no estimate at all.
pub const FALLBACK_YIELD: f64 = 3.0;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Instrument {
    pub code: String,
    pub name: String,
    #[serde(default = "default_yield")]
    pub default_yield: f64,
}

fn default_yield() -> f64 {
    FALLBACK_YIELD
}

impl Instrument {
    pub fn new(code: &str, name: &str, default_yield: f64) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            default_yield,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct StrategyConfig {
    /// Momentum and volatility window, in trading days.
    pub lookback_days: usize,
    /// Intended holding period after a rotation, in trading days.
    pub holding_days: u32,
    pub risk_free_rate: f64,
    /// Informational stop-loss threshold; never applied to scores.
    pub stop_loss: f64,
    /// Number of tranches to build a new position in.
    pub batch_size: u32,
    /// Maximum age of the yield cache, in days.
    pub div_cache_days: i64,
    /// Pause between requests for successive instruments.
    pub request_delay_secs: u64,
    /// Calendar days of price history to request.
    pub history_days: i64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            lookback_days: 60,
            holding_days: 20,
            risk_free_rate: 0.02,
            stop_loss: -0.08,
            batch_size: 3,
            div_cache_days: 30,
            request_delay_secs: 2,
            history_days: 365 * 2,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AkToolsProviderConfig {
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub aktools: Option<AkToolsProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            aktools: Some(AkToolsProviderConfig {
                base_url: "http://127.0.0.1:8080".to_string(),
                request_timeout_secs: default_request_timeout(),
            }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct NotifierConfig {
    pub enabled: bool,
    pub base_url: String,
    /// Name of the environment variable holding the ServerChan send key.
    pub sendkey_env: String,
    pub title: String,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        NotifierConfig {
            enabled: false,
            base_url: "https://sctapi.ftqq.com".to_string(),
            sendkey_env: "SERVERCHAN_SENDKEY".to_string(),
            title: "红利三剑客".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_instruments")]
    pub instruments: Vec<Instrument>,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    pub cache_path: Option<String>,
}

fn default_instruments() -> Vec<Instrument> {
    vec![
        Instrument::new("510720", "上证红利ETF", 4.5),
        Instrument::new("515180", "中证红利ETF", 4.2),
        Instrument::new("512890", "红利低波ETF", 4.0),
    ]
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            instruments: default_instruments(),
            strategy: StrategyConfig::default(),
            providers: ProvidersConfig::default(),
            notifier: NotifierConfig::default(),
            cache_path: None,
        }
    }
}

impl AppConfig {
    /// Loads the config from the default location, or built-in defaults when
    /// no config file has been created yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using built-in defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "codito", "divrot")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "codito", "divrot")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    /// Location of the dividend yield cache file.
    pub fn yield_cache_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.cache_path {
            return Ok(PathBuf::from(custom_path));
        }
        Ok(self.default_data_path()?.join("dividend_cache.json"))
    }

    pub fn aktools_base_url(&self) -> &str {
        self.providers
            .aktools
            .as_ref()
            .map_or("http://127.0.0.1:8080", |p| &p.base_url)
    }

    pub fn request_timeout_secs(&self) -> u64 {
        self.providers
            .aktools
            .as_ref()
            .map_or(default_request_timeout(), |p| p.request_timeout_secs)
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.instruments.is_empty() {
            bail!("At least one instrument must be configured");
        }
        let mut seen = HashSet::new();
        for instrument in &self.instruments {
            if !seen.insert(instrument.code.as_str()) {
                bail!("Duplicate instrument code: {}", instrument.code);
            }
        }
        if self.strategy.lookback_days < 2 {
            bail!(
                "lookback_days must be at least 2, got {}",
                self.strategy.lookback_days
            );
        }
        if self.strategy.div_cache_days <= 0 {
            bail!(
                "div_cache_days must be positive, got {}",
                self.strategy.div_cache_days
            );
        }
        if self.strategy.history_days <= 0 {
            bail!(
                "history_days must be positive, got {}",
                self.strategy.history_days
            );
        }
        Ok(())
    }

    pub fn instrument(&self, code: &str) -> Option<&Instrument> {
        self.instruments.iter().find(|i| i.code == code)
    }
}
