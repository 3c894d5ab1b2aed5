use crate::core::dividend::{DividendProfile, DividendProvider, ProfileItem};
use crate::core::price::{PriceHistoryProvider, RawHistory};
use crate::providers::util::{http_client, with_retry};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, instrument};

const PROFILE_ENDPOINT: &str = "/api/public/fund_etf_profile_em";
const HISTORY_ENDPOINT: &str = "/api/public/fund_etf_hist_em";

/// Client for an AKTools HTTP gateway serving East Money fund data.
pub struct AkToolsProvider {
    base_url: String,
    client: reqwest::Client,
}

impl AkToolsProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client(timeout).context("Failed to build HTTP client")?,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let query: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
        let url = format!("{}{}?{}", self.base_url, endpoint, query.join("&"));
        debug!("Requesting {}", url);

        let response = with_retry(|| self.client.get(&url).send(), 3, 500)
            .await
            .with_context(|| format!("Request failed: {url}"))?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {} for {}", response.status(), url));
        }

        let text = response
            .text()
            .await
            .with_context(|| format!("Failed to read response from {url}"))?;
        if text.trim().is_empty() {
            return Err(anyhow!("Received empty response from {}", url));
        }
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse JSON response from {url}"))
    }
}

#[async_trait]
impl DividendProvider for AkToolsProvider {
    #[instrument(name = "AkToolsProfileFetch", skip(self), fields(code = %code))]
    async fn fetch_dividend_profile(&self, code: &str) -> Result<DividendProfile> {
        let items: Vec<ProfileItem> = self
            .get_json(PROFILE_ENDPOINT, &[("symbol", code)])
            .await?;
        Ok(DividendProfile { items })
    }
}

#[async_trait]
impl PriceHistoryProvider for AkToolsProvider {
    #[instrument(name = "AkToolsHistoryFetch", skip(self), fields(code = %code))]
    async fn fetch_daily_history(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawHistory> {
        let start_date = start.format("%Y%m%d").to_string();
        let end_date = end.format("%Y%m%d").to_string();
        let records: Vec<Map<String, Value>> = self
            .get_json(
                HISTORY_ENDPOINT,
                &[
                    ("symbol", code),
                    ("period", "daily"),
                    ("start_date", start_date.as_str()),
                    ("end_date", end_date.as_str()),
                ],
            )
            .await?;
        let raw = RawHistory::from_records(records);
        debug!("Source columns: {:?}, {} rows", raw.columns, raw.rows.len());
        Ok(raw)
    }
}
