use crate::core::notify::Notifier;
use crate::providers::util::http_client;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};

const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Push notifications through a ServerChan (`sct.ftqq.com`) send key.
pub struct ServerChanNotifier {
    base_url: String,
    sendkey: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ServerChanMessage<'a> {
    text: &'a str,
    desp: &'a str,
}

impl ServerChanNotifier {
    pub fn new(base_url: &str, sendkey: &str) -> Result<Self> {
        if sendkey.trim().is_empty() {
            return Err(anyhow!("ServerChan send key is empty"));
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            sendkey: sendkey.trim().to_string(),
            client: http_client(NOTIFY_TIMEOUT).context("Failed to build HTTP client")?,
        })
    }

    /// Reads the send key from the environment variable `var`.
    pub fn from_env(base_url: &str, var: &str) -> Result<Self> {
        let sendkey = std::env::var(var)
            .with_context(|| format!("Environment variable {var} is not set"))?;
        Self::new(base_url, &sendkey)
    }
}

#[async_trait]
impl Notifier for ServerChanNotifier {
    #[instrument(name = "ServerChanSend", skip(self, message))]
    async fn send(&self, title: &str, message: &str) -> Result<()> {
        let url = format!("{}/{}.send", self.base_url, self.sendkey);
        let body = ServerChanMessage {
            text: title,
            desp: message,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow!("Notification request failed: {}", e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Notification rejected with HTTP {}", status));
        }
        debug!("ServerChan accepted notification: {}", response.text().await?);
        Ok(())
    }
}
