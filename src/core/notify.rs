//! Notification abstractions

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, title: &str, message: &str) -> Result<()>;
}

/// Sends a notification, logging instead of propagating failures. Returns
/// whether delivery succeeded.
pub async fn notify_best_effort(notifier: &dyn Notifier, title: &str, message: &str) -> bool {
    match notifier.send(title, message).await {
        Ok(()) => {
            info!("Notification sent");
            true
        }
        Err(e) => {
            warn!("Notification failed: {:#}", e);
            false
        }
    }
}
