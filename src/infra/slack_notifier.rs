use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;
use tracing::{debug, warn};

use crate::app::ports::Notifier;
use crate::config::NotifyConfig;
use crate::domain::Client;

/// Posts a completion notice to the team Slack channel. Unconfigured means
/// silently disabled; configured-but-failing means a warning in the logs and
/// nothing else. Nothing here ever reaches the caller.
pub struct SlackNotifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl SlackNotifier {
    pub fn new(config: NotifyConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: config.slack_webhook_url,
        }
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn letter_executed(&self, client: &Client, matter_type: &str, signed_on: NaiveDate) {
        let url = match &self.webhook_url {
            Some(url) => url,
            None => {
                debug!("No notification channel configured; skipping executed-letter notice");
                return;
            }
        };

        let payload = json!({
            "text": format!(
                ":white_check_mark: Engagement letter executed: {} ({}), signed {}",
                client.name, matter_type, signed_on
            )
        });

        match self.client.post(url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                crate::observability::metrics::notify::success();
                debug!("Posted executed-letter notice for {}", client.name);
            }
            Ok(response) => {
                crate::observability::metrics::notify::error();
                warn!(
                    "Executed-letter notice for {} rejected: {}",
                    client.name,
                    response.status()
                );
            }
            Err(e) => {
                crate::observability::metrics::notify::error();
                warn!("Executed-letter notice for {} failed: {}", client.name, e);
            }
        }
    }
}
