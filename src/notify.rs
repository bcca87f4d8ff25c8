//! Outcome notifications. Best-effort: a failed send never changes the
//! result of the flow it reports on.

use reqwest::Client;
use serde_json::json;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

pub trait Notifier {
    fn send(&self, text: &str) -> impl Future<Output = bool> + Send;
}

pub struct TelegramNotifier {
    client: Client,
    bot_token: String,
    chat_id: String,
    api_base: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: Option<&str>, chat_id: Option<&str>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(20))
                .build()
                .unwrap_or_default(),
            bot_token: bot_token.unwrap_or_default().trim().to_string(),
            chat_id: chat_id.unwrap_or_default().trim().to_string(),
            api_base: "https://api.telegram.org".to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        !self.bot_token.is_empty() && !self.chat_id.is_empty()
    }
}

impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> bool {
        if !self.is_configured() {
            warn!("telegram notifier is not configured");
            return false;
        }
        let endpoint = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let result = self
            .client
            .post(endpoint)
            .json(&json!({
                "chat_id": self.chat_id,
                "text": text,
                "disable_web_page_preview": true,
            }))
            .send()
            .await
            .and_then(|response| response.error_for_status());
        match result {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e.without_url(), "failed to send telegram message");
                false
            }
        }
    }
}

/// Notifier for runs without a chat channel; only logs.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn send(&self, text: &str) -> bool {
        tracing::info!(message = %text, "notification");
        true
    }
}
