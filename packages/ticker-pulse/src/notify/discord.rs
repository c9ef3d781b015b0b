//! Discord incoming-webhook notifier.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::credentials::SecretString;
use crate::error::{NotifyError, NotifyResult};
use crate::traits::Notifier;

const TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
}

/// Posts `{"content": message}` to a webhook URL. The URL embeds the
/// webhook token and is kept secret.
pub struct DiscordWebhook {
    client: reqwest::Client,
    url: SecretString,
    max_len: usize,
}

impl DiscordWebhook {
    pub fn new(url: SecretString) -> Self {
        Self {
            client: crate::providers::http_client(TIMEOUT),
            url,
            max_len: super::DEFAULT_MAX_LEN,
        }
    }

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }
}

#[async_trait]
impl Notifier for DiscordWebhook {
    async fn notify(&self, message: &str) -> NotifyResult<()> {
        let content = super::truncate_message(message, self.max_len);
        let response = self
            .client
            .post(self.url.expose())
            .json(&WebhookPayload { content: &content })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(chars = content.chars().count(), "Alert delivered");
        Ok(())
    }

    fn max_len(&self) -> usize {
        self.max_len
    }
}
