use super::{ReviewQueue, ReviewTicket};
use anyhow::{Context, bail};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// POSTs each ticket as JSON to an external review service.
pub struct WebhookReviewQueue {
    client: reqwest::Client,
    url: String,
}

impl WebhookReviewQueue {
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build review webhook client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl ReviewQueue for WebhookReviewQueue {
    fn name(&self) -> &str {
        "webhook"
    }

    fn submit<'a>(
        &'a self,
        ticket: &'a ReviewTicket,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .client
                .post(&self.url)
                .json(ticket)
                .send()
                .await
                .with_context(|| format!("POST review ticket to {}", self.url))?;
            let status = response.status();
            if !status.is_success() {
                bail!("review webhook returned {status}");
            }
            Ok(())
        })
    }
}
