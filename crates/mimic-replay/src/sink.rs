use async_trait::async_trait;

/// Outbound delivery capability: send archived content back into its channel.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, channel_external_id: &str, content: &str) -> anyhow::Result<()>;
}

/// Sink that posts `{channel, content}` to a webhook relay, which owns the
/// actual chat-platform credentials.
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl MessageSink for WebhookSink {
    async fn send(&self, channel_external_id: &str, content: &str) -> anyhow::Result<()> {
        self.client
            .post(&self.url)
            .json(&serde_json::json!({
                "channel": channel_external_id,
                "content": content,
            }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
