use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use foreman_core::config::SlackConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::blocks::MessageTemplate;

/// Where a reply goes. `thread_ts` threads the reply under the asking message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplyTarget {
    pub channel: Option<String>,
    pub thread_ts: Option<String>,
}

impl ReplyTarget {
    pub fn channel(channel: impl Into<String>) -> Self {
        Self { channel: Some(channel.into()), thread_ts: None }
    }

    pub fn in_thread(mut self, thread_ts: impl Into<String>) -> Self {
        self.thread_ts = Some(thread_ts.into());
        self
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("slack request failed: {0}")]
    Request(String),
    #[error("slack returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("slack api error: {0}")]
    Api(String),
    #[error("no channel to post to")]
    MissingChannel,
}

#[async_trait]
pub trait MessageSink: Send + Sync {
    fn name(&self) -> &'static str;
    async fn post(
        &self,
        target: &ReplyTarget,
        message: &MessageTemplate,
    ) -> Result<(), DeliveryError>;
}

/// Posts through `chat.postMessage` with a bot token.
pub struct WebApiSink {
    http: Client,
    api_base_url: String,
    bot_token: SecretString,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

impl WebApiSink {
    pub fn new(
        api_base_url: impl Into<String>,
        bot_token: SecretString,
        timeout: Duration,
    ) -> Result<Self, DeliveryError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| DeliveryError::Request(error.to_string()))?;
        let api_base_url = api_base_url.into().trim_end_matches('/').to_owned();
        Ok(Self { http, api_base_url, bot_token })
    }
}

#[async_trait]
impl MessageSink for WebApiSink {
    fn name(&self) -> &'static str {
        "web_api"
    }

    async fn post(
        &self,
        target: &ReplyTarget,
        message: &MessageTemplate,
    ) -> Result<(), DeliveryError> {
        let channel = target.channel.as_deref().ok_or(DeliveryError::MissingChannel)?;
        let mut body = message_body(message);
        body.insert("channel".to_owned(), json!(channel));
        if let Some(thread_ts) = &target.thread_ts {
            body.insert("thread_ts".to_owned(), json!(thread_ts));
        }

        let response = self
            .http
            .post(format!("{}/chat.postMessage", self.api_base_url))
            .bearer_auth(self.bot_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| DeliveryError::Request(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Status { status: status.as_u16(), body });
        }

        let payload: ApiResponse =
            response.json().await.map_err(|error| DeliveryError::Request(error.to_string()))?;
        if !payload.ok {
            let error = payload.error.unwrap_or_else(|| "unknown_error".to_owned());
            return Err(DeliveryError::Api(error));
        }

        debug!(event_name = "slack.message.posted", sink = self.name(), channel, "posted message");
        Ok(())
    }
}

/// Posts to an incoming webhook. The webhook fixes the channel, so the
/// target's channel is ignored.
pub struct WebhookSink {
    http: Client,
    url: SecretString,
}

impl WebhookSink {
    pub fn new(url: SecretString, timeout: Duration) -> Result<Self, DeliveryError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| DeliveryError::Request(error.to_string()))?;
        Ok(Self { http, url })
    }
}

#[async_trait]
impl MessageSink for WebhookSink {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn post(
        &self,
        _target: &ReplyTarget,
        message: &MessageTemplate,
    ) -> Result<(), DeliveryError> {
        let response = self
            .http
            .post(self.url.expose_secret())
            .json(&message_body(message))
            .send()
            .await
            .map_err(|error| DeliveryError::Request(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Status { status: status.as_u16(), body });
        }

        debug!(event_name = "slack.message.posted", sink = self.name(), "posted message");
        Ok(())
    }
}

#[derive(Default)]
pub struct NoopMessageSink;

#[async_trait]
impl MessageSink for NoopMessageSink {
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn post(
        &self,
        _target: &ReplyTarget,
        _message: &MessageTemplate,
    ) -> Result<(), DeliveryError> {
        Ok(())
    }
}

/// Bot token wins over the webhook; with neither, messages are dropped.
pub fn sink_from_config(
    config: &SlackConfig,
    timeout: Duration,
) -> Result<Arc<dyn MessageSink>, DeliveryError> {
    let present = |secret: &Option<SecretString>| {
        secret.as_ref().filter(|value| !value.expose_secret().trim().is_empty()).cloned()
    };

    if let Some(token) = present(&config.bot_token) {
        return Ok(Arc::new(WebApiSink::new(config.api_base_url.clone(), token, timeout)?));
    }
    if let Some(url) = present(&config.webhook_url) {
        return Ok(Arc::new(WebhookSink::new(url, timeout)?));
    }
    Ok(Arc::new(NoopMessageSink))
}

fn message_body(message: &MessageTemplate) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert("text".to_owned(), json!(message.fallback_text));
    body.insert("blocks".to_owned(), json!(message.blocks));
    body
}
