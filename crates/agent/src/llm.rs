use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use foreman_core::config::{LlmConfig, LlmProvider};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_LABEL_TOKENS: u32 = 32;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Text completion over the OpenAI, Anthropic or Ollama HTTP APIs.
pub struct HttpLlmClient {
    http: Client,
    provider: LlmProvider,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
}

impl std::fmt::Debug for HttpLlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpLlmClient")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

impl HttpLlmClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build llm http client")?;
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| config.provider.default_base_url().to_owned());

        Ok(Self {
            http,
            provider: config.provider,
            base_url: base_url.trim_end_matches('/').to_owned(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    pub fn endpoint(&self) -> String {
        let path = match self.provider {
            LlmProvider::OpenAi => "/v1/chat/completions",
            LlmProvider::Anthropic => "/v1/messages",
            LlmProvider::Ollama => "/api/generate",
        };
        format!("{}{path}", self.base_url)
    }

    fn request_body(&self, prompt: &str) -> Value {
        match self.provider {
            LlmProvider::OpenAi => json!({
                "model": self.model,
                "temperature": 0,
                "max_tokens": MAX_LABEL_TOKENS,
                "messages": [{ "role": "user", "content": prompt }]
            }),
            LlmProvider::Anthropic => json!({
                "model": self.model,
                "max_tokens": MAX_LABEL_TOKENS,
                "messages": [{ "role": "user", "content": prompt }]
            }),
            LlmProvider::Ollama => json!({
                "model": self.model,
                "prompt": prompt,
                "stream": false,
                "options": { "temperature": 0 }
            }),
        }
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let mut request = self.http.post(self.endpoint()).json(&self.request_body(prompt));
        if let Some(key) = &self.api_key {
            request = match self.provider {
                LlmProvider::Anthropic => request
                    .header("x-api-key", key.expose_secret())
                    .header("anthropic-version", ANTHROPIC_VERSION),
                LlmProvider::OpenAi | LlmProvider::Ollama => {
                    request.bearer_auth(key.expose_secret())
                }
            };
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("{} request failed", self.provider.as_str()))?;
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "{} returned status {status}: {}",
                self.provider.as_str(),
                error_text.trim()
            ));
        }

        let payload: Value = response
            .json()
            .await
            .with_context(|| format!("{} response was not json", self.provider.as_str()))?;
        completion_text(self.provider, payload)
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicBlock>,
}

#[derive(Debug, Deserialize)]
struct AnthropicBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

/// Extracts the generated text from a provider response body.
pub fn completion_text(provider: LlmProvider, payload: Value) -> Result<String> {
    let text = match provider {
        LlmProvider::OpenAi => {
            let parsed: OpenAiResponse =
                serde_json::from_value(payload).context("unexpected openai response shape")?;
            parsed.choices.into_iter().next().and_then(|choice| choice.message.content)
        }
        LlmProvider::Anthropic => {
            let parsed: AnthropicResponse =
                serde_json::from_value(payload).context("unexpected anthropic response shape")?;
            parsed.content.into_iter().find(|block| block.kind == "text").and_then(|block| block.text)
        }
        LlmProvider::Ollama => {
            let parsed: OllamaResponse =
                serde_json::from_value(payload).context("unexpected ollama response shape")?;
            Some(parsed.response)
        }
    };

    text.filter(|text| !text.trim().is_empty())
        .ok_or_else(|| anyhow!("{} response carried no text", provider.as_str()))
}
