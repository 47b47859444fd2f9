use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use foreman_core::config::{AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

struct Field {
    key: &'static str,
    value: String,
    env_key: Option<&'static str>,
}

impl Field {
    fn new(key: &'static str, value: impl Into<String>, env_key: &'static str) -> Self {
        Self { key, value: value.into(), env_key: Some(env_key) }
    }

    fn file_only(key: &'static str, value: impl Into<String>) -> Self {
        Self { key, value: value.into(), env_key: None }
    }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key,
            field.env_key,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let datasets = config
        .datasets
        .iter()
        .map(|dataset| dataset.category.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let categories = match &config.resolver.categories {
        Some(entries) => format!("{} custom", entries.len()),
        None => "built-in".to_string(),
    };

    vec![
        Field::new(
            "sheets.spreadsheet_id",
            &config.sheets.spreadsheet_id,
            "FOREMAN_SHEETS_SPREADSHEET_ID",
        ),
        Field::new(
            "sheets.api_key",
            redact_secret(config.sheets.api_key.as_ref()),
            "FOREMAN_SHEETS_API_KEY",
        ),
        Field::new(
            "sheets.access_token",
            redact_secret(config.sheets.access_token.as_ref()),
            "FOREMAN_SHEETS_ACCESS_TOKEN",
        ),
        Field::new("sheets.base_url", &config.sheets.base_url, "FOREMAN_SHEETS_BASE_URL"),
        Field::new(
            "sheets.timeout_secs",
            config.sheets.timeout_secs.to_string(),
            "FOREMAN_SHEETS_TIMEOUT_SECS",
        ),
        Field::new("sheets.sop_range", &config.sheets.sop_range, "FOREMAN_SHEETS_SOP_RANGE"),
        Field::new(
            "sheets.query_log_range",
            config.sheets.query_log_range.as_deref().unwrap_or("<unset>"),
            "FOREMAN_SHEETS_QUERY_LOG_RANGE",
        ),
        Field::new(
            "slack.bot_token",
            config
                .slack
                .bot_token
                .as_ref()
                .map(|token| redact_token(token.expose_secret()))
                .unwrap_or_else(|| "<unset>".to_string()),
            "FOREMAN_SLACK_BOT_TOKEN",
        ),
        Field::new(
            "slack.webhook_url",
            redact_secret(config.slack.webhook_url.as_ref()),
            "FOREMAN_SLACK_WEBHOOK_URL",
        ),
        Field::new("slack.api_base_url", &config.slack.api_base_url, "FOREMAN_SLACK_API_BASE_URL"),
        Field::new(
            "slack.default_channel",
            config.slack.default_channel.as_deref().unwrap_or("<unset>"),
            "FOREMAN_SLACK_DEFAULT_CHANNEL",
        ),
        Field::new(
            "slack.thinking_message",
            config.slack.thinking_message.to_string(),
            "FOREMAN_SLACK_THINKING_MESSAGE",
        ),
        Field::new("llm.enabled", config.llm.enabled.to_string(), "FOREMAN_LLM_ENABLED"),
        Field::new("llm.provider", config.llm.provider.as_str(), "FOREMAN_LLM_PROVIDER"),
        Field::new("llm.model", &config.llm.model, "FOREMAN_LLM_MODEL"),
        Field::new(
            "llm.base_url",
            config.llm.base_url.as_deref().unwrap_or(config.llm.provider.default_base_url()),
            "FOREMAN_LLM_BASE_URL",
        ),
        Field::new("llm.api_key", redact_secret(config.llm.api_key.as_ref()), "FOREMAN_LLM_API_KEY"),
        Field::new(
            "llm.timeout_secs",
            config.llm.timeout_secs.to_string(),
            "FOREMAN_LLM_TIMEOUT_SECS",
        ),
        Field::new(
            "resolver.category_threshold",
            format!("{:.2}", config.resolver.category_threshold),
            "FOREMAN_RESOLVER_CATEGORY_THRESHOLD",
        ),
        Field::new(
            "resolver.document_threshold",
            format!("{:.2}", config.resolver.document_threshold),
            "FOREMAN_RESOLVER_DOCUMENT_THRESHOLD",
        ),
        Field::file_only("resolver.categories", categories),
        Field::new(
            "server.bind_address",
            &config.server.bind_address,
            "FOREMAN_SERVER_BIND_ADDRESS",
        ),
        Field::new("server.port", config.server.port.to_string(), "FOREMAN_SERVER_PORT"),
        Field::new("logging.level", &config.logging.level, "FOREMAN_LOGGING_LEVEL"),
        Field::new(
            "logging.format",
            format!("{:?}", config.logging.format),
            "FOREMAN_LOGGING_FORMAT",
        ),
        Field::file_only("datasets", datasets),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    ["foreman.toml", "config/foreman.toml"].into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_secret(secret: Option<&SecretString>) -> String {
    match secret {
        Some(_) => "<redacted>".to_string(),
        None => "<unset>".to_string(),
    }
}

/// Keeps the `xoxb-` style prefix so operators can tell token kinds apart.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
