use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::answer::{default_datasets, Dataset};
use crate::rows::{RowFilter, MAX_OFFSET_DAYS};
use crate::intent::{
    default_category_table, PhraseTable, TableEntry, TableError, CATEGORY_THRESHOLD,
    DOCUMENT_THRESHOLD,
};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub sheets: SheetsConfig,
    pub slack: SlackConfig,
    pub llm: LlmConfig,
    pub resolver: ResolverConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub datasets: Vec<Dataset>,
}

#[derive(Clone, Debug)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub api_key: Option<SecretString>,
    pub access_token: Option<SecretString>,
    pub base_url: String,
    pub timeout_secs: u64,
    pub sop_range: String,
    pub query_log_range: Option<String>,
}

#[derive(Clone, Debug)]
pub struct SlackConfig {
    pub bot_token: Option<SecretString>,
    pub webhook_url: Option<SecretString>,
    pub api_base_url: String,
    pub default_channel: Option<String>,
    pub thinking_message: bool,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub enabled: bool,
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ResolverConfig {
    pub category_threshold: f64,
    pub document_threshold: f64,
    pub categories: Option<Vec<TableEntry>>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub spreadsheet_id: Option<String>,
    pub slack_bot_token: Option<String>,
    pub slack_webhook_url: Option<String>,
    pub log_level: Option<String>,
    pub llm_enabled: Option<bool>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub category_threshold: Option<f64>,
    pub document_threshold: Option<f64>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sheets: SheetsConfig {
                spreadsheet_id: String::new(),
                api_key: None,
                access_token: None,
                base_url: "https://sheets.googleapis.com".to_string(),
                timeout_secs: 10,
                sop_range: "SOPs!A2:C".to_string(),
                query_log_range: None,
            },
            slack: SlackConfig {
                bot_token: None,
                webhook_url: None,
                api_base_url: "https://slack.com/api".to_string(),
                default_channel: None,
                thinking_message: true,
            },
            llm: LlmConfig {
                enabled: false,
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: None,
                model: "llama3.1".to_string(),
                timeout_secs: 5,
            },
            resolver: ResolverConfig {
                category_threshold: CATEGORY_THRESHOLD,
                document_threshold: DOCUMENT_THRESHOLD,
                categories: None,
            },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 3000 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
            datasets: default_datasets(),
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl LlmProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com",
            Self::Anthropic => "https://api.anthropic.com",
            Self::Ollama => "http://localhost:11434",
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|anthropic|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("foreman.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Category table from config, or the built-in one.
    pub fn category_table(&self) -> Result<PhraseTable, TableError> {
        match &self.resolver.categories {
            Some(entries) => PhraseTable::new(entries.clone()),
            None => Ok(default_category_table()),
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(sheets) = patch.sheets {
            if let Some(spreadsheet_id) = sheets.spreadsheet_id {
                self.sheets.spreadsheet_id = spreadsheet_id;
            }
            if let Some(sheets_api_key_value) = sheets.api_key {
                self.sheets.api_key = Some(secret_value(sheets_api_key_value));
            }
            if let Some(sheets_access_token_value) = sheets.access_token {
                self.sheets.access_token = Some(secret_value(sheets_access_token_value));
            }
            if let Some(base_url) = sheets.base_url {
                self.sheets.base_url = base_url;
            }
            if let Some(timeout_secs) = sheets.timeout_secs {
                self.sheets.timeout_secs = timeout_secs;
            }
            if let Some(sop_range) = sheets.sop_range {
                self.sheets.sop_range = sop_range;
            }
            if let Some(query_log_range) = sheets.query_log_range {
                self.sheets.query_log_range = Some(query_log_range);
            }
        }

        if let Some(slack) = patch.slack {
            if let Some(slack_bot_token_value) = slack.bot_token {
                self.slack.bot_token = Some(secret_value(slack_bot_token_value));
            }
            if let Some(slack_webhook_url_value) = slack.webhook_url {
                self.slack.webhook_url = Some(secret_value(slack_webhook_url_value));
            }
            if let Some(api_base_url) = slack.api_base_url {
                self.slack.api_base_url = api_base_url;
            }
            if let Some(default_channel) = slack.default_channel {
                self.slack.default_channel = Some(default_channel);
            }
            if let Some(thinking_message) = slack.thinking_message {
                self.slack.thinking_message = thinking_message;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(enabled) = llm.enabled {
                self.llm.enabled = enabled;
            }
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(resolver) = patch.resolver {
            if let Some(category_threshold) = resolver.category_threshold {
                self.resolver.category_threshold = category_threshold;
            }
            if let Some(document_threshold) = resolver.document_threshold {
                self.resolver.document_threshold = document_threshold;
            }
            if let Some(categories) = resolver.categories {
                self.resolver.categories = Some(categories);
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        if let Some(datasets) = patch.datasets {
            self.datasets = datasets;
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("FOREMAN_SHEETS_SPREADSHEET_ID") {
            self.sheets.spreadsheet_id = value;
        }
        if let Some(value) = read_env("FOREMAN_SHEETS_API_KEY") {
            self.sheets.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("FOREMAN_SHEETS_ACCESS_TOKEN") {
            self.sheets.access_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("FOREMAN_SHEETS_BASE_URL") {
            self.sheets.base_url = value;
        }
        if let Some(value) = read_env("FOREMAN_SHEETS_TIMEOUT_SECS") {
            self.sheets.timeout_secs = parse_u64("FOREMAN_SHEETS_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("FOREMAN_SHEETS_SOP_RANGE") {
            self.sheets.sop_range = value;
        }
        if let Some(value) = read_env("FOREMAN_SHEETS_QUERY_LOG_RANGE") {
            self.sheets.query_log_range = Some(value);
        }

        if let Some(value) = read_env("FOREMAN_SLACK_BOT_TOKEN") {
            self.slack.bot_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("FOREMAN_SLACK_WEBHOOK_URL") {
            self.slack.webhook_url = Some(secret_value(value));
        }
        if let Some(value) = read_env("FOREMAN_SLACK_API_BASE_URL") {
            self.slack.api_base_url = value;
        }
        if let Some(value) = read_env("FOREMAN_SLACK_DEFAULT_CHANNEL") {
            self.slack.default_channel = Some(value);
        }
        if let Some(value) = read_env("FOREMAN_SLACK_THINKING_MESSAGE") {
            self.slack.thinking_message = parse_bool("FOREMAN_SLACK_THINKING_MESSAGE", &value)?;
        }

        if let Some(value) = read_env("FOREMAN_LLM_ENABLED") {
            self.llm.enabled = parse_bool("FOREMAN_LLM_ENABLED", &value)?;
        }
        if let Some(value) = read_env("FOREMAN_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("FOREMAN_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("FOREMAN_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("FOREMAN_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("FOREMAN_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("FOREMAN_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("FOREMAN_RESOLVER_CATEGORY_THRESHOLD") {
            self.resolver.category_threshold =
                parse_f64("FOREMAN_RESOLVER_CATEGORY_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("FOREMAN_RESOLVER_DOCUMENT_THRESHOLD") {
            self.resolver.document_threshold =
                parse_f64("FOREMAN_RESOLVER_DOCUMENT_THRESHOLD", &value)?;
        }

        if let Some(value) = read_env("FOREMAN_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("FOREMAN_SERVER_PORT") {
            self.server.port = parse_u16("FOREMAN_SERVER_PORT", &value)?;
        }

        let log_level = read_env("FOREMAN_LOGGING_LEVEL").or_else(|| read_env("FOREMAN_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("FOREMAN_LOGGING_FORMAT").or_else(|| read_env("FOREMAN_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(spreadsheet_id) = overrides.spreadsheet_id {
            self.sheets.spreadsheet_id = spreadsheet_id;
        }
        if let Some(slack_bot_token) = overrides.slack_bot_token {
            self.slack.bot_token = Some(secret_value(slack_bot_token));
        }
        if let Some(slack_webhook_url) = overrides.slack_webhook_url {
            self.slack.webhook_url = Some(secret_value(slack_webhook_url));
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_enabled) = overrides.llm_enabled {
            self.llm.enabled = llm_enabled;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(category_threshold) = overrides.category_threshold {
            self.resolver.category_threshold = category_threshold;
        }
        if let Some(document_threshold) = overrides.document_threshold {
            self.resolver.document_threshold = document_threshold;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_sheets(&self.sheets)?;
        validate_slack(&self.slack)?;
        validate_llm(&self.llm)?;
        validate_resolver(self)?;
        validate_datasets(&self.datasets)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("foreman.toml"), PathBuf::from("config/foreman.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn validate_sheets(sheets: &SheetsConfig) -> Result<(), ConfigError> {
    if sheets.spreadsheet_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "sheets.spreadsheet_id is required. Copy it from the spreadsheet URL (https://docs.google.com/spreadsheets/d/<id>/edit)".to_string(),
        ));
    }

    if !is_http_url(&sheets.base_url) {
        return Err(ConfigError::Validation(
            "sheets.base_url must start with http:// or https://".to_string(),
        ));
    }

    if sheets.timeout_secs == 0 || sheets.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "sheets.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if sheets.sop_range.trim().is_empty() {
        return Err(ConfigError::Validation("sheets.sop_range must not be empty".to_string()));
    }

    Ok(())
}

fn validate_slack(slack: &SlackConfig) -> Result<(), ConfigError> {
    let bot_token = slack.bot_token.as_ref().map(|token| token.expose_secret().trim());
    let webhook_url = slack.webhook_url.as_ref().map(|url| url.expose_secret().trim());

    let has_bot_token = bot_token.is_some_and(|token| !token.is_empty());
    let has_webhook = webhook_url.is_some_and(|url| !url.is_empty());
    if !has_bot_token && !has_webhook {
        return Err(ConfigError::Validation(
            "slack.bot_token or slack.webhook_url is required. Get a bot token from https://api.slack.com/apps > Your App > OAuth & Permissions > Bot User OAuth Token".to_string(),
        ));
    }

    if let Some(token) = bot_token.filter(|token| !token.is_empty()) {
        if !token.starts_with("xoxb-") {
            let hint = if token.starts_with("xapp-") {
                " (hint: you may have used the app-level token instead of the bot token)"
            } else {
                ""
            };
            return Err(ConfigError::Validation(format!(
                "slack.bot_token must start with `xoxb-`{hint}. Get it from https://api.slack.com/apps"
            )));
        }
    }

    if let Some(url) = webhook_url.filter(|url| !url.is_empty()) {
        if !is_http_url(url) {
            return Err(ConfigError::Validation(
                "slack.webhook_url must start with http:// or https://".to_string(),
            ));
        }
    }

    if !is_http_url(&slack.api_base_url) {
        return Err(ConfigError::Validation(
            "slack.api_base_url must start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if !llm.enabled {
        return Ok(());
    }

    if llm.timeout_secs == 0 || llm.timeout_secs > 60 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=60".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    match llm.provider {
        LlmProvider::OpenAi | LlmProvider::Anthropic => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for openai/anthropic providers".to_string(),
                ));
            }
        }
        LlmProvider::Ollama => {}
    }

    if let Some(base_url) = llm.base_url.as_deref() {
        if !is_http_url(base_url) {
            return Err(ConfigError::Validation(
                "llm.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_resolver(config: &AppConfig) -> Result<(), ConfigError> {
    let thresholds = [
        ("resolver.category_threshold", config.resolver.category_threshold),
        ("resolver.document_threshold", config.resolver.document_threshold),
    ];
    for (key, value) in thresholds {
        if !(0.0..1.0).contains(&value) {
            return Err(ConfigError::Validation(format!("{key} must be in range 0.0..1.0")));
        }
    }

    config
        .category_table()
        .map(|_| ())
        .map_err(|error| ConfigError::Validation(format!("resolver.categories: {error}")))
}

fn validate_datasets(datasets: &[Dataset]) -> Result<(), ConfigError> {
    let mut seen = std::collections::HashSet::new();
    for dataset in datasets {
        if !seen.insert(dataset.category.to_ascii_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "datasets: category `{}` is configured more than once",
                dataset.category
            )));
        }
        if dataset.range.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "datasets: `{}` needs a non-empty range",
                dataset.category
            )));
        }
        if let RowFilter::OnDate { offset_days, .. } = dataset.filter {
            if !(-MAX_OFFSET_DAYS..=MAX_OFFSET_DAYS).contains(&offset_days) {
                return Err(ConfigError::Validation(format!(
                    "datasets: `{}` offset_days must be in range -{MAX_OFFSET_DAYS}..={MAX_OFFSET_DAYS}",
                    dataset.category
                )));
            }
        }
    }
    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    sheets: Option<SheetsPatch>,
    slack: Option<SlackPatch>,
    llm: Option<LlmPatch>,
    resolver: Option<ResolverPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
    datasets: Option<Vec<Dataset>>,
}

#[derive(Debug, Default, Deserialize)]
struct SheetsPatch {
    spreadsheet_id: Option<String>,
    api_key: Option<String>,
    access_token: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    sop_range: Option<String>,
    query_log_range: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SlackPatch {
    bot_token: Option<String>,
    webhook_url: Option<String>,
    api_base_url: Option<String>,
    default_channel: Option<String>,
    thinking_message: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    enabled: Option<bool>,
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ResolverPatch {
    category_threshold: Option<f64>,
    document_threshold: Option<f64>,
    categories: Option<Vec<TableEntry>>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
