use std::sync::Arc;
use std::time::Duration;

use foreman_agent::{build_resolver, HttpLlmClient, LlmClient};
use foreman_core::answer::Answerer;
use foreman_core::config::{AppConfig, ConfigError, LoadOptions};
use foreman_core::intent::{load_document_table, IntentRouter, TableError};
use foreman_core::rows::{RowSink, RowSource, RowSourceError};
use foreman_sheets::SheetsClient;
use foreman_slack::{sink_from_config, DeliveryError, MessageSink};
use thiserror::Error;
use tracing::info;

use crate::health::HealthState;
use crate::service::{QueryLog, QueryService};

const SLACK_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Application {
    pub config: AppConfig,
    pub service: Arc<QueryService>,
    pub health: HealthState,
}

/// External collaborators the service is assembled from.
pub struct Adapters {
    pub rows: Arc<dyn RowSource>,
    pub query_log: Option<Arc<dyn RowSink>>,
    pub messages: Arc<dyn MessageSink>,
    pub llm: Option<Arc<dyn LlmClient>>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("resolver categories are invalid: {0}")]
    Table(#[from] TableError),
    #[error("sheets client could not be created: {0}")]
    Sheets(#[source] RowSourceError),
    #[error("slack sink could not be created: {0}")]
    Slack(#[from] DeliveryError),
    #[error("llm client could not be created: {0}")]
    Llm(String),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let sheets = Arc::new(SheetsClient::from_config(&config.sheets).map_err(BootstrapError::Sheets)?);
    let messages = sink_from_config(&config.slack, SLACK_TIMEOUT)?;
    let llm = if config.llm.enabled {
        let client = HttpLlmClient::from_config(&config.llm)
            .map_err(|error| BootstrapError::Llm(error.to_string()))?;
        Some(Arc::new(client) as Arc<dyn LlmClient>)
    } else {
        None
    };
    info!(
        event_name = "system.bootstrap.adapters_ready",
        correlation_id = "bootstrap",
        slack_sink = messages.name(),
        llm_provider = if llm.is_some() { config.llm.provider.as_str() } else { "disabled" },
        "adapters initialized"
    );

    assemble(config, Adapters { rows: sheets.clone(), query_log: Some(sheets), messages, llm }).await
}

pub async fn assemble(config: AppConfig, adapters: Adapters) -> Result<Application, BootstrapError> {
    let categories = Arc::new(config.category_table()?);
    let documents =
        Arc::new(load_document_table(adapters.rows.as_ref(), &config.sheets.sop_range).await);
    let remote = adapters.llm.map(|client| (client, Duration::from_secs(config.llm.timeout_secs)));

    let router = Arc::new(IntentRouter::new(
        build_resolver(categories.clone(), config.resolver.category_threshold, remote.clone()),
        build_resolver(documents.clone(), config.resolver.document_threshold, remote.clone()),
    ));
    let query_log = config
        .sheets
        .query_log_range
        .clone()
        .zip(adapters.query_log)
        .map(|(range, sink)| QueryLog { sink, range });

    let service = QueryService::new(
        router,
        Answerer::new(adapters.rows, config.datasets.clone()),
        adapters.messages,
    )
    .with_query_log(query_log)
    .with_thinking_message(config.slack.thinking_message)
    .with_default_channel(config.slack.default_channel.clone());

    let health = HealthState {
        categories: categories.len(),
        documents: documents.len(),
        remote_classifier: remote.is_some(),
    };
    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        categories = health.categories,
        documents = health.documents,
        remote_classifier = health.remote_classifier,
        "application assembled"
    );

    Ok(Application { config, service: Arc::new(service), health })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use foreman_core::config::{AppConfig, ConfigOverrides, LoadOptions};
    use foreman_core::intent::default_document_table;
    use foreman_core::rows::InMemoryRowSource;
    use foreman_slack::{NoopMessageSink, QueryRequest};

    use super::{assemble, bootstrap, Adapters};

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.sheets.spreadsheet_id = "sheet-1".to_owned();
        config.sheets.query_log_range = Some("QueryLog!A:G".to_owned());
        config
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_with_an_app_level_slack_token() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                spreadsheet_id: Some("sheet-1".to_string()),
                slack_bot_token: Some("xapp-wrong".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().map(|error| error.to_string()).unwrap_or_default();
        assert!(message.contains("slack.bot_token"));
    }

    #[tokio::test]
    async fn assembled_service_uses_sheet_documents_and_logs_queries() {
        let rows = Arc::new(InMemoryRowSource::new().with_range(
            "SOPs!A2:C",
            vec![vec![
                "Gate Code SOP".to_owned(),
                "Gate codes live on the job card.".to_owned(),
                "gate code, lockbox code".to_owned(),
            ]],
        ));
        let app = assemble(
            config(),
            Adapters {
                rows: rows.clone(),
                query_log: Some(rows.clone()),
                messages: Arc::new(NoopMessageSink),
                llm: None,
            },
        )
        .await
        .expect("assembled");

        assert_eq!(app.health.documents, 1);
        assert_eq!(app.health.categories, 5);
        assert!(!app.health.remote_classifier);

        let reply = app
            .service
            .handle_on(
                QueryRequest { text: "lockbox code?".to_owned(), ..QueryRequest::default() },
                "req-9",
                NaiveDate::from_ymd_opt(2026, 10, 16).expect("date"),
            )
            .await;
        assert_eq!(reply.category_or_title, "Gate Code SOP");
        assert_eq!(rows.rows("QueryLog!A:G").len(), 1);
    }

    #[tokio::test]
    async fn missing_sop_sheet_falls_back_to_built_in_documents() {
        let app = assemble(
            config(),
            Adapters {
                rows: Arc::new(InMemoryRowSource::new()),
                query_log: None,
                messages: Arc::new(NoopMessageSink),
                llm: None,
            },
        )
        .await
        .expect("assembled");

        assert_eq!(app.health.documents, default_document_table().len());
    }
}
