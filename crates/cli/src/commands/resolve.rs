use std::sync::Arc;
use std::time::Duration;

use foreman_agent::{build_resolver, HttpLlmClient, LlmClient};
use foreman_core::config::{AppConfig, LoadOptions};
use foreman_core::intent::{default_document_table, load_document_table, IntentRouter, Resolution};
use foreman_sheets::SheetsClient;
use serde::Serialize;

use super::{runtime, serialize_payload, CommandResult};

#[derive(Clone, Copy, Debug, Default)]
pub struct ResolveOptions {
    pub json: bool,
    /// Built-in tables only; no Sheets or LLM traffic and no config required.
    pub offline: bool,
}

#[derive(Debug, Serialize)]
struct ResolveReport<'a> {
    command: &'static str,
    status: &'static str,
    query: &'a str,
    resolution: &'a Resolution,
    documents: usize,
    remote_classifier: bool,
}

struct Outcome {
    resolution: Resolution,
    documents: usize,
    remote_classifier: bool,
}

pub fn run(query: &str, options: ResolveOptions) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(_) if options.offline => AppConfig::default(),
        Err(error) => {
            return CommandResult::failure(
                "resolve",
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            );
        }
    };

    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(error) => return CommandResult::failure("resolve", "runtime", error, 1),
    };

    let outcome = match runtime.block_on(resolve(query, &config, options.offline)) {
        Ok(outcome) => outcome,
        Err(error) => return CommandResult::failure("resolve", "bootstrap", error, 3),
    };

    let output = if options.json {
        serialize_payload(&ResolveReport {
            command: "resolve",
            status: "ok",
            query,
            resolution: &outcome.resolution,
            documents: outcome.documents,
            remote_classifier: outcome.remote_classifier,
        })
    } else {
        render_human(&outcome.resolution)
    };

    CommandResult { exit_code: 0, output }
}

async fn resolve(query: &str, config: &AppConfig, offline: bool) -> Result<Outcome, String> {
    let categories = Arc::new(
        config.category_table().map_err(|error| format!("invalid resolver categories: {error}"))?,
    );

    let (documents, remote) = if offline {
        (default_document_table(), None)
    } else {
        let sheets = SheetsClient::from_config(&config.sheets)
            .map_err(|error| format!("sheets client could not be created: {error}"))?;
        let documents = load_document_table(&sheets, &config.sheets.sop_range).await;
        let remote = if config.llm.enabled {
            let client = HttpLlmClient::from_config(&config.llm)
                .map_err(|error| format!("llm client could not be created: {error}"))?;
            Some((
                Arc::new(client) as Arc<dyn LlmClient>,
                Duration::from_secs(config.llm.timeout_secs),
            ))
        } else {
            None
        };
        (documents, remote)
    };

    let documents = Arc::new(documents);
    let router = IntentRouter::new(
        build_resolver(categories, config.resolver.category_threshold, remote.clone()),
        build_resolver(documents.clone(), config.resolver.document_threshold, remote.clone()),
    );

    Ok(Outcome {
        resolution: router.route(query).await,
        documents: documents.len(),
        remote_classifier: remote.is_some(),
    })
}

fn render_human(resolution: &Resolution) -> String {
    match resolution {
        Resolution::Category { label, score, strategy } => {
            format!("category: {label} (score {score:.2}, strategy {strategy})")
        }
        Resolution::Document { title, summary, score, strategy } => {
            format!("document: {title} (score {score:.2}, strategy {strategy})\n  {summary}")
        }
        Resolution::NoMatch => "no match".to_string(),
    }
}
