use foreman_agent::HttpLlmClient;
use foreman_core::config::{AppConfig, LoadOptions};
use foreman_core::intent::PhraseTable;
use foreman_core::rows::RowSource;
use foreman_sheets::SheetsClient;
use serde::Serialize;

use super::{runtime, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn skipped(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Skipped, details: details.into() }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_category_table(&config));
            checks.push(check_sop_documents(&config));
            checks.push(check_remote_classifier(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["category_table", "sop_documents", "remote_classifier"] {
                checks.push(DoctorCheck::skipped(
                    name,
                    "skipped because configuration did not load",
                ));
            }
        }
    }

    let any_failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if any_failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if any_failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_category_table(config: &AppConfig) -> DoctorCheck {
    match config.category_table() {
        Ok(table) => DoctorCheck {
            name: "category_table",
            status: CheckStatus::Pass,
            details: format!(
                "{} categories, threshold {:.2}",
                table.len(),
                config.resolver.category_threshold
            ),
        },
        Err(error) => {
            DoctorCheck { name: "category_table", status: CheckStatus::Fail, details: error.to_string() }
        }
    }
}

fn check_sop_documents(config: &AppConfig) -> DoctorCheck {
    let name = "sop_documents";
    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(details) => return DoctorCheck { name, status: CheckStatus::Fail, details },
    };

    let result = runtime.block_on(async {
        let client = SheetsClient::from_config(&config.sheets)
            .map_err(|error| format!("sheets client could not be created: {error}"))?;
        let rows = client
            .fetch_rows(&config.sheets.sop_range)
            .await
            .map_err(|error| format!("failed to read `{}`: {error}", config.sheets.sop_range))?;
        PhraseTable::from_document_rows(&rows)
            .map_err(|error| format!("SOP rows are unusable: {error}"))
    });

    match result {
        Ok(table) if !table.is_empty() => DoctorCheck {
            name,
            status: CheckStatus::Pass,
            details: format!(
                "{} documents from `{}`, threshold {:.2}",
                table.len(),
                config.sheets.sop_range,
                config.resolver.document_threshold
            ),
        },
        Ok(_) => DoctorCheck {
            name,
            status: CheckStatus::Fail,
            details: format!(
                "`{}` has no SOP rows; the built-in table would be used",
                config.sheets.sop_range
            ),
        },
        Err(details) => DoctorCheck { name, status: CheckStatus::Fail, details },
    }
}

fn check_remote_classifier(config: &AppConfig) -> DoctorCheck {
    let name = "remote_classifier";
    if !config.llm.enabled {
        return DoctorCheck::skipped(name, "llm.enabled is false; fuzzy matching only");
    }

    match HttpLlmClient::from_config(&config.llm) {
        Ok(client) => DoctorCheck {
            name,
            status: CheckStatus::Pass,
            details: format!(
                "{} `{}` at {} (timeout {}s)",
                client.provider().as_str(),
                config.llm.model,
                client.endpoint(),
                config.llm.timeout_secs
            ),
        },
        Err(error) => DoctorCheck { name, status: CheckStatus::Fail, details: format!("{error:#}") },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
