use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use foreman_core::intent::{
    FuzzyMatcher, IntentResolver, PhraseTable, ResolutionStrategy, ScoredMatch,
};
use tracing::{debug, warn};

use crate::llm::LlmClient;

/// Asks a text-completion model to pick exactly one label from a phrase
/// table. Anything other than a known label hands the query on to the next
/// strategy.
pub struct RemoteClassifierStrategy {
    client: Arc<dyn LlmClient>,
    table: Arc<PhraseTable>,
    timeout: Duration,
}

impl RemoteClassifierStrategy {
    pub fn new(client: Arc<dyn LlmClient>, table: Arc<PhraseTable>, timeout: Duration) -> Self {
        Self { client, table, timeout }
    }

    pub fn prompt(&self, normalized_query: &str) -> String {
        let vocabulary = self
            .table
            .entries()
            .iter()
            .map(|entry| format!("- {} (e.g. {})", entry.label, entry.phrases.join(", ")))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "You route questions from a construction operations team.\n\
             Pick the single label that best matches the query.\n\
             Labels:\n{vocabulary}\n\n\
             Reply with the label exactly as written and nothing else. \
             If no label fits, reply with none.\n\n\
             Query: {normalized_query}"
        )
    }

    fn fall_back(&self, reason: &'static str, detail: &str) {
        warn!(
            event_name = "intent.remote.fallback",
            reason,
            detail,
            timeout_ms = self.timeout.as_millis() as u64,
            "remote classification unavailable, using local matching"
        );
    }
}

#[async_trait]
impl ResolutionStrategy for RemoteClassifierStrategy {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn attempt(&self, normalized_query: &str) -> Option<ScoredMatch> {
        let prompt = self.prompt(normalized_query);
        let completion = match tokio::time::timeout(self.timeout, self.client.complete(&prompt)).await
        {
            Ok(Ok(completion)) => completion,
            Ok(Err(error)) => {
                self.fall_back("request_failed", &error.to_string());
                return None;
            }
            Err(_) => {
                self.fall_back("timeout", "classification call exceeded its time budget");
                return None;
            }
        };

        let Some(candidate) = clean_label(&completion) else {
            self.fall_back("empty_output", "");
            return None;
        };
        if candidate.eq_ignore_ascii_case("none") {
            debug!(event_name = "intent.remote.declined", "remote classifier found no label");
            return None;
        }

        match self.table.find(&candidate) {
            Some(entry) => Some(ScoredMatch {
                label: entry.label.clone(),
                summary: entry.summary.clone(),
                score: 1.0,
            }),
            None => {
                self.fall_back("out_of_vocabulary", &candidate);
                None
            }
        }
    }
}

/// First non-empty line of the completion with quotes, backticks and
/// trailing punctuation removed.
pub fn clean_label(completion: &str) -> Option<String> {
    let line = completion.lines().map(str::trim).find(|line| !line.is_empty())?;
    let cleaned = line
        .trim_matches(|ch: char| matches!(ch, '"' | '\'' | '`' | '*') || ch.is_whitespace())
        .trim_end_matches(|ch: char| matches!(ch, '.' | ',' | ';' | ':' | '!' | '?'))
        .trim_matches(|ch: char| matches!(ch, '"' | '\'' | '`' | '*') || ch.is_whitespace());

    (!cleaned.is_empty()).then(|| cleaned.to_owned())
}

/// Resolver for one table: the remote classifier first when a client is
/// given, the fuzzy matcher always last.
pub fn build_resolver(
    table: Arc<PhraseTable>,
    threshold: f64,
    remote: Option<(Arc<dyn LlmClient>, Duration)>,
) -> IntentResolver {
    let mut strategies: Vec<Arc<dyn ResolutionStrategy>> = Vec::new();
    if let Some((client, timeout)) = remote {
        strategies.push(Arc::new(RemoteClassifierStrategy::new(client, table.clone(), timeout)));
    }
    strategies.push(Arc::new(FuzzyMatcher::new(table.clone(), threshold)));
    IntentResolver::new(table, strategies)
}
