use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use super::normalize::normalize;
use super::similarity::similarity;
use super::table::{PhraseTable, TableEntry};

pub const CATEGORY_THRESHOLD: f64 = 0.70;
pub const DOCUMENT_THRESHOLD: f64 = 0.50;
/// Queries are cut to this many characters before any strategy sees them.
/// Slack recommends keeping message text under 4000 characters.
pub const MAX_QUERY_CHARS: usize = 4_000;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScoredMatch {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub score: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResolvedMatch {
    #[serde(flatten)]
    pub matched: ScoredMatch,
    pub strategy: &'static str,
}

/// One step of the resolution chain. `None` hands the query to the next
/// strategy.
#[async_trait]
pub trait ResolutionStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    async fn attempt(&self, normalized_query: &str) -> Option<ScoredMatch>;
}

/// Linear best-match scan over a phrase table with a strict threshold.
#[derive(Clone, Debug)]
pub struct FuzzyMatcher {
    table: Arc<PhraseTable>,
    threshold: f64,
}

impl FuzzyMatcher {
    pub fn new(table: Arc<PhraseTable>, threshold: f64) -> Self {
        Self { table, threshold }
    }

    pub fn table(&self) -> &PhraseTable {
        &self.table
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Highest scoring entry regardless of threshold. Ties keep the entry seen
    /// first.
    pub fn best_match(&self, normalized_query: &str) -> Option<ScoredMatch> {
        let mut best: Option<(&TableEntry, f64)> = None;

        for entry in self.table.entries() {
            for phrase in &entry.phrases {
                let score = similarity(normalized_query, phrase);
                if best.map_or(true, |(_, best_score)| score > best_score) {
                    best = Some((entry, score));
                }
            }
        }

        best.map(|(entry, score)| ScoredMatch {
            label: entry.label.clone(),
            summary: entry.summary.clone(),
            score,
        })
    }

    pub fn resolve(&self, normalized_query: &str) -> Option<ScoredMatch> {
        if normalized_query.is_empty() {
            return None;
        }
        self.best_match(normalized_query).filter(|matched| exceeds(matched.score, self.threshold))
    }
}

pub fn exceeds(score: f64, threshold: f64) -> bool {
    score > threshold
}

#[async_trait]
impl ResolutionStrategy for FuzzyMatcher {
    fn name(&self) -> &'static str {
        "fuzzy"
    }

    async fn attempt(&self, normalized_query: &str) -> Option<ScoredMatch> {
        self.resolve(normalized_query)
    }
}

/// Ordered strategy chain over one table. The first strategy that returns a
/// match wins.
#[derive(Clone)]
pub struct IntentResolver {
    table: Arc<PhraseTable>,
    strategies: Vec<Arc<dyn ResolutionStrategy>>,
}

impl IntentResolver {
    pub fn new(table: Arc<PhraseTable>, strategies: Vec<Arc<dyn ResolutionStrategy>>) -> Self {
        Self { table, strategies }
    }

    /// Resolver that only runs the local fuzzy matcher.
    pub fn fuzzy(table: Arc<PhraseTable>, threshold: f64) -> Self {
        let matcher = FuzzyMatcher::new(table.clone(), threshold);
        Self::new(table, vec![Arc::new(matcher)])
    }

    pub fn table(&self) -> &PhraseTable {
        &self.table
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|strategy| strategy.name()).collect()
    }

    pub async fn resolve(&self, query: &str) -> Option<ResolvedMatch> {
        let mut normalized = normalize(query);
        if normalized.is_empty() {
            return None;
        }
        if let Some((cut, _)) = normalized.char_indices().nth(MAX_QUERY_CHARS) {
            warn!(
                event_name = "intent.query.truncated",
                query_chars = normalized.chars().count(),
                max_chars = MAX_QUERY_CHARS,
                "query exceeds the resolver limit; matching on its prefix"
            );
            normalized.truncate(cut);
            normalized.truncate(normalized.trim_end().len());
        }

        for strategy in &self.strategies {
            if let Some(matched) = strategy.attempt(&normalized).await {
                debug!(
                    event_name = "intent.resolved",
                    strategy = strategy.name(),
                    label = %matched.label,
                    score = matched.score,
                    "query resolved"
                );
                return Some(ResolvedMatch { matched, strategy: strategy.name() });
            }
        }

        None
    }
}
