//! Intent resolution: free-text query → category, SOP document, or no match.
//!
//! A resolver runs an ordered list of [`ResolutionStrategy`] values over one
//! [`PhraseTable`]. The local [`FuzzyMatcher`] is always last in the chain;
//! remote classification strategies (see `foreman-agent`) sit in front of it.
//! [`IntentRouter`] tries the category table first and the document table
//! second.

pub mod normalize;
pub mod resolver;
pub mod similarity;
pub mod table;

use serde::Serialize;
use tracing::{info, warn};

use crate::rows::RowSource;

pub use normalize::normalize;
pub use resolver::{
    FuzzyMatcher, IntentResolver, ResolutionStrategy, ResolvedMatch, ScoredMatch,
    CATEGORY_THRESHOLD, DOCUMENT_THRESHOLD, MAX_QUERY_CHARS,
};
pub use table::{
    default_category_entries, default_category_table, default_document_table, PhraseTable,
    TableEntry, TableError,
};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    Category { label: String, score: f64, strategy: &'static str },
    Document { title: String, summary: String, score: f64, strategy: &'static str },
    NoMatch,
}

impl Resolution {
    /// Category label, document title, or `no_match`.
    pub fn label(&self) -> &str {
        match self {
            Self::Category { label, .. } => label,
            Self::Document { title, .. } => title,
            Self::NoMatch => "no_match",
        }
    }

    pub fn strategy(&self) -> Option<&'static str> {
        match self {
            Self::Category { strategy, .. } | Self::Document { strategy, .. } => Some(*strategy),
            Self::NoMatch => None,
        }
    }
}

pub struct IntentRouter {
    categories: IntentResolver,
    documents: IntentResolver,
}

impl IntentRouter {
    pub fn new(categories: IntentResolver, documents: IntentResolver) -> Self {
        Self { categories, documents }
    }

    pub fn categories(&self) -> &IntentResolver {
        &self.categories
    }

    pub fn documents(&self) -> &IntentResolver {
        &self.documents
    }

    pub async fn route(&self, query: &str) -> Resolution {
        if let Some(resolved) = self.categories.resolve(query).await {
            return Resolution::Category {
                label: resolved.matched.label,
                score: resolved.matched.score,
                strategy: resolved.strategy,
            };
        }

        if let Some(resolved) = self.documents.resolve(query).await {
            return Resolution::Document {
                title: resolved.matched.label,
                summary: resolved.matched.summary.unwrap_or_default(),
                score: resolved.matched.score,
                strategy: resolved.strategy,
            };
        }

        Resolution::NoMatch
    }
}

/// Document table from the SOP sheet range (`title, summary, keywords`), or
/// the built-in catalog when the sheet cannot be read or holds no usable rows.
pub async fn load_document_table(source: &dyn RowSource, range: &str) -> PhraseTable {
    let loaded = match source.fetch_rows(range).await {
        Ok(rows) => PhraseTable::from_document_rows(&rows).map_err(|error| error.to_string()),
        Err(error) => Err(error.to_string()),
    };

    match loaded {
        Ok(table) if !table.is_empty() => {
            info!(
                event_name = "intent.documents.loaded",
                range,
                documents = table.len(),
                "loaded SOP documents from sheet"
            );
            table
        }
        Ok(_) => {
            warn!(
                event_name = "intent.documents.fallback",
                range,
                reason = "no usable rows",
                "using built-in SOP catalog"
            );
            default_document_table()
        }
        Err(error) => {
            warn!(
                event_name = "intent.documents.fallback",
                range,
                reason = %error,
                "using built-in SOP catalog"
            );
            default_document_table()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{
        default_category_table, default_document_table, load_document_table, IntentResolver,
        IntentRouter, Resolution, CATEGORY_THRESHOLD, DOCUMENT_THRESHOLD,
    };
    use crate::rows::InMemoryRowSource;

    fn router() -> IntentRouter {
        IntentRouter::new(
            IntentResolver::fuzzy(Arc::new(default_category_table()), CATEGORY_THRESHOLD),
            IntentResolver::fuzzy(Arc::new(default_document_table()), DOCUMENT_THRESHOLD),
        )
    }

    #[tokio::test]
    async fn category_queries_win_before_documents() {
        let resolution = router().route("What jobs are due today?").await;

        assert!(matches!(
            resolution,
            Resolution::Category { ref label, strategy: "fuzzy", .. } if label == "jobs_today"
        ));
    }

    #[tokio::test]
    async fn sop_queries_fall_through_to_documents() {
        let resolution = router().route("warranty job complete").await;

        match resolution {
            Resolution::Document { title, summary, .. } => {
                assert_eq!(title, "Warranty Trigger SOP");
                assert!(!summary.is_empty());
            }
            other => panic!("expected document resolution, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn specific_sop_phrases_beat_a_generic_shared_word() {
        let router = router();
        let queries = [
            ("what is the sop for a job site safety checklist", "Job Site Safety Checklist SOP"),
            ("weather delay on a job", "Weather Delay SOP"),
            ("how do i report a weather delay on a job", "Weather Delay SOP"),
            ("invoice payment for the job", "Invoice & Payment Tracker SOP"),
        ];

        for (query, expected) in queries {
            match router.route(query).await {
                Resolution::Document { title, score, .. } => {
                    assert_eq!(title, expected, "{query}");
                    assert!(score < 1.0, "{query} scored {score}");
                }
                other => panic!("expected a document for {query:?}, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn gibberish_and_empty_queries_are_no_match() {
        let router = router();

        assert_eq!(router.route("xyzzy plugh").await, Resolution::NoMatch);
        assert_eq!(router.route("").await, Resolution::NoMatch);
        assert_eq!(Resolution::NoMatch.label(), "no_match");
        assert_eq!(Resolution::NoMatch.strategy(), None);
    }

    #[tokio::test]
    async fn document_table_loads_from_sheet_rows() {
        let source = InMemoryRowSource::new().with_range(
            "SOPs!A2:C",
            vec![
                vec![
                    "Gate Code SOP".to_owned(),
                    "Gate codes live on the job card.".to_owned(),
                    "gate code, lockbox".to_owned(),
                ],
                vec!["".to_owned(), "orphan summary".to_owned(), "ignored".to_owned()],
            ],
        );

        let table = load_document_table(&source, "SOPs!A2:C").await;

        assert_eq!(table.len(), 1);
        let entry = table.find("gate code sop").expect("entry");
        assert_eq!(entry.summary.as_deref(), Some("Gate codes live on the job card."));
    }

    #[tokio::test]
    async fn duplicate_sheet_titles_do_not_discard_the_sheet() {
        let row = |title: &str, keywords: &str| {
            vec![title.to_owned(), format!("{title} summary"), keywords.to_owned()]
        };
        let source = InMemoryRowSource::new().with_range(
            "SOPs!A2:C",
            vec![
                row("Gate Code SOP", "gate code"),
                row("Lockbox SOP", "lockbox"),
                row("Gate Code SOP", "gate code, keypad"),
            ],
        );

        let table = load_document_table(&source, "SOPs!A2:C").await;

        assert_eq!(table.len(), 2);
        assert!(table.find("Lockbox SOP").is_some());
        assert_eq!(table.find("Gate Code SOP").map(|e| e.phrases.len()), Some(2));
    }

    #[tokio::test]
    async fn unreadable_or_empty_sheets_fall_back_to_built_in_catalog() {
        let empty = InMemoryRowSource::new().with_range("SOPs!A2:C", Vec::new());

        let missing = load_document_table(&InMemoryRowSource::new(), "SOPs!A2:C").await;
        let blank = load_document_table(&empty, "SOPs!A2:C").await;

        assert_eq!(missing, default_document_table());
        assert_eq!(blank, default_document_table());
    }
}
