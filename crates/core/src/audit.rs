use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::intent::Resolution;
use crate::rows::Row;

/// One handled query, appended to the query log range.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueryLogRecord {
    pub logged_at: DateTime<Utc>,
    pub correlation_id: String,
    pub channel: String,
    pub query: String,
    pub outcome_label: String,
    pub strategy: Option<&'static str>,
    pub score: Option<f64>,
}

impl QueryLogRecord {
    pub fn new(
        correlation_id: impl Into<String>,
        channel: impl Into<String>,
        query: impl Into<String>,
        resolution: &Resolution,
    ) -> Self {
        let score = match resolution {
            Resolution::Category { score, .. } | Resolution::Document { score, .. } => {
                Some(*score)
            }
            Resolution::NoMatch => None,
        };

        Self {
            logged_at: Utc::now(),
            correlation_id: correlation_id.into(),
            channel: channel.into(),
            query: query.into(),
            outcome_label: resolution.label().to_owned(),
            strategy: resolution.strategy(),
            score,
        }
    }

    pub fn to_row(&self) -> Row {
        vec![
            self.logged_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.correlation_id.clone(),
            self.channel.clone(),
            self.query.clone(),
            self.outcome_label.clone(),
            self.strategy.unwrap_or("none").to_owned(),
            self.score.map(|score| format!("{score:.2}")).unwrap_or_default(),
        ]
    }
}
