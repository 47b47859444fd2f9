use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::ApplicationError;
use crate::intent::Resolution;
use crate::rows::{Row, RowFilter, RowSource};

pub const MAX_LISTED_ROWS: usize = 15;
pub const NO_MATCH_BODY: &str = "No matching SOP or query found. Try rephrasing your query.";

/// Wire shape of every bot reply.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub category_or_title: String,
    pub body: String,
}

impl Reply {
    pub fn new(category_or_title: impl Into<String>, body: impl Into<String>) -> Self {
        Self { category_or_title: category_or_title.into(), body: body.into() }
    }

    pub fn no_match() -> Self {
        Self::new("no_match", NO_MATCH_BODY)
    }

    pub fn is_no_match(&self) -> bool {
        self.category_or_title == "no_match"
    }
}

/// Where a category's rows live and which of them answer the query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub category: String,
    pub title: String,
    pub range: String,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default = "default_filter")]
    pub filter: RowFilter,
}

fn default_filter() -> RowFilter {
    RowFilter::All
}

pub fn default_datasets() -> Vec<Dataset> {
    let job_columns = vec![
        "Job".to_owned(),
        "Address".to_owned(),
        "Date".to_owned(),
        "Phase".to_owned(),
        "Superintendent".to_owned(),
    ];

    vec![
        Dataset {
            category: "jobs_today".to_owned(),
            title: "Jobs scheduled today".to_owned(),
            range: "Jobs!A2:E".to_owned(),
            columns: job_columns.clone(),
            filter: RowFilter::OnDate { column: 2, offset_days: 0 },
        },
        Dataset {
            category: "jobs_tomorrow".to_owned(),
            title: "Jobs scheduled tomorrow".to_owned(),
            range: "Jobs!A2:E".to_owned(),
            columns: job_columns.clone(),
            filter: RowFilter::OnDate { column: 2, offset_days: 1 },
        },
        Dataset {
            category: "jobs_past_due".to_owned(),
            title: "Jobs past due".to_owned(),
            range: "Jobs!A2:E".to_owned(),
            columns: job_columns,
            filter: RowFilter::BeforeDate { column: 2 },
        },
        Dataset {
            category: "trade_assignments".to_owned(),
            title: "Trade assignments".to_owned(),
            range: "Trades!A2:D".to_owned(),
            columns: vec![
                "Job".to_owned(),
                "Phase".to_owned(),
                "Trade".to_owned(),
                "Start".to_owned(),
            ],
            filter: RowFilter::All,
        },
        Dataset {
            category: "purchase_orders".to_owned(),
            title: "Approved purchase orders".to_owned(),
            range: "PurchaseOrders!A2:E".to_owned(),
            columns: vec![
                "PO".to_owned(),
                "Job".to_owned(),
                "Vendor".to_owned(),
                "Status".to_owned(),
                "Amount".to_owned(),
            ],
            filter: RowFilter::Keyword { column: 3, keyword: "approved".to_owned() },
        },
    ]
}

/// Turns a resolution into the reply text, fetching rows for categories.
pub struct Answerer {
    source: Arc<dyn RowSource>,
    datasets: Vec<Dataset>,
}

impl Answerer {
    pub fn new(source: Arc<dyn RowSource>, datasets: Vec<Dataset>) -> Self {
        Self { source, datasets }
    }

    pub fn dataset(&self, category: &str) -> Option<&Dataset> {
        self.datasets.iter().find(|dataset| dataset.category.eq_ignore_ascii_case(category))
    }

    pub async fn answer(
        &self,
        resolution: &Resolution,
        today: NaiveDate,
    ) -> Result<Reply, ApplicationError> {
        match resolution {
            Resolution::NoMatch => Ok(Reply::no_match()),
            Resolution::Document { title, summary, .. } => {
                let body = if summary.trim().is_empty() {
                    "No summary has been written for this SOP yet.".to_owned()
                } else {
                    summary.clone()
                };
                Ok(Reply::new(title.clone(), body))
            }
            Resolution::Category { label, .. } => {
                let Some(dataset) = self.dataset(label) else {
                    return Ok(Reply::new(
                        label.clone(),
                        format!("No data source is configured for `{label}` yet."),
                    ));
                };

                let rows = self.source.fetch_rows(&dataset.range).await?;
                let matching = dataset.filter.apply(rows, today);
                Ok(Reply::new(label.clone(), render_rows(dataset, &matching)))
            }
        }
    }
}

pub fn render_rows(dataset: &Dataset, rows: &[Row]) -> String {
    if rows.is_empty() {
        return format!("*{}*\nNothing found right now.", dataset.title);
    }

    let mut lines = vec![format!("*{}* ({})", dataset.title, rows.len())];
    lines.extend(rows.iter().take(MAX_LISTED_ROWS).map(|row| render_row(&dataset.columns, row)));
    if rows.len() > MAX_LISTED_ROWS {
        lines.push(format!("…and {} more", rows.len() - MAX_LISTED_ROWS));
    }
    lines.join("\n")
}

fn render_row(columns: &[String], row: &Row) -> String {
    let cells: Vec<String> = row
        .iter()
        .enumerate()
        .filter(|(_, cell)| !cell.trim().is_empty())
        .map(|(index, cell)| match columns.get(index).filter(|header| !header.is_empty()) {
            Some(header) if index > 0 => format!("{header}: {}", cell.trim()),
            _ => cell.trim().to_owned(),
        })
        .collect();
    format!("• {}", cells.join(" · "))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use super::{default_datasets, render_rows, Answerer, Dataset, Reply, MAX_LISTED_ROWS};
    use crate::errors::ApplicationError;
    use crate::intent::Resolution;
    use crate::rows::{InMemoryRowSource, RowFilter};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).expect("date")
    }

    fn category(label: &str) -> Resolution {
        Resolution::Category { label: label.to_owned(), score: 1.0, strategy: "fuzzy" }
    }

    fn jobs_source() -> Arc<InMemoryRowSource> {
        Arc::new(InMemoryRowSource::new().with_range(
            "Jobs!A2:E",
            vec![
                vec!["J-100".into(), "12 Oak St".into(), "2026-10-16".into(), "Framing".into()],
                vec!["J-101".into(), "4 Elm St".into(), "2026-10-14".into(), "Drywall".into()],
                vec!["J-102".into(), "9 Ash St".into(), "10/17/2026".into(), "Roofing".into()],
            ],
        ))
    }

    #[tokio::test]
    async fn category_reply_lists_filtered_rows() {
        let answerer = Answerer::new(jobs_source(), default_datasets());

        let reply = answerer.answer(&category("jobs_today"), today()).await.expect("reply");

        assert_eq!(reply.category_or_title, "jobs_today");
        assert_eq!(
            reply.body,
            "*Jobs scheduled today* (1)\n• J-100 · Address: 12 Oak St · Date: 2026-10-16 · Phase: Framing"
        );
    }

    #[tokio::test]
    async fn past_due_and_tomorrow_use_their_own_filters() {
        let answerer = Answerer::new(jobs_source(), default_datasets());

        let past_due = answerer.answer(&category("jobs_past_due"), today()).await.expect("reply");
        let tomorrow = answerer.answer(&category("jobs_tomorrow"), today()).await.expect("reply");

        assert!(past_due.body.contains("J-101"));
        assert!(!past_due.body.contains("J-100"));
        assert!(tomorrow.body.contains("J-102"));
    }

    #[tokio::test]
    async fn missing_range_surfaces_as_data_unavailable() {
        let answerer = Answerer::new(Arc::new(InMemoryRowSource::new()), default_datasets());

        let error =
            answerer.answer(&category("purchase_orders"), today()).await.expect_err("failure");

        assert!(matches!(error, ApplicationError::DataUnavailable(_)));
    }

    #[tokio::test]
    async fn documents_and_no_match_do_not_touch_the_source() {
        let answerer = Answerer::new(Arc::new(InMemoryRowSource::new()), Vec::new());

        let document = Resolution::Document {
            title: "Warranty Trigger SOP".to_owned(),
            summary: "Open the warranty period.".to_owned(),
            score: 1.0,
            strategy: "fuzzy",
        };

        assert_eq!(
            answerer.answer(&document, today()).await,
            Ok(Reply::new("Warranty Trigger SOP", "Open the warranty period."))
        );
        assert_eq!(answerer.answer(&Resolution::NoMatch, today()).await, Ok(Reply::no_match()));
        assert!(answerer
            .answer(&category("jobs_today"), today())
            .await
            .expect("reply")
            .body
            .contains("No data source"));
    }

    #[test]
    fn long_listings_are_truncated() {
        let dataset = Dataset {
            category: "trade_assignments".to_owned(),
            title: "Trade assignments".to_owned(),
            range: "Trades!A2:D".to_owned(),
            columns: Vec::new(),
            filter: RowFilter::All,
        };
        let rows: Vec<Vec<String>> =
            (0..MAX_LISTED_ROWS + 3).map(|index| vec![format!("row-{index}")]).collect();

        let body = render_rows(&dataset, &rows);

        assert!(body.starts_with("*Trade assignments* (18)"));
        assert!(body.ends_with("…and 3 more"));
        assert_eq!(body.lines().count(), MAX_LISTED_ROWS + 2);
    }

    #[test]
    fn empty_listing_says_nothing_found() {
        let dataset = default_datasets().remove(0);
        assert_eq!(render_rows(&dataset, &[]), "*Jobs scheduled today*\nNothing found right now.");
    }
}
