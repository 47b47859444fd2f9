use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Row = Vec<String>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RowSourceError {
    #[error("row source request failed: {0}")]
    Request(String),
    #[error("row source returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("row source response could not be decoded: {0}")]
    Decode(String),
    #[error("range `{0}` is not available")]
    UnknownRange(String),
}

/// Read-only provider of ordered rows for a named range.
#[async_trait]
pub trait RowSource: Send + Sync {
    async fn fetch_rows(&self, range: &str) -> Result<Vec<Row>, RowSourceError>;
}

#[async_trait]
pub trait RowSink: Send + Sync {
    async fn append_row(&self, range: &str, row: Row) -> Result<(), RowSourceError>;
}

/// Rows held in memory, keyed by range. Used offline and in tests.
#[derive(Debug, Default)]
pub struct InMemoryRowSource {
    ranges: Mutex<HashMap<String, Vec<Row>>>,
}

impl InMemoryRowSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_range(mut self, range: impl Into<String>, rows: Vec<Row>) -> Self {
        if let Ok(ranges) = self.ranges.get_mut() {
            ranges.insert(range.into(), rows);
        }
        self
    }

    pub fn rows(&self, range: &str) -> Vec<Row> {
        self.ranges
            .lock()
            .ok()
            .and_then(|ranges| ranges.get(range).cloned())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RowSource for InMemoryRowSource {
    async fn fetch_rows(&self, range: &str) -> Result<Vec<Row>, RowSourceError> {
        let ranges =
            self.ranges.lock().map_err(|_| RowSourceError::Request("lock poisoned".to_owned()))?;
        ranges.get(range).cloned().ok_or_else(|| RowSourceError::UnknownRange(range.to_owned()))
    }
}

#[async_trait]
impl RowSink for InMemoryRowSource {
    async fn append_row(&self, range: &str, row: Row) -> Result<(), RowSourceError> {
        let mut ranges =
            self.ranges.lock().map_err(|_| RowSourceError::Request("lock poisoned".to_owned()))?;
        ranges.entry(range.to_owned()).or_default().push(row);
        Ok(())
    }
}

/// Largest `offset_days` magnitude accepted from config.
pub const MAX_OFFSET_DAYS: i64 = 366;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowFilter {
    All,
    /// Rows whose date cell falls `offset_days` after today.
    OnDate {
        column: usize,
        #[serde(default)]
        offset_days: i64,
    },
    /// Rows whose date cell is strictly before today.
    BeforeDate { column: usize },
    /// Case-insensitive substring match on one cell.
    Keyword { column: usize, keyword: String },
}

impl RowFilter {
    pub fn apply(&self, rows: Vec<Row>, today: NaiveDate) -> Vec<Row> {
        match self {
            Self::All => rows,
            Self::OnDate { column, offset_days } => Duration::try_days(*offset_days)
                .and_then(|delta| today.checked_add_signed(delta))
                .map(|target| rows_on_date(rows, *column, target))
                .unwrap_or_default(),
            Self::BeforeDate { column } => rows
                .into_iter()
                .filter(|row| cell_date(row, *column).is_some_and(|date| date < today))
                .collect(),
            Self::Keyword { column, keyword } => rows_matching_keyword(rows, *column, keyword),
        }
    }
}

pub fn rows_on_date(rows: Vec<Row>, column: usize, target: NaiveDate) -> Vec<Row> {
    rows.into_iter().filter(|row| cell_date(row, column) == Some(target)).collect()
}

pub fn rows_matching_keyword(rows: Vec<Row>, column: usize, keyword: &str) -> Vec<Row> {
    let keyword = keyword.to_lowercase();
    rows.into_iter()
        .filter(|row| row.get(column).is_some_and(|cell| cell.to_lowercase().contains(&keyword)))
        .collect()
}

fn cell_date(row: &Row, column: usize) -> Option<NaiveDate> {
    row.get(column).and_then(|cell| parse_sheet_date(cell))
}

// Two-digit years must be tried before `%Y`, which accepts short years.
const DATE_FORMATS: [&str; 6] =
    ["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y", "%b %d, %Y", "%B %d, %Y", "%d %b %Y"];

/// Parses the date formats sheet users commonly type. A trailing time
/// component (`2026-10-16 08:00`, `2026-10-16T08:00:00Z`) is ignored.
pub fn parse_sheet_date(cell: &str) -> Option<NaiveDate> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }

    let candidates = [trimmed, trimmed.split(['T', ' ']).next().unwrap_or(trimmed)];
    candidates.iter().find_map(|candidate| {
        DATE_FORMATS.iter().find_map(|format| NaiveDate::parse_from_str(candidate, format).ok())
    })
}
