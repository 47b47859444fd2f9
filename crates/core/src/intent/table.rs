use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use super::normalize::normalize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub phrases: Vec<String>,
}

impl TableEntry {
    pub fn new<I, S>(label: impl Into<String>, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            label: label.into(),
            summary: None,
            phrases: phrases.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("duplicate table label `{0}`")]
    DuplicateLabel(String),
    #[error("table entry has an empty label")]
    EmptyLabel,
    #[error("table entry `{0}` has no usable phrases")]
    NoPhrases(String),
}

/// Ordered label → phrases table. Phrases are stored normalized; entry order
/// is the fuzzy tie-break order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PhraseTable {
    entries: Vec<TableEntry>,
}

impl PhraseTable {
    pub fn new(entries: Vec<TableEntry>) -> Result<Self, TableError> {
        let mut seen = HashSet::new();
        let mut normalized = Vec::with_capacity(entries.len());

        for entry in entries {
            let label = entry.label.trim().to_owned();
            if label.is_empty() {
                return Err(TableError::EmptyLabel);
            }
            if !seen.insert(label.to_lowercase()) {
                return Err(TableError::DuplicateLabel(label));
            }

            let phrases: Vec<String> = entry
                .phrases
                .iter()
                .map(|phrase| normalize(phrase))
                .filter(|phrase| !phrase.is_empty())
                .collect();
            if phrases.is_empty() {
                return Err(TableError::NoPhrases(label));
            }

            let summary = entry.summary.map(|summary| summary.trim().to_owned());
            normalized.push(TableEntry { label, summary, phrases });
        }

        Ok(Self { entries: normalized })
    }

    pub fn entries(&self) -> &[TableEntry] {
        &self.entries
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.label.as_str())
    }

    pub fn find(&self, label: &str) -> Option<&TableEntry> {
        self.entries.iter().find(|entry| entry.label.eq_ignore_ascii_case(label))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds a document table from sheet rows shaped `title, summary, keywords`
    /// where keywords are comma separated. Rows without a title or keywords are
    /// skipped. A repeated title replaces the earlier row in place.
    pub fn from_document_rows(rows: &[Vec<String>]) -> Result<Self, TableError> {
        let mut entries: Vec<TableEntry> = Vec::new();

        for entry in rows.iter().filter_map(|row| document_entry(row)) {
            let title = entry.label.to_lowercase();
            match entries.iter_mut().find(|existing| existing.label.to_lowercase() == title) {
                Some(existing) => {
                    warn!(
                        event_name = "intent.documents.duplicate",
                        title = %entry.label,
                        "duplicate SOP title; keeping the later row"
                    );
                    *existing = entry;
                }
                None => entries.push(entry),
            }
        }

        Self::new(entries)
    }
}

fn document_entry(row: &[String]) -> Option<TableEntry> {
    let title = row.first().map(|value| value.trim()).filter(|t| !t.is_empty())?;
    let summary = row.get(1).map(|value| value.trim()).unwrap_or_default();
    let keywords: Vec<&str> = row
        .get(2)
        .map(|value| value.split(',').map(str::trim).filter(|k| !k.is_empty()).collect())
        .unwrap_or_default();
    if keywords.is_empty() {
        return None;
    }
    Some(TableEntry::new(title, keywords).with_summary(summary))
}

pub fn default_category_table() -> PhraseTable {
    PhraseTable { entries: default_category_entries() }
}

pub fn default_category_entries() -> Vec<TableEntry> {
    vec![
        TableEntry::new(
            "jobs_today",
            ["today", "jobs today", "due today", "scheduled today", "today's schedule"],
        ),
        TableEntry::new(
            "jobs_tomorrow",
            ["tomorrow", "jobs tomorrow", "next day", "tomorrow's schedule"],
        ),
        TableEntry::new(
            "jobs_past_due",
            ["past due", "overdue", "late jobs", "jobs past due", "behind schedule"],
        ),
        TableEntry::new(
            "trade_assignments",
            ["trades", "trade assignments", "assigned trades", "who is assigned", "subcontractors"],
        ),
        TableEntry::new(
            "purchase_orders",
            ["purchase orders", "purchase order", "po status", "approved pos", "open pos"],
        ),
    ]
}

/// SOP catalog used when the SOP sheet cannot be loaded.
pub fn default_document_table() -> PhraseTable {
    let catalog: [(&str, &str, &[&str]); 40] = [
        ("Next-Day Schedule SOP", "Submit tomorrow's job schedule by 3pm for superintendent review.", &["next-day", "schedule", "submission", "daily schedule"]),
        ("Warranty Trigger SOP", "When a job is marked complete, open the warranty period and notify the warranty coordinator.", &["warranty", "job complete", "completion trigger"]),
        ("Trade Assignment SOP", "Assign trades to each job phase and confirm acceptance in the trade sheet.", &["trade", "assignment", "job phase", "assign trades"]),
        ("Daily Log Submission SOP", "Superintendents submit a daily log with progress notes and photos before end of day.", &["daily log", "submission", "progress", "log entry"]),
        ("Job Completion Workflow SOP", "Walk the completion checklist, update job status, and hand off to warranty.", &["job completion", "workflow", "warranty", "status update"]),
        ("Weekly Job Bulletin SOP", "Friday bulletin summarizing job status changes for the week.", &["weekly bulletin", "job status", "updates", "friday report"]),
        ("Compliance Tracking SOP", "Track SOP compliance and raise alerts for missed steps.", &["compliance", "tracking", "alerts", "non-compliance"]),
        ("New Job Scheduled", "Automation that announces newly scheduled jobs.", &["job", "schedule", "automation", "new job"]),
        ("Create New Job in Slack", "Use the Slack job form to initiate a new job record.", &["slack", "job creation", "form", "initiate job"]),
        ("Jobs Past Due Alert", "Daily alert listing jobs past their scheduled completion date.", &["jobs", "past due", "alert", "overdue"]),
        ("Jobs Past Due Completion button", "Mark a past-due job complete directly from the alert message.", &["completion", "past due", "button", "mark complete"]),
        ("Log Completed Jobs", "Record completed jobs in the history sheet for tracking.", &["log", "completed jobs", "tracking", "history"]),
        ("Purchase Orders Approved", "Track approval status of purchase orders before ordering.", &["purchase orders", "approval", "tracking", "po status"]),
        ("Financial Command Center", "Dashboard of budget and financial metrics per job.", &["financial", "dashboard", "metrics", "budget"]),
        ("Financial Command Center - Alerts", "Notifications for financial anomalies and budget overruns.", &["financial", "alerts", "anomalies", "notifications"]),
        ("Weekly Email Report", "Weekly email summarizing job status across all projects.", &["weekly report", "email", "job status", "summary"]),
        ("Daily Job Report", "Daily report of job progress, updates, and open tasks.", &["daily report", "job progress", "updates", "tasks"]),
        ("Canna Care Order Form", "Submit product orders through the Canna Care order form.", &["canna care", "order form", "submission", "product order"]),
        ("Canna Care Amazon Order Form", "Order Canna Care products through Amazon using the dedicated form.", &["amazon", "canna care", "order form", "purchase"]),
        ("Assign Trades 2 weeks ahead", "Schedule trades two weeks before each job phase starts.", &["assign trades", "scheduling", "advance", "job phase"]),
        ("Activate Trades", "Notify trades when a job is ready for them to start.", &["activate trades", "job readiness", "notification"]),
        ("Open House / Marketing Calendar", "Calendar of open houses and marketing events.", &["open house", "marketing", "calendar", "events"]),
        ("Trigger Follow up Tasks", "Automation that creates follow-up tasks from job events.", &["follow-up", "tasks", "automation", "job events"]),
        ("Compliance Dashboard for SOP", "Dashboard of SOP compliance and missed submissions.", &["compliance", "dashboard", "sop", "missed submissions"]),
        ("KayaPush Gap Analysis", "Find missing KayaPush entries and data gaps.", &["kayapush", "gap analysis", "data", "missing entries"]),
        ("Inspection Reminder SOP", "Reminders for upcoming inspections and permitting steps.", &["inspection", "reminder", "permitting", "upcoming inspection"]),
        ("Material Delivery Tracker SOP", "Track material deliveries and flag delays.", &["material", "delivery", "tracking", "delays"]),
        ("Job Site Safety Checklist SOP", "Complete the safety checklist at every job site visit.", &["safety", "checklist", "job site", "compliance"]),
        ("Subcontractor Check-In SOP", "Subcontractors check in on arrival at the job site.", &["subcontractor", "check-in", "job site", "arrival"]),
        ("Weather Delay SOP", "Record weather delays and adjust the job timeline.", &["weather", "delay", "timeline", "adjustment"]),
        ("Permit Status Tracker SOP", "Track permit status, approvals, and expiration dates.", &["permit", "status", "expiration", "approval"]),
        ("Client Communication Log SOP", "Log every client call and message in the communication log.", &["client", "communication", "log", "calls"]),
        ("Invoice & Payment Tracker SOP", "Track invoices, payments, and outstanding balances.", &["invoice", "payment", "tracking", "balance"]),
        ("Change Order Approval SOP", "Route change orders for approval and track modifications.", &["change order", "approval", "tracking", "modification"]),
        ("Document Upload SOP", "Upload plans and documents to Buildertrend.", &["document", "upload", "buildertrend", "plans"]),
        ("Timeline Forecasting SOP", "Forecast completion dates from current progress.", &["timeline", "forecasting", "progress", "completion"]),
        ("Budget Variance Alert SOP", "Alert when job cost variance exceeds budget tolerance.", &["budget", "variance", "alert", "cost"]),
        ("Phase Completion Tracker SOP", "Track completion of each job phase through the workflow.", &["phase", "completion", "workflow", "job phase"]),
        ("Team Performance Dashboard SOP", "Dashboard of team performance metrics.", &["performance", "dashboard", "metrics", "team"]),
        ("Job Risk Assessment SOP", "Assess delay and budget risk for each active job.", &["risk", "assessment", "delay", "budget"]),
    ];

    PhraseTable {
        entries: catalog
            .iter()
            .map(|(title, summary, keywords)| {
                TableEntry::new(*title, keywords.iter().copied()).with_summary(*summary)
            })
            .collect(),
    }
}
