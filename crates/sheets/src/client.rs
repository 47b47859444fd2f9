use std::time::Duration;

use async_trait::async_trait;
use foreman_core::config::SheetsConfig;
use foreman_core::rows::{Row, RowSink, RowSource, RowSourceError};
use reqwest::{Client, RequestBuilder, Response, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Google Sheets v4 values API client.
///
/// Reads go through `GET values/{range}`; query-log appends go through
/// `POST values/{range}:append` with `USER_ENTERED` input so dates and
/// numbers land typed in the sheet.
#[derive(Clone)]
pub struct SheetsClient {
    http: Client,
    base_url: Url,
    spreadsheet_id: String,
    api_key: Option<SecretString>,
    access_token: Option<SecretString>,
}

impl std::fmt::Debug for SheetsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsClient")
            .field("base_url", &self.base_url.as_str())
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("access_token", &self.access_token.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl SheetsClient {
    pub fn from_config(config: &SheetsConfig) -> Result<Self, RowSourceError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| RowSourceError::Request(error.to_string()))?;
        let base_url = Url::parse(&config.base_url).map_err(|error| {
            RowSourceError::Request(format!("invalid sheets base url `{}`: {error}", config.base_url))
        })?;

        Ok(Self {
            http,
            base_url,
            spreadsheet_id: config.spreadsheet_id.clone(),
            api_key: config.api_key.clone(),
            access_token: config.access_token.clone(),
        })
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    fn values_url(&self, last_segment: &str) -> Result<Url, RowSourceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                RowSourceError::Request(format!("sheets base url `{}` cannot take a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str(), "values", last_segment]);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = match &self.api_key {
            Some(key) => request.query(&[("key", key.expose_secret())]),
            None => request,
        };
        match &self.access_token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }
}

#[async_trait]
impl RowSource for SheetsClient {
    async fn fetch_rows(&self, range: &str) -> Result<Vec<Row>, RowSourceError> {
        let url = self.values_url(range)?;
        let response = self
            .authorize(self.http.get(url))
            .send()
            .await
            .map_err(|error| RowSourceError::Request(error.to_string()))?;
        let response = ensure_success(response, range).await?;

        let payload: ValueRange =
            response.json().await.map_err(|error| RowSourceError::Decode(error.to_string()))?;
        let rows = decode_rows(payload);
        debug!(event_name = "sheets.values.fetched", range, rows = rows.len(), "fetched sheet rows");
        Ok(rows)
    }
}

#[async_trait]
impl RowSink for SheetsClient {
    async fn append_row(&self, range: &str, row: Row) -> Result<(), RowSourceError> {
        let url = self.values_url(&format!("{range}:append"))?;
        let request = self
            .http
            .post(url)
            .query(&[("valueInputOption", "USER_ENTERED"), ("insertDataOption", "INSERT_ROWS")])
            .json(&json!({ "values": [row] }));
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|error| RowSourceError::Request(error.to_string()))?;
        ensure_success(response, range).await?;

        debug!(event_name = "sheets.values.appended", range, "appended sheet row");
        Ok(())
    }
}

async fn ensure_success(response: Response, range: &str) -> Result<Response, RowSourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body);
    warn!(
        event_name = "sheets.request.failed",
        range,
        status = status.as_u16(),
        error = %message,
        "sheets API returned an error"
    );
    Err(RowSourceError::Status { status: status.as_u16(), message })
}

/// Pulls `error.message` out of a Google API error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|payload| {
            payload.pointer("/error/message").and_then(Value::as_str).map(str::to_owned)
        })
        .unwrap_or_else(|| body.trim().to_owned())
}

fn decode_rows(payload: ValueRange) -> Vec<Row> {
    payload.values.into_iter().map(|row| row.iter().map(cell_text).collect()).collect()
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::extract::{Path, Query, State};
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use foreman_core::config::AppConfig;
    use foreman_core::rows::{RowSink, RowSource, RowSourceError};
    use serde_json::{json, Value};

    use super::{decode_rows, error_message, SheetsClient, ValueRange};

    type Recorded = Arc<Mutex<Vec<(String, HashMap<String, String>, Value)>>>;

    fn client_for(base_url: &str, api_key: Option<&str>) -> SheetsClient {
        let mut config = AppConfig::default().sheets;
        config.spreadsheet_id = "sheet-1".to_owned();
        config.base_url = base_url.to_owned();
        config.api_key = api_key.map(|key| key.to_owned().into());
        SheetsClient::from_config(&config).expect("client")
    }

    async fn values(
        Path((spreadsheet, range)): Path<(String, String)>,
        Query(query): Query<HashMap<String, String>>,
    ) -> (StatusCode, Json<Value>) {
        if query.get("key").map(String::as_str) != Some("test-key") {
            return (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": { "code": 403, "message": "API key not valid" } })),
            );
        }
        if spreadsheet != "sheet-1" || range != "Jobs!A2:E" {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": { "message": format!("Unable to parse range: {range}") } })),
            );
        }
        (
            StatusCode::OK,
            Json(json!({
                "range": "Jobs!A2:E40",
                "majorDimension": "ROWS",
                "values": [["J-100", "12 Oak St", "2026-10-16"], ["J-101", 42, true]]
            })),
        )
    }

    async fn append(
        State(recorded): State<Recorded>,
        Path((_spreadsheet, range)): Path<(String, String)>,
        Query(query): Query<HashMap<String, String>>,
        Json(body): Json<Value>,
    ) -> StatusCode {
        if let Ok(mut recorded) = recorded.lock() {
            recorded.push((range, query, body));
        }
        StatusCode::OK
    }

    async fn spawn_fake_sheets() -> (String, Recorded) {
        let recorded: Recorded = Arc::default();
        let app = Router::new()
            .route("/v4/spreadsheets/{spreadsheet}/values/{range}", get(values).post(append))
            .with_state(recorded.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (format!("http://{address}"), recorded)
    }

    #[test]
    fn values_url_encodes_range_as_one_segment() {
        let client = client_for("https://sheets.googleapis.com/", None);

        let url = client.values_url("Open Jobs!A2:E").expect("url");

        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/sheet-1/values/Open%20Jobs!A2:E"
        );
    }

    #[test]
    fn cells_decode_to_display_text() {
        let payload: ValueRange = serde_json::from_value(json!({
            "values": [["PO-7", 1250.5, false, null], []]
        }))
        .expect("payload");

        assert_eq!(
            decode_rows(payload),
            vec![
                vec!["PO-7".to_owned(), "1250.5".to_owned(), "false".to_owned(), String::new()],
                Vec::new(),
            ]
        );
    }

    #[test]
    fn empty_ranges_omit_values() {
        let payload: ValueRange = serde_json::from_value(json!({ "range": "Jobs!A2:E" }))
            .expect("payload");
        assert!(decode_rows(payload).is_empty());
    }

    #[test]
    fn google_error_bodies_yield_their_message() {
        assert_eq!(
            error_message(r#"{"error":{"code":404,"message":"Requested entity was not found."}}"#),
            "Requested entity was not found."
        );
        assert_eq!(error_message("upstream timeout\n"), "upstream timeout");
    }

    #[tokio::test]
    async fn fetch_rows_reads_values_with_api_key() {
        let (base_url, _) = spawn_fake_sheets().await;
        let client = client_for(&base_url, Some("test-key"));

        let rows = client.fetch_rows("Jobs!A2:E").await.expect("rows");

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "J-100");
        assert_eq!(rows[1], vec!["J-101".to_owned(), "42".to_owned(), "true".to_owned()]);
    }

    #[tokio::test]
    async fn fetch_rows_surfaces_status_failures() {
        let (base_url, _) = spawn_fake_sheets().await;
        let client = client_for(&base_url, Some("wrong-key"));

        let error = client.fetch_rows("Jobs!A2:E").await.expect_err("forbidden");

        assert_eq!(
            error,
            RowSourceError::Status { status: 403, message: "API key not valid".to_owned() }
        );
    }

    #[tokio::test]
    async fn append_row_posts_user_entered_values() {
        let (base_url, recorded) = spawn_fake_sheets().await;
        let client = client_for(&base_url, Some("test-key"));

        client
            .append_row("QueryLog!A:G", vec!["2026-10-16T12:00:00Z".to_owned(), "req-1".to_owned()])
            .await
            .expect("append");

        let recorded = recorded.lock().expect("lock");
        let (range, query, body) = &recorded[0];
        assert_eq!(range, "QueryLog!A:G:append");
        assert_eq!(query.get("valueInputOption").map(String::as_str), Some("USER_ENTERED"));
        assert_eq!(query.get("key").map(String::as_str), Some("test-key"));
        assert_eq!(body, &json!({ "values": [["2026-10-16T12:00:00Z", "req-1"]] }));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_request_error() {
        let client = client_for("http://127.0.0.1:9", None);

        let error = client.fetch_rows("Jobs!A2:E").await.expect_err("unreachable");

        assert!(matches!(error, RowSourceError::Request(_)));
    }
}
