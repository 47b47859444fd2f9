use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HealthState {
    pub categories: usize,
    pub documents: usize,
    pub remote_classifier: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TableSizes {
    pub categories: usize,
    pub documents: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub tables: TableSizes,
    pub remote_classifier_enabled: bool,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let ready = state.categories > 0 && state.documents > 0;

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "foreman-server runtime initialized".to_string(),
        },
        tables: TableSizes { categories: state.categories, documents: state.documents },
        remote_classifier_enabled: state.remote_classifier,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, Json};

    use crate::health::{health, HealthState};

    #[tokio::test]
    async fn health_reports_table_sizes_and_remote_flag() {
        let state = HealthState { categories: 5, documents: 40, remote_classifier: true };

        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.tables.categories, 5);
        assert_eq!(payload.tables.documents, 40);
        assert!(payload.remote_classifier_enabled);
        assert!(!payload.checked_at.is_empty());
    }

    #[tokio::test]
    async fn empty_tables_report_degraded() {
        let state = HealthState { categories: 5, documents: 0, remote_classifier: false };

        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.service.status, "ready");
    }
}
