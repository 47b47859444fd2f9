use std::sync::Arc;

use axum::{
    body::Bytes, extract::State, http::StatusCode, response::IntoResponse, routing::post, Json,
    Router,
};
use foreman_slack::{parse_envelope, IngressEvent};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::service::QueryService;

#[derive(Clone)]
pub struct IngressState {
    pub service: Arc<QueryService>,
}

pub fn router(state: IngressState) -> Router {
    Router::new().route("/slack/events", post(slack_events)).with_state(state)
}

/// Acknowledges immediately; resolution and the reply run on a spawned task.
pub async fn slack_events(State(state): State<IngressState>, body: Bytes) -> impl IntoResponse {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(error) => {
            warn!(event_name = "ingress.rejected", error = %error, "request body is not JSON");
            return bad_request(format!("invalid JSON body: {error}"));
        }
    };

    match parse_envelope(&payload) {
        Ok(IngressEvent::UrlVerification { challenge }) => {
            info!(event_name = "ingress.url_verification", "answering url verification");
            (StatusCode::OK, Json(json!({ "challenge": challenge })))
        }
        Ok(IngressEvent::Ignored { reason }) => {
            debug!(event_name = "ingress.ignored", reason, "ignoring event");
            (StatusCode::OK, Json(json!({ "ok": true, "ignored": reason })))
        }
        Ok(IngressEvent::Query(request)) => {
            let correlation_id = Uuid::new_v4().to_string();
            info!(
                event_name = "ingress.accepted",
                correlation_id = %correlation_id,
                "query accepted"
            );

            let service = state.service.clone();
            let task_correlation_id = correlation_id.clone();
            tokio::spawn(async move {
                service.handle(request, &task_correlation_id).await;
            });

            (StatusCode::OK, Json(json!({ "ok": true, "correlation_id": correlation_id })))
        }
        Err(error) => {
            warn!(event_name = "ingress.rejected", error = %error, "malformed event payload");
            bad_request(error.to_string())
        }
    }
}

fn bad_request(error: String) -> (StatusCode, Json<Value>) {
    (StatusCode::BAD_REQUEST, Json(json!({ "ok": false, "error": error })))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use foreman_core::answer::{default_datasets, Answerer};
    use foreman_slack::{DeliveryError, MessageSink, MessageTemplate, ReplyTarget};
    use serde_json::{json, Value};
    use tokio::sync::Notify;
    use tower::ServiceExt;

    use super::{router, IngressState};
    use crate::service::tests::{jobs_source, router as intent_router, RecordingSink};
    use crate::service::QueryService;

    fn app(sink: Arc<dyn MessageSink>) -> axum::Router {
        let service = QueryService::new(
            intent_router(),
            Answerer::new(jobs_source(), default_datasets()),
            sink,
        );
        router(IngressState { service: Arc::new(service) })
    }

    async fn send(app: axum::Router, body: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::post("/slack/events")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_owned()))
                    .expect("request"),
            )
            .await
            .expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    struct GatedSink {
        gate: Notify,
        inner: RecordingSink,
    }

    #[async_trait]
    impl MessageSink for GatedSink {
        fn name(&self) -> &'static str {
            "gated"
        }

        async fn post(
            &self,
            target: &ReplyTarget,
            message: &MessageTemplate,
        ) -> Result<(), DeliveryError> {
            self.gate.notified().await;
            self.inner.post(target, message).await
        }
    }

    #[tokio::test]
    async fn url_verification_echoes_the_challenge() {
        let (status, body) = send(
            app(Arc::new(RecordingSink::default())),
            r#"{"type":"url_verification","challenge":"abc123"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "challenge": "abc123" }));
    }

    #[tokio::test]
    async fn queries_are_acknowledged_before_the_reply_is_delivered() {
        let sink = Arc::new(GatedSink { gate: Notify::new(), inner: RecordingSink::default() });

        let (status, body) =
            send(app(sink.clone()), r#"{"text":"what jobs are due today","channel":"C1"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], json!(true));
        assert!(body["correlation_id"].as_str().is_some_and(|id| !id.is_empty()));
        assert!(sink.inner.texts().is_empty());

        sink.gate.notify_one();
        for _ in 0..100 {
            if !sink.inner.texts().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(sink.inner.texts()[0].starts_with("✅ *jobs_today*"));
    }

    #[tokio::test]
    async fn bot_echoes_are_ignored_without_a_reply() {
        let sink = Arc::new(RecordingSink::default());
        let payload = json!({
            "type": "event_callback",
            "event": { "type": "message", "bot_id": "B1", "text": "jobs today", "channel": "C1" }
        });

        let (status, body) = send(app(sink.clone()), &payload.to_string()).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ignored"], json!("bot_message"));
        assert!(sink.texts().is_empty());
    }

    #[tokio::test]
    async fn malformed_payloads_get_bad_request() {
        let (not_json, _) = send(app(Arc::new(RecordingSink::default())), "text=jobs").await;
        let (no_text, body) =
            send(app(Arc::new(RecordingSink::default())), r#"{"channel":"C1"}"#).await;

        assert_eq!(not_json, StatusCode::BAD_REQUEST);
        assert_eq!(no_text, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], json!(false));
    }
}
