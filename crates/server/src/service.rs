use std::sync::Arc;

use chrono::{Local, NaiveDate};
use foreman_core::answer::{Answerer, Reply};
use foreman_core::audit::QueryLogRecord;
use foreman_core::errors::ApplicationError;
use foreman_core::intent::{IntentRouter, Resolution};
use foreman_core::rows::RowSink;
use foreman_slack::blocks::{data_unavailable_message, reply_message, thinking_message};
use foreman_slack::{MessageSink, MessageTemplate, QueryRequest, ReplyTarget};
use tracing::{info, warn};

pub struct QueryLog {
    pub sink: Arc<dyn RowSink>,
    pub range: String,
}

/// Resolve → answer → reply pipeline for one query.
pub struct QueryService {
    router: Arc<IntentRouter>,
    answerer: Answerer,
    messages: Arc<dyn MessageSink>,
    query_log: Option<QueryLog>,
    thinking_message: bool,
    default_channel: Option<String>,
}

impl QueryService {
    pub fn new(
        router: Arc<IntentRouter>,
        answerer: Answerer,
        messages: Arc<dyn MessageSink>,
    ) -> Self {
        Self {
            router,
            answerer,
            messages,
            query_log: None,
            thinking_message: false,
            default_channel: None,
        }
    }

    pub fn with_query_log(mut self, query_log: Option<QueryLog>) -> Self {
        self.query_log = query_log;
        self
    }

    pub fn with_thinking_message(mut self, enabled: bool) -> Self {
        self.thinking_message = enabled;
        self
    }

    pub fn with_default_channel(mut self, channel: Option<String>) -> Self {
        self.default_channel = channel;
        self
    }

    pub fn router(&self) -> &IntentRouter {
        &self.router
    }

    pub async fn handle(&self, request: QueryRequest, correlation_id: &str) -> Reply {
        self.handle_on(request, correlation_id, Local::now().date_naive()).await
    }

    pub async fn handle_on(
        &self,
        request: QueryRequest,
        correlation_id: &str,
        today: NaiveDate,
    ) -> Reply {
        let target = ReplyTarget {
            channel: request.channel.clone().or_else(|| self.default_channel.clone()),
            thread_ts: request.thread_ts.clone(),
        };
        info!(
            event_name = "query.received",
            correlation_id,
            channel = target.channel.as_deref().unwrap_or("unknown"),
            "handling query"
        );

        if self.thinking_message {
            self.deliver(&target, &thinking_message(), correlation_id).await;
        }

        let resolution = self.router.route(&request.text).await;
        info!(
            event_name = "query.resolved",
            correlation_id,
            outcome = resolution.label(),
            strategy = resolution.strategy().unwrap_or("none"),
            "query resolved"
        );

        let reply = match self.answerer.answer(&resolution, today).await {
            Ok(reply) => {
                self.deliver(&target, &reply_message(&reply), correlation_id).await;
                reply
            }
            Err(error) => {
                warn!(
                    event_name = "query.answer.failed",
                    correlation_id,
                    error_class = error.error_class(),
                    error = %error,
                    "could not answer query"
                );
                let message = data_unavailable_message(error.user_message(), correlation_id);
                self.deliver(&target, &message, correlation_id).await;
                Reply::new(error.error_class(), error.user_message())
            }
        };

        self.log_query(&request, &target, &resolution, correlation_id).await;
        reply
    }

    async fn deliver(&self, target: &ReplyTarget, message: &MessageTemplate, correlation_id: &str) {
        if let Err(error) = self.messages.post(target, message).await {
            let error = ApplicationError::Delivery(error.to_string());
            warn!(
                event_name = "query.delivery.failed",
                correlation_id,
                sink = self.messages.name(),
                error_class = error.error_class(),
                error = %error,
                "reply could not be delivered"
            );
        }
    }

    async fn log_query(
        &self,
        request: &QueryRequest,
        target: &ReplyTarget,
        resolution: &Resolution,
        correlation_id: &str,
    ) {
        let Some(query_log) = &self.query_log else {
            return;
        };

        let record = QueryLogRecord::new(
            correlation_id,
            target.channel.clone().unwrap_or_default(),
            request.text.clone(),
            resolution,
        );
        if let Err(error) = query_log.sink.append_row(&query_log.range, record.to_row()).await {
            warn!(
                event_name = "query.log.failed",
                correlation_id,
                range = %query_log.range,
                error = %error,
                "query log row was not appended"
            );
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use foreman_core::answer::{default_datasets, Answerer};
    use foreman_core::intent::{
        default_category_table, default_document_table, IntentResolver, IntentRouter,
        CATEGORY_THRESHOLD, DOCUMENT_THRESHOLD,
    };
    use foreman_core::rows::InMemoryRowSource;
    use foreman_slack::blocks::{Block, TextObject};
    use foreman_slack::{DeliveryError, MessageSink, MessageTemplate, QueryRequest, ReplyTarget};

    use super::{QueryLog, QueryService};

    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub(crate) posted: Mutex<Vec<(ReplyTarget, MessageTemplate)>>,
        pub(crate) fail: bool,
    }

    impl RecordingSink {
        pub(crate) fn texts(&self) -> Vec<String> {
            self.posted
                .lock()
                .map(|posted| {
                    posted
                        .iter()
                        .flat_map(|(_, message)| message.blocks.iter())
                        .filter_map(|block| match block {
                            Block::Section { text: TextObject::Mrkdwn { text }, .. } => {
                                Some(text.clone())
                            }
                            _ => None,
                        })
                        .collect()
                })
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl MessageSink for RecordingSink {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn post(
            &self,
            target: &ReplyTarget,
            message: &MessageTemplate,
        ) -> Result<(), DeliveryError> {
            if let Ok(mut posted) = self.posted.lock() {
                posted.push((target.clone(), message.clone()));
            }
            if self.fail {
                return Err(DeliveryError::Api("channel_not_found".to_owned()));
            }
            Ok(())
        }
    }

    pub(crate) fn router() -> Arc<IntentRouter> {
        Arc::new(IntentRouter::new(
            IntentResolver::fuzzy(Arc::new(default_category_table()), CATEGORY_THRESHOLD),
            IntentResolver::fuzzy(Arc::new(default_document_table()), DOCUMENT_THRESHOLD),
        ))
    }

    pub(crate) fn jobs_source() -> Arc<InMemoryRowSource> {
        Arc::new(InMemoryRowSource::new().with_range(
            "Jobs!A2:E",
            vec![
                vec!["J-100".into(), "12 Oak St".into(), "2026-10-16".into(), "Framing".into()],
                vec!["J-101".into(), "4 Elm St".into(), "2026-10-20".into(), "Drywall".into()],
            ],
        ))
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).expect("date")
    }

    fn request(text: &str, channel: Option<&str>) -> QueryRequest {
        QueryRequest {
            text: text.to_owned(),
            channel: channel.map(str::to_owned),
            ..QueryRequest::default()
        }
    }

    #[tokio::test]
    async fn category_queries_post_thinking_then_the_listing() {
        let sink = Arc::new(RecordingSink::default());
        let service =
            QueryService::new(router(), Answerer::new(jobs_source(), default_datasets()), sink.clone())
                .with_thinking_message(true);

        let reply =
            service.handle_on(request("what jobs are due today", Some("C1")), "req-1", today()).await;

        assert_eq!(reply.category_or_title, "jobs_today");
        assert!(reply.body.contains("J-100"));
        assert!(!reply.body.contains("J-101"));
        let texts = sink.texts();
        assert_eq!(texts.len(), 2);
        assert!(texts[0].contains("Thinking"));
        assert!(texts[1].starts_with("✅ *jobs_today*"));
    }

    #[tokio::test]
    async fn replies_fall_back_to_the_default_channel_and_keep_threads() {
        let sink = Arc::new(RecordingSink::default());
        let service =
            QueryService::new(router(), Answerer::new(jobs_source(), Vec::new()), sink.clone())
                .with_default_channel(Some("C-ops".to_owned()));
        let mut threaded = request("warranty job complete", None);
        threaded.thread_ts = Some("1700.5".to_owned());

        let reply = service.handle_on(threaded, "req-2", today()).await;

        assert_eq!(reply.category_or_title, "Warranty Trigger SOP");
        let posted = sink.posted.lock().expect("lock");
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].0, ReplyTarget::channel("C-ops").in_thread("1700.5"));
    }

    #[tokio::test]
    async fn data_failures_post_a_generic_message_with_the_correlation_id() {
        let sink = Arc::new(RecordingSink::default());
        let service = QueryService::new(
            router(),
            Answerer::new(Arc::new(InMemoryRowSource::new()), default_datasets()),
            sink.clone(),
        );

        let reply = service.handle_on(request("jobs today", Some("C1")), "req-3", today()).await;

        assert_eq!(reply.category_or_title, "data_unavailable");
        let posted = sink.posted.lock().expect("lock");
        assert!(posted[0].1.fallback_text.contains("req-3"));
    }

    #[tokio::test]
    async fn delivery_failures_do_not_abort_the_query_log() {
        let sink = Arc::new(RecordingSink { fail: true, ..RecordingSink::default() });
        let log = Arc::new(InMemoryRowSource::new());
        let service = QueryService::new(router(), Answerer::new(jobs_source(), Vec::new()), sink)
            .with_query_log(Some(QueryLog { sink: log.clone(), range: "QueryLog!A:G".to_owned() }));

        let reply = service.handle_on(request("xyzzy plugh", Some("C1")), "req-4", today()).await;

        assert!(reply.is_no_match());
        let rows = log.rows("QueryLog!A:G");
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][1..6], &["req-4", "C1", "xyzzy plugh", "no_match", "none"]);
    }
}
