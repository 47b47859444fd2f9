//! Slack surface for Foreman.
//!
//! - **Events** (`events`) - parse `/slack/events` payloads: URL
//!   verification, `app_mention`/`message` callbacks, raw `{text, channel}`
//! - **Block Kit** (`blocks`) - reply, no-match and data-unavailable messages
//! - **Sinks** (`sink`) - deliver messages via `chat.postMessage` or an
//!   incoming webhook
//!
//! # Flow
//!
//! ```text
//! POST /slack/events → parse_envelope → QueryService → MessageSink
//!                                            ↓
//!                                  Block Kit reply ← Answerer
//! ```

pub mod blocks;
pub mod events;
pub mod sink;

pub use blocks::{MessageBuilder, MessageTemplate};
pub use events::{parse_envelope, EnvelopeError, IngressEvent, QueryRequest};
pub use sink::{
    sink_from_config, DeliveryError, MessageSink, NoopMessageSink, ReplyTarget, WebApiSink,
    WebhookSink,
};
