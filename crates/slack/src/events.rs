use serde_json::Value;
use thiserror::Error;

/// What an inbound `/slack/events` payload asks the bot to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IngressEvent {
    UrlVerification { challenge: String },
    Query(QueryRequest),
    Ignored { reason: &'static str },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryRequest {
    pub text: String,
    pub channel: Option<String>,
    pub thread_ts: Option<String>,
    pub user: Option<String>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("payload must be a JSON object")]
    NotAnObject,
    #[error("url_verification payload is missing `challenge`")]
    MissingChallenge,
    #[error("event_callback payload is missing the `event` object")]
    MissingEvent,
    #[error("payload carries neither `text` nor `query`")]
    MissingText,
    #[error("unsupported payload type `{0}`")]
    UnsupportedType(String),
}

pub fn parse_envelope(payload: &Value) -> Result<IngressEvent, EnvelopeError> {
    let object = payload.as_object().ok_or(EnvelopeError::NotAnObject)?;

    match object.get("type").and_then(Value::as_str) {
        Some("url_verification") => {
            let challenge =
                string_field(payload, "challenge").ok_or(EnvelopeError::MissingChallenge)?;
            Ok(IngressEvent::UrlVerification { challenge })
        }
        Some("event_callback") => {
            let event = object.get("event").filter(|event| event.is_object());
            parse_callback_event(event.ok_or(EnvelopeError::MissingEvent)?)
        }
        Some(other) => Err(EnvelopeError::UnsupportedType(other.to_owned())),
        None => parse_raw_query(payload),
    }
}

fn parse_callback_event(event: &Value) -> Result<IngressEvent, EnvelopeError> {
    let event_type = event.get("type").and_then(Value::as_str).unwrap_or_default();
    if !matches!(event_type, "app_mention" | "message") {
        return Ok(IngressEvent::Ignored { reason: "unsupported_event" });
    }
    let subtype = event.get("subtype").and_then(Value::as_str);
    if event.get("bot_id").is_some() || subtype == Some("bot_message") {
        return Ok(IngressEvent::Ignored { reason: "bot_message" });
    }
    if subtype.is_some() {
        return Ok(IngressEvent::Ignored { reason: "message_subtype" });
    }

    let raw_text = string_field(event, "text").unwrap_or_default();
    // Outside DMs a mention also arrives as `app_mention`; answer that one only.
    let is_direct = event.get("channel_type").and_then(Value::as_str) == Some("im");
    if event_type == "message" && !is_direct && raw_text.trim_start().starts_with("<@") {
        return Ok(IngressEvent::Ignored { reason: "duplicate_mention" });
    }

    let text = strip_leading_mentions(&raw_text);
    if text.is_empty() {
        return Ok(IngressEvent::Ignored { reason: "empty_text" });
    }

    let thread_ts = match event_type {
        "app_mention" => string_field(event, "thread_ts").or_else(|| string_field(event, "ts")),
        _ => string_field(event, "thread_ts"),
    };

    Ok(IngressEvent::Query(QueryRequest {
        text,
        channel: string_field(event, "channel"),
        thread_ts,
        user: string_field(event, "user"),
    }))
}

fn parse_raw_query(payload: &Value) -> Result<IngressEvent, EnvelopeError> {
    let text = string_field(payload, "text")
        .or_else(|| string_field(payload, "query"))
        .ok_or(EnvelopeError::MissingText)?;

    Ok(IngressEvent::Query(QueryRequest {
        text,
        channel: string_field(payload, "channel").filter(|channel| !channel.trim().is_empty()),
        thread_ts: string_field(payload, "thread_ts"),
        user: string_field(payload, "user"),
    }))
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_owned)
}

/// Removes `<@U123>` / `<@U123|name>` mentions from the start of a message.
pub fn strip_leading_mentions(text: &str) -> String {
    let mut rest = text.trim_start();
    while let Some(after) = rest.strip_prefix("<@") {
        match after.find('>') {
            Some(end) => rest = after[end + 1..].trim_start(),
            None => break,
        }
    }
    rest.trim().to_owned()
}
