use foreman_core::answer::Reply;
use serde::Serialize;

/// Slack rejects section text longer than this many characters.
pub const MAX_SECTION_CHARS: usize = 3000;
/// Slack allows 50 blocks per message.
const MAX_REPLY_SECTIONS: usize = 45;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    #[serde(rename = "plain_text")]
    Plain { text: String },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section { block_id: String, text: TextObject },
    Context { block_id: String, elements: Vec<TextObject> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Section { block_id: block_id.into(), text: builder.build() });
        self
    }

    pub fn context<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ContextBuilder),
    {
        let mut builder = ContextBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Context { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { fallback_text: self.fallback_text, blocks: self.blocks }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
}

impl SectionBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> TextObject {
        self.text.unwrap_or_else(|| TextObject::plain(""))
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<TextObject>,
}

impl ContextBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> Vec<TextObject> {
        self.elements
    }
}

pub fn thinking_message() -> MessageTemplate {
    MessageBuilder::new("Thinking about your query...")
        .section("foreman.thinking.v1", |section| {
            section.mrkdwn(":hourglass_flowing_sand: Thinking about your query...");
        })
        .build()
}

/// Long bodies are spread over several sections; `fallback_text` keeps the
/// whole reply.
pub fn reply_message(reply: &Reply) -> MessageTemplate {
    if reply.is_no_match() {
        return no_match_message(&reply.body);
    }

    let text = format!("✅ *{}*\n{}", reply.category_or_title, reply.body);
    let mut builder =
        MessageBuilder::new(format!("{}: {}", reply.category_or_title, reply.body));
    for (index, chunk) in
        split_section_text(&text, MAX_SECTION_CHARS).into_iter().take(MAX_REPLY_SECTIONS).enumerate()
    {
        let block_id = match index {
            0 => "foreman.reply.body.v1".to_owned(),
            n => format!("foreman.reply.body.v1.{}", n + 1),
        };
        builder = builder.section(block_id, |section| {
            section.mrkdwn(chunk);
        });
    }
    builder.build()
}

/// Splits on line breaks into chunks of at most `limit` characters. Lines
/// longer than `limit` are cut at character boundaries.
pub fn split_section_text(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    let mut started = false;

    for line in text.split('\n') {
        let chars: Vec<char> = line.chars().collect();
        let mut pieces: Vec<&[char]> = chars.chunks(limit).collect();
        if pieces.is_empty() {
            pieces.push(&chars[..]);
        }

        for piece in pieces {
            if started && current_len + 1 + piece.len() > limit {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
                started = false;
            }
            if started {
                current.push('\n');
                current_len += 1;
            }
            current.extend(piece.iter());
            current_len += piece.len();
            started = true;
        }
    }

    if started {
        chunks.push(current);
    }
    chunks
}

pub fn no_match_message(body: &str) -> MessageTemplate {
    MessageBuilder::new(body)
        .section("foreman.reply.no_match.v1", |section| {
            section.mrkdwn(format!("❌ {body}"));
        })
        .build()
}

pub fn data_unavailable_message(user_message: &str, correlation_id: &str) -> MessageTemplate {
    MessageBuilder::new(format!("{user_message} (ref {correlation_id})"))
        .section("foreman.reply.unavailable.v1", |section| {
            section.mrkdwn(format!(":warning: {user_message}"));
        })
        .context("foreman.reply.reference.v1", |context| {
            context.mrkdwn(format!("Reference: `{correlation_id}`"));
        })
        .build()
}

#[cfg(test)]
mod tests {
    use foreman_core::answer::Reply;
    use serde_json::json;

    use super::{
        data_unavailable_message, reply_message, split_section_text, thinking_message, Block,
        MessageBuilder, TextObject, MAX_SECTION_CHARS,
    };

    #[test]
    fn builder_renders_sections_and_context_in_order() {
        let message = MessageBuilder::new("fallback")
            .section("first.v1", |section| {
                section.plain("hello");
            })
            .context("second.v1", |context| {
                context.mrkdwn("*a*").plain("b");
            })
            .build();

        assert_eq!(message.fallback_text, "fallback");
        assert_eq!(
            message.blocks,
            vec![
                Block::Section { block_id: "first.v1".to_owned(), text: TextObject::plain("hello") },
                Block::Context {
                    block_id: "second.v1".to_owned(),
                    elements: vec![TextObject::mrkdwn("*a*"), TextObject::plain("b")],
                },
            ]
        );
    }

    #[test]
    fn blocks_serialize_to_block_kit_shape() {
        let value = serde_json::to_value(&thinking_message().blocks).expect("blocks");

        assert_eq!(
            value,
            json!([{
                "type": "section",
                "block_id": "foreman.thinking.v1",
                "text": { "type": "mrkdwn", "text": ":hourglass_flowing_sand: Thinking about your query..." }
            }])
        );
        assert_eq!(
            serde_json::to_value(TextObject::plain("x")).expect("text"),
            json!({ "type": "plain_text", "text": "x" })
        );
    }

    #[test]
    fn document_replies_lead_with_the_title() {
        let message =
            reply_message(&Reply::new("Warranty Trigger SOP", "Open the warranty period."));

        assert_eq!(message.fallback_text, "Warranty Trigger SOP: Open the warranty period.");
        assert!(matches!(
            &message.blocks[0],
            Block::Section { text: TextObject::Mrkdwn { text }, .. }
                if text == "✅ *Warranty Trigger SOP*\nOpen the warranty period."
        ));
    }

    #[test]
    fn long_listings_are_split_into_sections_under_the_limit() {
        let row = format!("• {}", "Hartley Residence | Roof tear-off | Crew B | ".repeat(6));
        let body = vec![row; 80].join("\n");
        let message = reply_message(&Reply::new("jobs_today", body.clone()));

        let texts: Vec<&str> = message
            .blocks
            .iter()
            .filter_map(|block| match block {
                Block::Section { text: TextObject::Mrkdwn { text }, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert!(texts.len() > 1);
        assert!(texts.iter().all(|text| text.chars().count() <= MAX_SECTION_CHARS));
        assert!(texts[0].starts_with("✅ *jobs_today*\n"));
        assert_eq!(texts.join("\n"), format!("✅ *jobs_today*\n{body}"));
        assert_eq!(message.fallback_text, format!("jobs_today: {body}"));

        let ids: Vec<&str> = message
            .blocks
            .iter()
            .map(|block| match block {
                Block::Section { block_id, .. } | Block::Context { block_id, .. } => {
                    block_id.as_str()
                }
            })
            .collect();
        assert_eq!(ids[0], "foreman.reply.body.v1");
        assert_eq!(ids[1], "foreman.reply.body.v1.2");
    }

    #[test]
    fn oversized_lines_are_cut_at_character_boundaries() {
        let line = "é".repeat(7_000);
        let chunks = split_section_text(&format!("head\n{line}\n\ntail"), 3_000);

        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 3_000));
        assert_eq!(chunks.concat().chars().filter(|c| *c == 'é').count(), 7_000);
        assert!(chunks.last().is_some_and(|chunk| chunk.ends_with("\n\ntail")));
        assert_eq!(split_section_text("short\nreply", 3_000), vec!["short\nreply".to_owned()]);
    }

    #[test]
    fn no_match_replies_use_their_own_block() {
        let message = reply_message(&Reply::no_match());

        assert!(message.fallback_text.starts_with("No matching SOP or query found"));
        assert!(matches!(
            &message.blocks[0],
            Block::Section { block_id, .. } if block_id == "foreman.reply.no_match.v1"
        ));
    }

    #[test]
    fn unavailable_message_carries_the_reference() {
        let message = data_unavailable_message("Could not fetch data.", "req-42");

        assert!(message.fallback_text.contains("req-42"));
        assert!(message.blocks.iter().any(|block| matches!(
            block,
            Block::Context { elements, .. }
                if elements == &vec![TextObject::mrkdwn("Reference: `req-42`")]
        )));
    }
}
