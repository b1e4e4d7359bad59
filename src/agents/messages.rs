// src/agents/messages.rs
// Thread message model and assistant reply extraction

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// A message as returned by the thread listing call.
///
/// Upstream has shipped several layouts for the message body over time.
/// They are sorted out once, when the JSON is converted, into `bodies`
/// (candidate forms in the order they should be tried).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub struct ThreadMessage {
    pub role: Option<String>,
    pub bodies: Vec<MessageBody>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    /// `content: [{"type": "text", "text": {"value": ...}}, ...]`
    TextBlocks(Vec<ContentBlock>),
    /// `content: "..."`
    PlainText(String),
    /// `text_messages: [...]` (older SDKs)
    LegacyList(Vec<LegacyText>),
    /// `text: ...` (older SDKs)
    LegacyScalar(Value),
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    /// A `type == "text"` block carrying a `value` key. `None` when that
    /// value is null, which ends the scan with no text.
    Text(Option<String>),
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LegacyText {
    Value(String),
    NestedValue(String),
    Bare(Value),
    Empty,
}

impl ThreadMessage {
    pub fn new(role: impl Into<String>, bodies: Vec<MessageBody>) -> Self {
        Self {
            role: Some(role.into()),
            bodies,
        }
    }

    pub fn is_assistant(&self) -> bool {
        self.role.as_deref() == Some("assistant")
    }

    /// Text of the first body form that applies, trying each in order.
    pub fn text(&self) -> Option<String> {
        self.bodies.iter().find_map(MessageBody::resolve).flatten()
    }
}

impl From<Value> for ThreadMessage {
    fn from(value: Value) -> Self {
        let Value::Object(mut map) = value else {
            return Self::default();
        };

        let role = map
            .get("role")
            .and_then(Value::as_str)
            .map(str::to_string);

        let mut bodies = Vec::new();

        match map.remove("content") {
            Some(Value::Array(items)) => {
                bodies.push(MessageBody::TextBlocks(
                    items.iter().map(ContentBlock::from_value).collect(),
                ));
            }
            Some(Value::String(s)) => bodies.push(MessageBody::PlainText(s)),
            _ => {}
        }

        if let Some(Value::Array(items)) = map.remove("text_messages") {
            if !items.is_empty() {
                bodies.push(MessageBody::LegacyList(
                    items.iter().map(LegacyText::from_value).collect(),
                ));
            }
        }

        if let Some(text) = map.remove("text") {
            if is_truthy(&text) {
                bodies.push(MessageBody::LegacyScalar(text));
            }
        }

        if bodies.is_empty() {
            bodies.push(MessageBody::Empty);
        }

        Self { role, bodies }
    }
}

impl MessageBody {
    pub fn text(&self) -> Option<String> {
        self.resolve().flatten()
    }

    /// `None` when this form does not apply and the next one should be
    /// tried, `Some(text)` once the form has settled the answer.
    fn resolve(&self) -> Option<Option<String>> {
        match self {
            // First qualifying block only.
            MessageBody::TextBlocks(blocks) => blocks.iter().find_map(|b| match b {
                ContentBlock::Text(value) => Some(value.clone()),
                ContentBlock::Other => None,
            }),
            MessageBody::PlainText(s) => Some(Some(s.clone())),
            // Last element only, unlike TextBlocks.
            MessageBody::LegacyList(items) => items.last().and_then(LegacyText::text).map(Some),
            MessageBody::LegacyScalar(value) => match value.get("value") {
                Some(Value::Null) => Some(None),
                Some(inner) => Some(Some(stringify(inner))),
                None => Some(Some(stringify(value))),
            },
            MessageBody::Empty => None,
        }
    }
}

impl ContentBlock {
    fn from_value(value: &Value) -> Self {
        if value.get("type").and_then(Value::as_str) != Some("text") {
            return ContentBlock::Other;
        }
        match value.get("text").and_then(|t| t.get("value")) {
            None => ContentBlock::Other,
            Some(Value::Null) => ContentBlock::Text(None),
            Some(inner) => ContentBlock::Text(Some(stringify(inner))),
        }
    }
}

impl LegacyText {
    fn from_value(value: &Value) -> Self {
        if let Some(v) = value.get("value").filter(|v| is_truthy(v)) {
            return LegacyText::Value(stringify(v));
        }
        match value.get("text") {
            Some(text) => match text.get("value") {
                Some(Value::Null) => LegacyText::Empty,
                Some(inner) => LegacyText::NestedValue(stringify(inner)),
                None => LegacyText::Bare(text.clone()),
            },
            None => LegacyText::Empty,
        }
    }

    pub fn text(&self) -> Option<String> {
        match self {
            LegacyText::Value(s) | LegacyText::NestedValue(s) => Some(s.clone()),
            LegacyText::Bare(value) => Some(stringify(value)),
            LegacyText::Empty => None,
        }
    }
}

/// Returns the text of the first assistant message, or `None` when there is
/// no assistant message or nothing in it can be read as text.
///
/// Messages are expected oldest first, as returned by an ascending listing,
/// so in a thread with several turns this is the earliest assistant reply.
pub fn extract_assistant_response<'a, I>(messages: I) -> Option<String>
where
    I: IntoIterator<Item = &'a ThreadMessage>,
{
    let Some(message) = messages.into_iter().find(|m| m.is_assistant()) else {
        warn!("No assistant response found in messages");
        return None;
    };

    debug!("Processing assistant message with {} body form(s)", message.bodies.len());

    match message.text() {
        Some(text) if !text.is_empty() => Some(text),
        _ => {
            warn!("Assistant message carried no readable text");
            None
        }
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// Empty strings, empty containers, null, false and zero count as unset.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
