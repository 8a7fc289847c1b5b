//! Latest assistant text, as seen by the completion evaluator.
//!
//! Message content arrives from the host in one of two shapes: a plain string,
//! or an array of typed segments (text mixed with tool invocations). Anything
//! else is treated as empty text rather than an error.

use serde_json::Value;

const ASSISTANT_ROLE: &str = "assistant";

/// Host message content, reduced to what the tracker needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    /// A single block of text.
    Text(String),
    /// Text segments of a mixed message, in emission order.
    Parts(Vec<String>),
    /// Content of an unexpected shape.
    Unrecognized,
}

impl MessageContent {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(text) => MessageContent::Text(text.clone()),
            Value::Array(parts) => MessageContent::Parts(
                parts
                    .iter()
                    .filter(|part| part.get("type").and_then(Value::as_str) == Some("text"))
                    .filter_map(|part| part.get("text").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect(),
            ),
            _ => MessageContent::Unrecognized,
        }
    }

    /// Flatten to a single string; text segments are joined with newlines.
    pub fn text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts.join("\n"),
            MessageContent::Unrecognized => String::new(),
        }
    }
}

/// Holds the text of the most recent assistant message.
///
/// Each observed assistant message replaces the previous value; nothing is
/// accumulated across turns.
#[derive(Debug, Clone, Default)]
pub struct OutputTracker {
    last_output: String,
}

impl OutputTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `content` if it was authored by the assistant. Returns whether it was recorded.
    pub fn observe(&mut self, role: &str, content: &Value) -> bool {
        if role != ASSISTANT_ROLE {
            return false;
        }
        self.last_output = MessageContent::from_value(content).text();
        true
    }

    pub fn last_output(&self) -> &str {
        &self.last_output
    }
}
