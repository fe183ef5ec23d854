//! Decoding of individual stream lines into typed records.
//!
//! Upstream producers don't agree on a payload shape, so each field is
//! looked up along a fixed list of paths tried in priority order. A
//! payload that isn't JSON falls back to plain text.
use serde_json::Value;

pub const DATA_PREFIX: &str = "data: ";
pub const COMMENT_PREFIX: &str = ":";
pub const DONE_SENTINEL: &str = "[DONE]";

/// A complete line classified by its framing.
#[derive(Debug, PartialEq)]
pub enum Line {
    /// Blank line or `:` comment
    Skip,
    /// `data: [DONE]`
    Done,
    /// `data: <json>`
    Record(EventRecord),
    /// `data: <not json>`, appended as-is
    Payload(String),
    /// Anything else, appended followed by a line break
    Text(String),
}

impl Line {
    pub fn parse(raw: &str) -> Self {
        let line = raw.trim();
        if line.is_empty() || line.starts_with(COMMENT_PREFIX) {
            return Line::Skip;
        }

        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            return Line::Text(line.to_string());
        };

        if payload == DONE_SENTINEL {
            return Line::Done;
        }

        match serde_json::from_str::<Value>(payload) {
            Ok(value) => Line::Record(EventRecord::from_value(&value)),
            Err(e) => {
                tracing::debug!("Payload is not JSON ({}), treating as text", e);
                Line::Payload(payload.to_string())
            }
        }
    }
}

/// Event tags the phase machine reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTag {
    MessageDelta,
    MessageCompleted,
    Thinking,
    StepStarted,
    StepDelta,
    StepCompleted,
    RunCompleted,
    Other(String),
}

impl From<&str> for EventTag {
    fn from(tag: &str) -> Self {
        match tag {
            "message.delta" => EventTag::MessageDelta,
            "message.completed" => EventTag::MessageCompleted,
            "thinking" | "planning" | "run.step.thinking" | "run.step.planning" => {
                EventTag::Thinking
            }
            "run.step.started" => EventTag::StepStarted,
            "run.step.delta" => EventTag::StepDelta,
            "run.step.completed" => EventTag::StepCompleted,
            "run.completed" => EventTag::RunCompleted,
            other => EventTag::Other(other.to_string()),
        }
    }
}

// Field paths in lookup priority order
const CHOICE_CONTENT: &[&str] = &["choices", "0", "delta", "content"];
const TOP_CONTENT: &[&str] = &["content"];
const NESTED_CONTENT: &[&[&str]] = &[&["data", "delta", "content"], &["data", "content"]];
const TOOL_NAME: &[&[&str]] = &[&["data", "tool_name"], &["data", "name"], &["tool_name"]];
const THREAD_ID: &[&[&str]] = &[
    &["thread_id"],
    &["data", "thread_id"],
    &["context", "thread_id"],
];

/// The fields of a structured record that matter to the conversation,
/// each resolved from the first path that yields a string.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EventRecord {
    pub tag: Option<EventTag>,
    pub choice_content: Option<String>,
    pub content: Option<String>,
    pub nested_content: Option<String>,
    pub tool_name: Option<String>,
    pub thread_id: Option<String>,
}

impl EventRecord {
    pub fn from_value(value: &Value) -> Self {
        if !value.is_object() {
            return Self::default();
        }
        Self {
            tag: value
                .get("event")
                .and_then(Value::as_str)
                .map(EventTag::from),
            choice_content: lookup(value, CHOICE_CONTENT).and_then(text_of),
            content: lookup(value, TOP_CONTENT).and_then(text_of),
            nested_content: first_of(value, NESTED_CONTENT, text_of),
            tool_name: first_of(value, TOOL_NAME, string_of),
            thread_id: first_of(value, THREAD_ID, non_empty_string_of),
        }
    }

    pub fn has_content(&self) -> bool {
        self.nested_content.is_some() || self.content.is_some()
    }
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |v, key| match v {
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => v.get(key),
    })
}

fn first_of(
    value: &Value,
    paths: &[&[&str]],
    extract: fn(&Value) -> Option<String>,
) -> Option<String> {
    paths
        .iter()
        .find_map(|path| lookup(value, path).and_then(extract))
}

fn string_of(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

fn non_empty_string_of(value: &Value) -> Option<String> {
    value.as_str().filter(|s| !s.is_empty()).map(str::to_string)
}

// Content is either a plain string or a list of `{ "text": ... }` parts
fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(parts) => {
            let text: String = parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect();
            if parts.is_empty() { None } else { Some(text) }
        }
        _ => None,
    }
}
