//! Activity phase state machine.
//!
//! Each record carries at most one event tag, so at most one row of the
//! transition table can match. Rows are checked in table order anyway.
use serde::Serialize;

use super::event::{EventRecord, EventTag};

#[derive(Clone, Copy, Serialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    #[default]
    Idle,
    Thinking,
    ToolCall,
    Streaming,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Move to `Thinking` or `Streaming`, keeping the tool name
    Enter(Phase),
    /// Move to `ToolCall` and record the tool
    ToolCall(String),
    /// Back to `Idle` with the tool name cleared
    Finish,
}

/// The transition table keyed by event tag.
pub fn transition(record: &EventRecord) -> Option<Transition> {
    let tag = record.tag.as_ref()?;
    match tag {
        EventTag::MessageDelta if record.nested_content.is_some() => {
            Some(Transition::Enter(Phase::Streaming))
        }
        EventTag::Thinking => Some(Transition::Enter(Phase::Thinking)),
        EventTag::StepStarted => record.tool_name.clone().map(Transition::ToolCall),
        EventTag::StepCompleted | EventTag::StepDelta if record.has_content() => {
            Some(Transition::Enter(Phase::Streaming))
        }
        EventTag::MessageCompleted | EventTag::RunCompleted => Some(Transition::Finish),
        _ => None,
    }
}

/// Phase plus the tool being called, if any.
#[derive(Clone, Serialize, Debug, Default, PartialEq, Eq)]
pub struct Activity {
    pub phase: Phase,
    pub tool_name: Option<String>,
}

impl Activity {
    pub fn apply(&mut self, t: Transition) {
        match t {
            Transition::Enter(phase) => self.phase = phase,
            Transition::ToolCall(name) => {
                self.phase = Phase::ToolCall;
                self.tool_name = Some(name);
            }
            Transition::Finish => self.reset(),
        }
    }

    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.tool_name = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(v: serde_json::Value) -> EventRecord {
        EventRecord::from_value(&v)
    }

    #[test]
    fn test_message_delta_requires_content() {
        assert_eq!(
            transition(&rec(json!({"event": "message.delta", "data": {"delta": {"content": "x"}}}))),
            Some(Transition::Enter(Phase::Streaming))
        );
        assert_eq!(
            transition(&rec(json!({"event": "message.delta", "data": {}}))),
            None
        );
    }

    #[test]
    fn test_step_started_requires_tool_name() {
        assert_eq!(
            transition(&rec(json!({"event": "run.step.started", "data": {"tool_name": "search"}}))),
            Some(Transition::ToolCall("search".to_string()))
        );
        assert_eq!(
            transition(&rec(json!({"event": "run.step.started"}))),
            None
        );
    }

    #[test]
    fn test_step_delta_with_top_level_content_streams() {
        assert_eq!(
            transition(&rec(json!({"event": "run.step.delta", "content": "..."}))),
            Some(Transition::Enter(Phase::Streaming))
        );
        assert_eq!(
            transition(&rec(json!({"event": "run.step.completed"}))),
            None
        );
    }

    #[test]
    fn test_tool_call_then_finish_clears_tool() {
        let mut activity = Activity::default();
        activity.apply(Transition::Enter(Phase::Thinking));
        assert_eq!(activity.phase, Phase::Thinking);

        activity.apply(Transition::ToolCall("sensor_lookup".to_string()));
        assert_eq!(activity.phase, Phase::ToolCall);

        // Streaming keeps the last tool around until the run finishes
        activity.apply(Transition::Enter(Phase::Streaming));
        assert_eq!(activity.tool_name.as_deref(), Some("sensor_lookup"));

        activity.apply(Transition::Finish);
        assert_eq!(activity, Activity::default());
    }

    #[test]
    fn test_untagged_and_unknown_tags_do_nothing() {
        assert_eq!(transition(&rec(json!({"content": "hi"}))), None);
        assert_eq!(transition(&rec(json!({"event": "run.started"}))), None);
    }

    #[test]
    fn test_phase_serialization() {
        assert_eq!(
            serde_json::to_string(&Phase::ToolCall).unwrap(),
            r#""tool-call""#
        );
    }
}
