//! Incremental parser for the relayed chat stream.
//!
//! Chunks go in, actions come out in the order their lines were
//! transmitted. The output doesn't depend on where the chunk
//! boundaries fall.
use super::decoder::LineBuffer;
use super::event::{EventRecord, EventTag, Line};
use super::phase::{Transition, transition};

/// A single change to conversation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Append(String),
    Transition(Transition),
    ThreadId(String),
    /// The producer signalled the end of the turn
    Done,
}

#[derive(Default, Debug)]
pub struct EventParser {
    lines: LineBuffer,
    finished: bool,
}

impl EventParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once `[DONE]` was seen. Everything after it is ignored.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Action> {
        if self.finished {
            return Vec::new();
        }
        let mut actions = Vec::new();
        for line in self.lines.push(chunk) {
            self.process(&line, true, &mut actions);
            if self.finished {
                break;
            }
        }
        actions
    }

    /// Process whatever is left in the buffer after the stream closed.
    pub fn finish(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.finished {
            return actions;
        }
        if let Some(residual) = self.lines.finish() {
            self.process(&residual, false, &mut actions);
        }
        actions
    }

    fn process(&mut self, line: &str, terminated: bool, actions: &mut Vec<Action>) {
        match Line::parse(line) {
            Line::Skip => {}
            Line::Done => {
                self.finished = true;
                actions.push(Action::Done);
            }
            Line::Payload(text) => actions.push(Action::Append(text)),
            Line::Text(mut text) => {
                if terminated {
                    text.push('\n');
                }
                actions.push(Action::Append(text));
            }
            Line::Record(record) => classify(&record, actions),
        }
    }
}

// Rows are applied in a fixed order and more than one may fire for the
// same record.
fn classify(record: &EventRecord, actions: &mut Vec<Action>) {
    if let Some(text) = &record.choice_content {
        actions.push(Action::Append(text.clone()));
    }
    if let Some(text) = &record.content {
        actions.push(Action::Append(text.clone()));
    }

    if let Some(t) = transition(record) {
        actions.push(Action::Transition(t));
    }
    // Only message deltas carry user-visible nested content; step
    // deltas just move the phase along
    if record.tag == Some(EventTag::MessageDelta) {
        if let Some(text) = &record.nested_content {
            actions.push(Action::Append(text.clone()));
        }
    }

    if let Some(thread_id) = &record.thread_id {
        actions.push(Action::ThreadId(thread_id.clone()));
    }
}
