//! Conversation state: the message log, the activity of the in-flight
//! exchange and the thread identifier.
//!
//! The parser only mutates state through the methods here. Every
//! mutation from an exchange is tagged with its `ExchangeId` and
//! ignored once that exchange is no longer the active one.
use anyhow::{Result, bail};
use chrono::Utc;

use super::models::{Message, MessageId, Role};
use super::parser::Action;
use super::phase::{Activity, Phase};
use super::thread_store::{ThreadSlot, ThreadStore};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExchangeId(u64);

/// How an exchange ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeOutcome {
    Completed,
    Cancelled,
    Failed(String),
}

pub struct ConversationState {
    messages: Vec<Message>,
    activity: Activity,
    thread: ThreadSlot,
    error: Option<String>,
    active: Option<ExchangeId>,
    next_exchange: u64,
    next_message: u64,
}

impl ConversationState {
    pub fn new(store: Box<dyn ThreadStore>) -> Self {
        Self {
            messages: Vec::new(),
            activity: Activity::default(),
            thread: ThreadSlot::new(store),
            error: None,
            active: None,
            next_exchange: 0,
            next_message: 0,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    pub fn phase(&self) -> Phase {
        self.activity.phase
    }

    pub fn tool_name(&self) -> Option<&str> {
        self.activity.tool_name.as_deref()
    }

    pub fn thread_identifier(&self) -> Option<&str> {
        self.thread.get()
    }

    /// The dismissible error banner, if the last exchange failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_active(&self, exchange: ExchangeId) -> bool {
        self.active == Some(exchange)
    }

    fn push_message(&mut self, role: Role, content: &str) -> MessageId {
        let now = Utc::now();
        self.next_message += 1;
        let id = MessageId::new(now, self.next_message);
        self.messages
            .push(Message::new(id.clone(), role, content, now));
        id
    }

    /// Record the user's input and start an exchange for it. Only one
    /// exchange may be in flight at a time.
    pub fn begin_exchange(&mut self, input: &str) -> Result<(ExchangeId, MessageId)> {
        if self.is_busy() {
            bail!("An exchange is already in progress");
        }
        self.error = None;
        let message_id = self.push_message(Role::User, input);
        self.next_exchange += 1;
        let exchange = ExchangeId(self.next_exchange);
        self.active = Some(exchange);
        Ok((exchange, message_id))
    }

    /// Create the empty assistant message once the relay starts
    /// returning data.
    pub fn open_assistant_message(&mut self, exchange: ExchangeId) -> Option<MessageId> {
        if !self.is_active(exchange) {
            return None;
        }
        Some(self.push_message(Role::Assistant, ""))
    }

    pub fn append_to_assistant_message(
        &mut self,
        exchange: ExchangeId,
        id: &MessageId,
        text: &str,
    ) {
        if !self.is_active(exchange) {
            return;
        }
        if let Some(msg) = self
            .messages
            .iter_mut()
            .find(|m| &m.id == id && m.role == Role::Assistant)
        {
            msg.content.push_str(text);
        }
    }

    /// One-time latch. Returns whether the value was taken.
    pub fn set_thread_identifier(&mut self, thread_id: &str) -> bool {
        if thread_id.is_empty() {
            return false;
        }
        let latched = self.thread.set(thread_id);
        if latched {
            tracing::info!("Conversation bound to thread {}", thread_id);
        }
        latched
    }

    /// Apply one parsed action to the exchange's assistant message.
    pub fn apply(&mut self, exchange: ExchangeId, id: &MessageId, action: Action) {
        if !self.is_active(exchange) {
            return;
        }
        match action {
            Action::Append(text) => self.append_to_assistant_message(exchange, id, &text),
            Action::Transition(t) => self.activity.apply(t),
            Action::ThreadId(thread_id) => {
                self.set_thread_identifier(&thread_id);
            }
            Action::Done => {}
        }
    }

    /// Close the exchange. The assistant message is dropped if nothing
    /// was appended to it; otherwise it's kept as-is, partial or not.
    pub fn end_exchange(
        &mut self,
        exchange: ExchangeId,
        assistant: Option<&MessageId>,
        outcome: &ExchangeOutcome,
    ) {
        if !self.is_active(exchange) {
            return;
        }
        if outcome != &ExchangeOutcome::Completed {
            if let Some(id) = assistant {
                self.messages
                    .retain(|m| !(&m.id == id && m.role == Role::Assistant && m.is_empty()));
            }
        }
        if let ExchangeOutcome::Failed(reason) = outcome {
            self.error = Some(reason.clone());
        }
        self.activity.reset();
        self.active = None;
    }

    /// Forget everything, including the stored thread identifier. Any
    /// exchange still running is orphaned and its updates ignored.
    pub fn start_new_conversation(&mut self) {
        self.messages.clear();
        self.activity.reset();
        self.error = None;
        self.active = None;
        self.thread.clear();
    }
}
