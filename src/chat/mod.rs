//! Client side of the chat pipeline: incremental stream parsing and
//! the conversation state it drives.
pub mod decoder;
pub mod event;
pub mod models;
pub mod parser;
pub mod phase;
pub mod session;
pub mod store;
pub mod thread_store;

pub use models::{Message, MessageId, Role};
pub use parser::{Action, EventParser};
pub use phase::{Activity, Phase, Transition};
pub use session::ChatClient;
pub use store::{ConversationState, ExchangeId, ExchangeOutcome};
pub use thread_store::{MemoryThreadStore, SqliteThreadStore, ThreadSlot, ThreadStore};
