//! The core models for a conversation with the assistant.
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "assistant")]
    Assistant,
}

/// Opaque message identifier. Derived from the creation time plus a
/// per-conversation sequence number so two messages created in the
/// same millisecond still differ.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(created_at: DateTime<Utc>, seq: u64) -> Self {
        Self(format!("{}-{}", created_at.timestamp_millis(), seq))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(id: MessageId, role: Role, content: &str, created_at: DateTime<Utc>) -> Self {
        Message {
            id,
            role,
            content: content.to_string(),
            created_at,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}
