//! Conversation message types.
//!
//! A message is one turn in a branching conversation. Structural linkage is
//! carried by `children`; `merged_from` is causal metadata only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use uuid::Uuid;

/// Stable identifier of a message (UUID v4 string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
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

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for MessageId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for MessageId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Represents the author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// Message typed by the user.
    User,
    /// Message produced by the assistant (replies and merge syntheses).
    Assistant,
}

impl MessageRole {
    /// Speaker label used when a thread is rendered as a transcript.
    pub fn speaker(self) -> &'static str {
        match self {
            Self::User => "Human",
            Self::Assistant => "Assistant",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::Assistant => f.write_str("assistant"),
        }
    }
}

/// A single message in a branching conversation.
///
/// Messages are immutable once created; the only field that changes after
/// insertion is `children`, which grows as new branches are appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier.
    pub id: MessageId,
    /// Who authored the message.
    pub role: MessageRole,
    /// Text payload.
    pub content: String,
    /// Creation time; non-decreasing in insertion order.
    pub timestamp: DateTime<Utc>,
    /// Direct descendants in branch creation order.
    #[serde(default)]
    pub children: Vec<MessageId>,
    /// Sources synthesized by a merge. Present only on convergence nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_from: Option<Vec<MessageId>>,
    /// Marks the output of a merge operation.
    #[serde(default)]
    pub is_merge_root: bool,
    /// Content came from the local placeholder generator, not the completion service.
    #[serde(default)]
    pub fallback: bool,
}

impl Message {
    pub(crate) fn new(role: MessageRole, content: String, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: MessageId::generate(),
            role,
            content,
            timestamp,
            children: Vec::new(),
            merged_from: None,
            is_merge_root: false,
            fallback: false,
        }
    }

    /// Returns true if this message synthesizes other branches.
    pub fn is_merged(&self) -> bool {
        self.merged_from
            .as_ref()
            .is_some_and(|sources| !sources.is_empty())
    }

    /// Number of branches this message was merged from (0 for ordinary messages).
    pub fn merged_branch_count(&self) -> usize {
        self.merged_from.as_ref().map_or(0, Vec::len)
    }
}

/// Text payload plus provenance of a generated reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedText {
    pub content: String,
    pub fallback: bool,
}

impl GeneratedText {
    pub fn genuine(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            fallback: false,
        }
    }

    pub fn fallback(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            fallback: true,
        }
    }
}
