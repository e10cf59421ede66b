use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

pub mod sequence;

pub const SYSTEM_PREFIX: &str = "[System:";

pub const NO_SESSION_TEXT: &str = "Please start a new session using the button above.";
pub const HISTORY_FALLBACK_TEXT: &str = "Welcome! How can I help?";
pub const RAG_ACTIVATED_TEXT: &str =
    "Context enhancement activated. The assistant now has access to relevant documents.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub i64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Bumped per session; completions from an older epoch are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Epoch(u64);

impl Epoch {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageId {
    Remote(i64),
    Local(String),
}

static LOCAL_MESSAGE_COUNTER: AtomicU64 = AtomicU64::new(0);

impl MessageId {
    pub fn local(prefix: &str) -> Self {
        let n = LOCAL_MESSAGE_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self::Local(format!("{prefix}-{n}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Ai,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub text: String,
    pub sender: Sender,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: MessageId::local("user"),
            text: text.into(),
            sender: Sender::User,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            id: MessageId::local("system"),
            text: text.into(),
            sender: Sender::System,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        let text = text.into();
        let sender = if text.starts_with(SYSTEM_PREFIX) {
            Sender::System
        } else {
            Sender::Ai
        };
        Self {
            id: MessageId::local("ai"),
            text,
            sender,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    User,
    Model,
    System,
    Tool,
}

impl From<HistoryRole> for Sender {
    fn from(role: HistoryRole) -> Self {
        match role {
            HistoryRole::User => Sender::User,
            HistoryRole::Model | HistoryRole::Tool => Sender::Ai,
            HistoryRole::System => Sender::System,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryEntry {
    pub msg_id: i64,
    pub msg_content: String,
    pub msg_role: HistoryRole,
}

impl From<HistoryEntry> for ChatMessage {
    fn from(entry: HistoryEntry) -> Self {
        Self {
            id: MessageId::Remote(entry.msg_id),
            text: entry.msg_content,
            sender: entry.msg_role.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct History {
    #[serde(default)]
    pub messages: Vec<HistoryEntry>,
    #[serde(default)]
    pub rag_activated: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedSession {
    pub session_id: SessionId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_roles_collapse_model_and_tool_into_ai() {
        let raw = r#"{
  "messages": [
    {"msg_id": 1, "msg_content": "hi", "msg_role": "user"},
    {"msg_id": 2, "msg_content": "hello", "msg_role": "model"},
    {"msg_id": 3, "msg_content": "Generated Sequences:", "msg_role": "tool"},
    {"msg_id": 4, "msg_content": "note", "msg_role": "system"}
  ]
}"#;
        let history: History = serde_json::from_str(raw).expect("history should parse");
        assert!(!history.rag_activated);

        let senders: Vec<Sender> = history
            .messages
            .into_iter()
            .map(|entry| ChatMessage::from(entry).sender)
            .collect();
        assert_eq!(
            senders,
            vec![Sender::User, Sender::Ai, Sender::Ai, Sender::System]
        );
    }

    #[test]
    fn history_reads_explicit_rag_flag() {
        let raw = r#"{"messages": [], "rag_activated": true}"#;
        let history: History = serde_json::from_str(raw).expect("history should parse");
        assert!(history.rag_activated);
    }

    #[test]
    fn assistant_text_with_system_prefix_is_a_system_message() {
        assert_eq!(
            ChatMessage::assistant("[System: sequences updated]").sender,
            Sender::System
        );
        assert_eq!(ChatMessage::assistant("Hi there").sender, Sender::Ai);
    }

    #[test]
    fn local_message_ids_are_unique() {
        assert_ne!(MessageId::local("user"), MessageId::local("user"));
    }

    #[test]
    fn epochs_increase() {
        let first = Epoch::default();
        assert_ne!(first, first.next());
        assert_eq!(first.next(), Epoch::default().next());
    }
}
