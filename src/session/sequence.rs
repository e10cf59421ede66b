use crate::session::SessionId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub const GENERATE_SEQUENCES: &str = "generate_outreach_sequences";
pub const MODIFY_SEQUENCES: &str = "modify_sequences";
pub const MODIFICATION_INSTRUCTION: &str = "modification_instruction";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceId(pub i64);

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceRole {
    #[default]
    Generated,
    Edited,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub seq_id: SequenceId,
    #[serde(default)]
    pub session_id: Option<SessionId>,
    pub content: String,
    #[serde(default)]
    pub role: SequenceRole,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Map<String, Value>,
}

impl FunctionCall {
    pub fn modification_instruction(&self) -> Option<String> {
        match self.args.get(MODIFICATION_INSTRUCTION)? {
            Value::Null => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFunctionCall {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub args: Option<Value>,
}

impl RawFunctionCall {
    pub fn validate(self) -> Option<FunctionCall> {
        let name = self.name.filter(|name| !name.trim().is_empty())?;
        match self.args {
            Some(Value::Object(args)) if !args.is_empty() => Some(FunctionCall { name, args }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub session_id: Option<SessionId>,
    #[serde(default)]
    pub ai_message: Option<String>,
    #[serde(default)]
    pub function_call: Option<RawFunctionCall>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    #[default]
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadReport {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub vector_count: Option<u64>,
    #[serde(default)]
    pub status: UploadStatus,
}

impl UploadReport {
    pub fn summary(&self) -> String {
        if self.message.trim().is_empty() {
            format!("Successfully processed {}.", self.filename)
        } else {
            self.message.clone()
        }
    }
}
