use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned {status}: {}", message.as_deref().unwrap_or("no error message"))]
    Backend { status: u16, message: Option<String> },

    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    pub fn message_or(&self, fallback: &str) -> String {
        match self {
            Self::Backend {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Cannot process sequences without an active session.")]
    NoSession,

    #[error("A sequence request is already in progress.")]
    Busy,

    #[error("Received an invalid function call instruction from the AI.")]
    MalformedFunctionCall,

    #[error("Modification function called by AI without modification_instruction.")]
    MissingInstruction,

    #[error("Unknown function call received: {0}")]
    UnknownFunction(String),

    #[error("Please select a file first.")]
    NoFileSelected,

    #[error("Only PDF or TXT files are accepted.")]
    UnsupportedFileType,

    #[error("failed to read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ActionError {
    pub fn message_or(&self, fallback: &str) -> String {
        match self {
            Self::Api(err) => err.message_or(fallback),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_message_is_preferred() {
        let err = ApiError::Backend {
            status: 404,
            message: Some("Session not found".to_string()),
        };
        assert_eq!(err.message_or("generic"), "Session not found");
    }

    #[test]
    fn missing_or_blank_message_falls_back() {
        let err = ApiError::Backend {
            status: 500,
            message: None,
        };
        assert_eq!(err.message_or("generic"), "generic");

        let err = ApiError::Backend {
            status: 500,
            message: Some("  ".to_string()),
        };
        assert_eq!(err.message_or("generic"), "generic");
    }

    #[test]
    fn action_errors_keep_their_own_text() {
        assert_eq!(
            ActionError::UnknownFunction("delete_all".to_string()).message_or("generic"),
            "Unknown function call received: delete_all"
        );
        let wrapped = ActionError::from(ApiError::Backend {
            status: 400,
            message: None,
        });
        assert_eq!(wrapped.message_or("generic"), "generic");
    }
}
