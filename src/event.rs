use crate::error::{ActionError, ApiError};
use crate::session::sequence::{ChatReply, Sequence, SequenceId, UploadReport};
use crate::session::{Epoch, History, SessionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceOrigin {
    Generate,
    Modify,
    Refresh,
}

impl SequenceOrigin {
    pub fn failure_text(self) -> &'static str {
        match self {
            Self::Generate | Self::Modify => "Failed to process sequence request.",
            Self::Refresh => "Failed to load sequences for this session.",
        }
    }
}

#[derive(Debug)]
pub enum AppEvent {
    SessionCreated {
        epoch: Epoch,
        result: Result<SessionId, ApiError>,
    },
    HistoryLoaded {
        epoch: Epoch,
        result: Result<History, ApiError>,
    },
    MessageReplied {
        epoch: Epoch,
        result: Result<ChatReply, ApiError>,
    },
    ContextEnhanced {
        epoch: Epoch,
        result: Result<(), ApiError>,
    },
    SequencesLoaded {
        epoch: Epoch,
        origin: SequenceOrigin,
        result: Result<Vec<Sequence>, ApiError>,
    },
    SequenceSaved {
        epoch: Epoch,
        id: SequenceId,
        result: Result<Option<Sequence>, ApiError>,
    },
    DocumentUploaded(Result<UploadReport, ActionError>),
}

impl AppEvent {
    pub fn epoch(&self) -> Option<Epoch> {
        match self {
            Self::SessionCreated { epoch, .. }
            | Self::HistoryLoaded { epoch, .. }
            | Self::MessageReplied { epoch, .. }
            | Self::ContextEnhanced { epoch, .. }
            | Self::SequencesLoaded { epoch, .. }
            | Self::SequenceSaved { epoch, .. } => Some(*epoch),
            Self::DocumentUploaded(_) => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionCreated { .. } => "session_created",
            Self::HistoryLoaded { .. } => "history_loaded",
            Self::MessageReplied { .. } => "message_replied",
            Self::ContextEnhanced { .. } => "context_enhanced",
            Self::SequencesLoaded { .. } => "sequences_loaded",
            Self::SequenceSaved { .. } => "sequence_saved",
            Self::DocumentUploaded(_) => "document_uploaded",
        }
    }
}
