use crate::backend::Backend;
use crate::error::{ActionError, ApiError};
use crate::session::sequence::{ChatReply, FunctionCall};
use crate::session::{
    ChatMessage, Epoch, History, MessageId, Sender, SessionId, HISTORY_FALLBACK_TEXT,
    NO_SESSION_TEXT, RAG_ACTIVATED_TEXT,
};
use crate::theme::Theme;
use eframe::egui::{self, RichText, ScrollArea};
use tracing::{debug, warn};

const SEND_FAILED_TEXT: &str = "Failed to get response from AI. Please try again.";
const RAG_FAILED_TEXT: &str = "Failed to enhance context with documents.";
const INVALID_CALL_NOTICE: &str = "[System Error: Invalid function call received]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatAction {
    Send,
    Enhance,
}

pub struct ChatPanel {
    session: Option<SessionId>,
    messages: Vec<ChatMessage>,
    input: String,
    sending: bool,
    pending_user: Option<(MessageId, String)>,
    loading_history: bool,
    rag_pending: bool,
    rag_active: bool,
    error: Option<String>,
    scroll_to_bottom: bool,
}

impl Default for ChatPanel {
    fn default() -> Self {
        Self {
            session: None,
            messages: vec![ChatMessage::system(NO_SESSION_TEXT)],
            input: String::new(),
            sending: false,
            pending_user: None,
            loading_history: false,
            rag_pending: false,
            rag_active: false,
            error: None,
            scroll_to_bottom: false,
        }
    }
}

impl ChatPanel {
    pub fn reset(&mut self, session: Option<SessionId>, epoch: Epoch, backend: &impl Backend) {
        *self = Self {
            session,
            ..Self::default()
        };

        if let Some(session) = session {
            self.messages.clear();
            self.loading_history = true;
            backend.fetch_history(epoch, session);
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[cfg(test)]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn rag_active(&self) -> bool {
        self.rag_active
    }

    #[cfg(test)]
    pub fn is_sending(&self) -> bool {
        self.sending
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    #[cfg(test)]
    pub fn input(&self) -> &str {
        &self.input
    }

    fn input_enabled(&self) -> bool {
        self.session.is_some() && !self.sending && !self.loading_history
    }

    pub fn can_send(&self) -> bool {
        self.input_enabled() && !self.input.trim().is_empty()
    }

    pub fn can_enhance(&self) -> bool {
        self.session.is_some() && !self.rag_pending && !self.rag_active && !self.sending
    }

    pub fn send_message(&mut self, epoch: Epoch, backend: &impl Backend) -> bool {
        let Some(session) = self.session else {
            return false;
        };
        if !self.can_send() {
            return false;
        }

        let text = std::mem::take(&mut self.input);
        let message = ChatMessage::user(text.clone());
        self.pending_user = Some((message.id.clone(), text.clone()));
        self.messages.push(message);
        self.sending = true;
        self.error = None;
        self.scroll_to_bottom = true;

        backend.send_message(epoch, session, text);
        true
    }

    pub fn enhance_context(&mut self, epoch: Epoch, backend: &impl Backend) -> bool {
        let Some(session) = self.session else {
            return false;
        };
        if !self.can_enhance() {
            return false;
        }

        self.rag_pending = true;
        self.error = None;
        backend.enhance_context(epoch, session);
        true
    }

    pub fn apply_history(&mut self, result: Result<History, ApiError>) {
        self.loading_history = false;
        match result {
            Ok(history) => {
                self.messages = history.messages.into_iter().map(ChatMessage::from).collect();
                self.rag_active = history.rag_activated;
            }
            Err(err) => {
                warn!(error = %err, "failed to fetch chat history");
                self.messages = vec![ChatMessage::system(HISTORY_FALLBACK_TEXT)];
            }
        }
        self.scroll_to_bottom = true;
    }

    pub fn apply_reply(&mut self, result: Result<ChatReply, ApiError>) -> Option<FunctionCall> {
        self.sending = false;
        self.scroll_to_bottom = true;
        let pending = self.pending_user.take();

        let reply = match result {
            Ok(reply) => reply,
            Err(err) => {
                warn!(error = %err, "failed to send message");
                if let Some((id, text)) = pending {
                    self.messages.retain(|message| message.id != id);
                    if self.input.is_empty() {
                        self.input = text;
                    }
                }
                let message = err.message_or(SEND_FAILED_TEXT);
                self.messages.push(ChatMessage::system(format!("Error: {message}")));
                self.error = Some(message);
                return None;
            }
        };

        debug!(session = ?reply.session_id, "assistant replied");
        if let Some(text) = reply.ai_message.filter(|text| !text.is_empty()) {
            self.messages.push(ChatMessage::assistant(text));
        }
        self.rag_active = false;

        let raw = reply.function_call?;
        match raw.validate() {
            Some(call) => {
                debug!(function = %call.name, "forwarding function call");
                Some(call)
            }
            None => {
                warn!("received incomplete function call from backend");
                self.error = Some(ActionError::MalformedFunctionCall.to_string());
                self.messages.push(ChatMessage::system(INVALID_CALL_NOTICE));
                None
            }
        }
    }

    pub fn apply_enhanced(&mut self, result: Result<(), ApiError>) {
        self.rag_pending = false;
        match result {
            Ok(()) => {
                self.messages.push(ChatMessage::system(RAG_ACTIVATED_TEXT));
                self.rag_active = true;
                self.scroll_to_bottom = true;
            }
            Err(err) => {
                warn!(error = %err, "context enhancement failed");
                self.error = Some(err.message_or(RAG_FAILED_TEXT));
            }
        }
    }

    fn enhance_label(&self) -> &'static str {
        if self.rag_pending {
            "Enhancing..."
        } else if self.rag_active {
            "Context Enhanced"
        } else {
            "Enhance"
        }
    }

    pub fn render(&mut self, ui: &mut egui::Ui, theme: &Theme) -> Option<ChatAction> {
        let mut action = None;

        let transcript_height = (ui.available_height() - 90.0).max(120.0);
        ScrollArea::vertical()
            .id_salt("chat_transcript")
            .max_height(transcript_height)
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for message in &self.messages {
                    let (label, color) = match message.sender {
                        Sender::User => ("You", theme.accent_primary),
                        Sender::Ai => ("Helix", theme.success),
                        Sender::System => ("System", theme.text_muted),
                    };
                    theme.bubble_frame(message.sender).show(ui, |ui| {
                        ui.label(RichText::new(label).color(color).small());
                        ui.label(&message.text);
                    });
                }

                if self.sending || self.loading_history {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label(RichText::new("Thinking...").color(theme.text_muted));
                    });
                }

                if self.scroll_to_bottom {
                    ui.scroll_to_cursor(Some(egui::Align::BOTTOM));
                }
            });
        self.scroll_to_bottom = false;

        if let Some(error) = &self.error {
            ui.label(RichText::new(error).color(theme.danger));
        }

        ui.separator();
        let input_enabled = self.input_enabled();
        let hint = if self.session.is_some() {
            "Type your message..."
        } else {
            "Start a session first"
        };

        let can_enhance = self.can_enhance();
        let enhance_label = self.enhance_label();
        let rag_active = self.rag_active;
        let send_label = if self.sending { "Sending..." } else { "Send" };
        let input = &mut self.input;

        ui.horizontal(|ui| {
            let response = ui.add_enabled(
                input_enabled,
                egui::TextEdit::singleline(input)
                    .desired_width(ui.available_width() - 200.0)
                    .hint_text(hint),
            );
            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                action = Some(ChatAction::Send);
            }

            let enhance = ui.add_enabled(
                can_enhance,
                egui::Button::new(enhance_label).selected(rag_active),
            );
            if enhance.clicked() {
                action = Some(ChatAction::Enhance);
            }

            let can_send = input_enabled && !input.trim().is_empty();
            if ui
                .add_enabled(can_send, egui::Button::new(send_label))
                .clicked()
            {
                action = Some(ChatAction::Send);
            }
        });

        action
    }
}
