use crate::backend::Backend;
use crate::error::{ActionError, ApiError};
use crate::event::{AppEvent, SequenceOrigin};
use crate::session::sequence::{
    FunctionCall, Sequence, SequenceId, SequenceRole, GENERATE_SEQUENCES, MODIFY_SEQUENCES,
};
use crate::session::{Epoch, SessionId};
use crate::theme::Theme;
use crate::ui::chat::{ChatAction, ChatPanel};
use crate::ui::documents::{DocumentAction, DocumentPanel};
use crate::ui::navbar::{self, NavAction};
use crate::ui::workspace::{WorkspaceAction, WorkspacePanel};
use crate::ui::{ActiveView, Flash, BANNER_TTL};
use eframe::egui::{self, RichText};
use std::collections::BTreeMap;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Instant;
use tracing::{debug, error, info, warn};

const START_FAILED_TEXT: &str = "Failed to start a new session. Please try again.";
const DISPATCH_FAILED_TEXT: &str = "Failed to process sequence request.";

pub struct HelixApp<B: Backend> {
    rx: Receiver<AppEvent>,
    backend: B,
    theme: Theme,
    epoch: Epoch,
    session: Option<SessionId>,
    creating_session: bool,
    sequences: Vec<Sequence>,
    generating: bool,
    refreshing: bool,
    save_snapshots: BTreeMap<SequenceId, Vec<Sequence>>,
    banner: Flash<String>,
    view: ActiveView,
    chat: ChatPanel,
    workspace: WorkspacePanel,
    documents: DocumentPanel,
}

impl<B: Backend> HelixApp<B> {
    pub fn new(rx: Receiver<AppEvent>, backend: B, theme: Theme) -> Self {
        Self {
            rx,
            backend,
            theme,
            epoch: Epoch::default(),
            session: None,
            creating_session: false,
            sequences: Vec::new(),
            generating: false,
            refreshing: false,
            save_snapshots: BTreeMap::new(),
            banner: Flash::new(BANNER_TTL),
            view: ActiveView::default(),
            chat: ChatPanel::default(),
            workspace: WorkspacePanel::default(),
            documents: DocumentPanel::default(),
        }
    }

    fn show_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(%message, "showing error banner");
        self.banner.show(message);
    }

    pub fn start_session(&mut self) {
        self.epoch = self.epoch.next();
        self.session = None;
        self.creating_session = true;
        self.banner.clear();
        self.generating = false;
        self.refreshing = false;
        self.sequences.clear();
        self.save_snapshots.clear();
        self.workspace = WorkspacePanel::default();
        self.chat.reset(None, self.epoch, &self.backend);
        self.backend.create_session(self.epoch);
    }

    fn on_session_created(&mut self, result: Result<SessionId, ApiError>) {
        self.creating_session = false;
        match result {
            Ok(session) => {
                info!(%session, "session created");
                self.session = Some(session);
                self.chat.reset(Some(session), self.epoch, &self.backend);
            }
            Err(err) => {
                error!(error = %err, "failed to create session");
                self.session = None;
                self.show_error(START_FAILED_TEXT);
            }
        }
    }

    pub fn dispatch_function_call(&mut self, call: FunctionCall) {
        info!(function = %call.name, "dispatching function call");
        if let Err(err) = self.try_dispatch(call) {
            self.show_error(err.message_or(DISPATCH_FAILED_TEXT));
        }
    }

    fn try_dispatch(&mut self, call: FunctionCall) -> Result<(), ActionError> {
        let session = self.session.ok_or(ActionError::NoSession)?;
        if self.generating {
            return Err(ActionError::Busy);
        }
        self.banner.clear();
        // A pending refresh result would overwrite the new sequences.
        self.refreshing = false;

        match call.name.as_str() {
            GENERATE_SEQUENCES => {
                self.replace_sequences(Vec::new());
                self.generating = true;
                self.backend
                    .generate_sequences(self.epoch, session, call.args);
            }
            MODIFY_SEQUENCES => {
                let instruction = call
                    .modification_instruction()
                    .ok_or(ActionError::MissingInstruction)?;
                self.generating = true;
                self.backend
                    .modify_sequences(self.epoch, session, instruction);
            }
            other => return Err(ActionError::UnknownFunction(other.to_string())),
        }
        Ok(())
    }

    pub fn refresh_sequences(&mut self) {
        let Some(session) = self.session else {
            self.show_error(ActionError::NoSession.to_string());
            return;
        };
        if self.generating || self.refreshing {
            return;
        }
        self.refreshing = true;
        self.backend.list_sequences(self.epoch, session);
    }

    fn on_sequences_loaded(
        &mut self,
        origin: SequenceOrigin,
        result: Result<Vec<Sequence>, ApiError>,
    ) {
        if origin == SequenceOrigin::Refresh {
            if !self.refreshing {
                debug!("dropping refresh superseded by a sequence request");
                return;
            }
            self.refreshing = false;
        } else {
            self.generating = false;
        }

        match result {
            Ok(sequences) => {
                info!(count = sequences.len(), ?origin, "sequences loaded");
                self.replace_sequences(sequences);
            }
            Err(err) => {
                error!(error = %err, ?origin, "sequence request failed");
                self.show_error(err.message_or(origin.failure_text()));
            }
        }
    }

    fn replace_sequences(&mut self, sequences: Vec<Sequence>) {
        self.sequences = sequences;
        self.save_snapshots.clear();
        self.workspace.load(&self.sequences);
    }

    pub fn save_sequence_edit(&mut self, id: SequenceId, content: String) {
        if self.session.is_none() {
            self.workspace.finish_save(id);
            return;
        }
        self.banner.clear();

        let snapshot = self.sequences.clone();
        if let Some(sequence) = self.sequences.iter_mut().find(|seq| seq.seq_id == id) {
            sequence.content = content.clone();
            sequence.role = SequenceRole::Edited;
        }
        self.save_snapshots.insert(id, snapshot);
        self.workspace.load(&self.sequences);
        self.backend.update_sequence(self.epoch, id, content);
    }

    fn on_sequence_saved(&mut self, id: SequenceId, result: Result<Option<Sequence>, ApiError>) {
        self.workspace.finish_save(id);
        let snapshot = self.save_snapshots.remove(&id);

        match result {
            Ok(echoed) => {
                info!(%id, "sequence saved");
                let Some(updated) = echoed.filter(|seq| seq.seq_id == id) else {
                    return;
                };
                if let Some(slot) = self.sequences.iter_mut().find(|seq| seq.seq_id == id) {
                    self.workspace.edit(id, updated.content.clone());
                    *slot = updated;
                }
            }
            Err(err) => {
                error!(%id, error = %err, "failed to save sequence");
                if let Some(snapshot) = snapshot {
                    self.sequences = snapshot;
                    self.workspace.load(&self.sequences);
                }
                self.show_error(format!("Failed to save changes for sequence {id}."));
            }
        }
    }

    pub fn apply_event(&mut self, event: AppEvent) {
        if let Some(epoch) = event.epoch() {
            if epoch != self.epoch {
                debug!(event = event.name(), "dropping completion from a previous session");
                return;
            }
        }

        match event {
            AppEvent::SessionCreated { result, .. } => self.on_session_created(result),
            AppEvent::HistoryLoaded { result, .. } => self.chat.apply_history(result),
            AppEvent::MessageReplied { result, .. } => {
                if let Some(call) = self.chat.apply_reply(result) {
                    self.dispatch_function_call(call);
                }
            }
            AppEvent::ContextEnhanced { result, .. } => self.chat.apply_enhanced(result),
            AppEvent::SequencesLoaded { origin, result, .. } => {
                self.on_sequences_loaded(origin, result)
            }
            AppEvent::SequenceSaved { id, result, .. } => self.on_sequence_saved(id, result),
            AppEvent::DocumentUploaded(result) => self.documents.apply_upload(result),
        }
    }

    fn drain_events(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(event) => self.apply_event(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("event channel disconnected");
                    break;
                }
            }
        }
    }

    fn render_navbar(&mut self, ctx: &egui::Context) {
        let action = egui::TopBottomPanel::top("navbar")
            .show(ctx, |ui| {
                navbar::render(ui, &self.theme, self.session, self.view)
            })
            .inner;

        match action {
            Some(NavAction::NewSession) => self.start_session(),
            Some(NavAction::Show(view)) => self.view = view,
            None => {}
        }
    }

    fn render_banner(&mut self, ctx: &egui::Context) {
        let Some(message) = self.banner.get() else {
            return;
        };
        egui::TopBottomPanel::top("error_banner").show(ctx, |ui| {
            self.theme.banner_frame().show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.label(RichText::new(format!("Error: {message}")).color(self.theme.danger));
            });
        });
    }

    fn render_chat(&mut self, ctx: &egui::Context) {
        let action = egui::SidePanel::left("chat_panel")
            .resizable(true)
            .default_width(520.0)
            .min_width(360.0)
            .show(ctx, |ui| {
                if self.creating_session {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Starting session...");
                    });
                }
                self.chat.render(ui, &self.theme)
            })
            .inner;

        match action {
            Some(ChatAction::Send) => {
                self.chat.send_message(self.epoch, &self.backend);
            }
            Some(ChatAction::Enhance) => {
                self.chat.enhance_context(self.epoch, &self.backend);
            }
            None => {}
        }
    }

    fn render_right_panel(&mut self, ctx: &egui::Context, hovering_files: bool) {
        let view = self.view;
        let (workspace_action, document_action) = egui::CentralPanel::default()
            .show(ctx, |ui| match view {
                ActiveView::Workspace => (
                    self.workspace.render(
                        ui,
                        &self.theme,
                        self.session,
                        &self.sequences,
                        self.generating || self.refreshing,
                    ),
                    None,
                ),
                ActiveView::Documents => {
                    (None, self.documents.render(ui, &self.theme, hovering_files))
                }
            })
            .inner;

        match workspace_action {
            Some(WorkspaceAction::Save(id)) => {
                if let Some(content) = self.workspace.save(id) {
                    self.save_sequence_edit(id, content);
                }
            }
            Some(WorkspaceAction::Copy(id)) => {
                ctx.copy_text(self.workspace.copy(id));
                debug!(%id, "copied sequence to clipboard");
                self.workspace.mark_copied(id);
            }
            Some(WorkspaceAction::Refresh) => self.refresh_sequences(),
            None => {}
        }

        match document_action {
            Some(DocumentAction::Select(path)) => {
                if let Err(err) = self.documents.select(path) {
                    debug!(error = %err, "document not selected");
                }
            }
            Some(DocumentAction::Upload) => {
                if let Err(err) = self.documents.upload(&self.backend) {
                    debug!(error = %err, "upload not started");
                }
            }
            None => {}
        }
    }
}

impl<B: Backend> eframe::App for HelixApp<B> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();

        let now = Instant::now();
        let next_expiry = [self.banner.tick(now), self.workspace.tick(now)]
            .into_iter()
            .flatten()
            .min();
        if let Some(wait) = next_expiry {
            ctx.request_repaint_after(wait);
        }

        let (dropped, hovering_files) = ctx.input(|i| {
            (i.raw.dropped_files.clone(), !i.raw.hovered_files.is_empty())
        });
        if !dropped.is_empty() {
            self.documents.accept_dropped(&dropped);
            self.view = ActiveView::Documents;
        }

        self.render_navbar(ctx);
        self.render_banner(ctx);
        self.render_chat(ctx);
        self.render_right_panel(ctx, hovering_files);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::{Call, RecordingBackend};
    use crate::session::sequence::ChatReply;
    use serde_json::{json, Map, Value};
    use std::sync::mpsc;

    fn new_app() -> (HelixApp<RecordingBackend>, mpsc::Sender<AppEvent>) {
        let (tx, rx) = mpsc::channel();
        let app = HelixApp::new(rx, RecordingBackend::default(), Theme::default());
        (app, tx)
    }

    fn app_with_session() -> (HelixApp<RecordingBackend>, mpsc::Sender<AppEvent>) {
        let (mut app, tx) = new_app();
        app.start_session();
        let epoch = app.epoch;
        app.apply_event(AppEvent::SessionCreated {
            epoch,
            result: Ok(SessionId(42)),
        });
        app.backend.clear();
        (app, tx)
    }

    fn call(name: &str, args: Value) -> FunctionCall {
        let Value::Object(args) = args else {
            panic!("args must be an object");
        };
        FunctionCall {
            name: name.to_string(),
            args,
        }
    }

    fn sequence(id: i64, content: &str) -> Sequence {
        serde_json::from_value(json!({"seq_id": id, "session_id": 42, "content": content}))
            .expect("sequence should parse")
    }

    fn banner(app: &HelixApp<RecordingBackend>) -> Option<&str> {
        app.banner.get().map(String::as_str)
    }

    #[test]
    fn started_session_has_empty_state_and_loads_history() {
        let (mut app, _tx) = new_app();
        app.start_session();
        let epoch = app.epoch;
        assert_eq!(app.backend.calls(), vec![Call::CreateSession(epoch)]);

        app.apply_event(AppEvent::SessionCreated {
            epoch,
            result: Ok(SessionId(42)),
        });
        assert_eq!(app.session, Some(SessionId(42)));
        assert!(app.sequences.is_empty());
        assert!(!app.generating);
        assert!(app.chat.messages().is_empty());
        assert_eq!(
            app.backend.calls().last(),
            Some(&Call::FetchHistory(epoch, SessionId(42)))
        );
    }

    #[test]
    fn new_session_discards_previous_sequences() {
        let (mut app, _tx) = app_with_session();
        app.replace_sequences(vec![sequence(1, "Hi")]);
        app.generating = true;

        app.start_session();
        assert!(app.sequences.is_empty());
        assert!(!app.generating);
        assert!(app.session.is_none());
    }

    #[test]
    fn failed_session_start_shows_banner() {
        let (mut app, _tx) = new_app();
        app.start_session();
        let epoch = app.epoch;
        app.apply_event(AppEvent::SessionCreated {
            epoch,
            result: Err(ApiError::Backend {
                status: 500,
                message: Some("Failed to create chat session".to_string()),
            }),
        });
        assert!(app.session.is_none());
        assert_eq!(banner(&app), Some(START_FAILED_TEXT));
    }

    #[test]
    fn function_call_without_session_is_rejected() {
        let (mut app, _tx) = new_app();
        app.dispatch_function_call(call(GENERATE_SEQUENCES, json!({"target_role": "SDR"})));
        assert!(app.backend.calls().is_empty());
        assert_eq!(banner(&app), Some("Cannot process sequences without an active session."));
    }

    #[test]
    fn generate_replaces_sequences_and_toggles_generating() {
        let (mut app, _tx) = app_with_session();
        app.replace_sequences(vec![sequence(7, "old")]);

        app.dispatch_function_call(call(GENERATE_SEQUENCES, json!({"target_role": "SDR"})));
        assert!(app.generating);
        assert!(app.sequences.is_empty());

        let mut context = Map::new();
        context.insert("target_role".to_string(), json!("SDR"));
        assert_eq!(
            app.backend.calls(),
            vec![Call::GenerateSequences(app.epoch, SessionId(42), context)]
        );

        let generated: Vec<Sequence> =
            serde_json::from_value(json!([{"seq_id": 1, "content": "Hi..."}]))
                .expect("sequences should parse");
        let epoch = app.epoch;
        app.apply_event(AppEvent::SequencesLoaded {
            epoch,
            origin: SequenceOrigin::Generate,
            result: Ok(generated.clone()),
        });
        assert_eq!(app.sequences, generated);
        assert!(!app.generating);
        assert_eq!(app.workspace.buffer(SequenceId(1)), "Hi...");
    }

    #[test]
    fn failed_generation_clears_generating_flag() {
        let (mut app, _tx) = app_with_session();
        app.dispatch_function_call(call(GENERATE_SEQUENCES, json!({"tone": "warm"})));
        let epoch = app.epoch;
        app.apply_event(AppEvent::SequencesLoaded {
            epoch,
            origin: SequenceOrigin::Generate,
            result: Err(ApiError::Backend {
                status: 500,
                message: Some("Failed to generate sequences".to_string()),
            }),
        });
        assert!(!app.generating);
        assert_eq!(banner(&app), Some("Failed to generate sequences"));
    }

    #[test]
    fn modify_without_instruction_issues_no_request() {
        let (mut app, _tx) = app_with_session();
        app.replace_sequences(vec![sequence(1, "Hi")]);

        app.dispatch_function_call(call(MODIFY_SEQUENCES, json!({"tone": "casual"})));
        assert!(app.backend.calls().is_empty());
        assert!(!app.generating);
        assert_eq!(
            banner(&app),
            Some("Modification function called by AI without modification_instruction.")
        );
        assert_eq!(app.sequences.len(), 1);
    }

    #[test]
    fn modify_sends_instruction() {
        let (mut app, _tx) = app_with_session();
        app.dispatch_function_call(call(
            MODIFY_SEQUENCES,
            json!({"modification_instruction": "make them shorter"}),
        ));
        assert_eq!(
            app.backend.calls(),
            vec![Call::ModifySequences(
                app.epoch,
                SessionId(42),
                "make them shorter".to_string()
            )]
        );
        assert!(app.generating);
    }

    #[test]
    fn unknown_function_leaves_sequences_untouched() {
        let (mut app, _tx) = app_with_session();
        let before = vec![sequence(1, "Hi"), sequence(2, "Yo")];
        app.replace_sequences(before.clone());

        app.dispatch_function_call(call("delete_everything", json!({"all": true})));
        assert_eq!(app.sequences, before);
        assert!(app.backend.calls().is_empty());
        assert_eq!(
            banner(&app),
            Some("Unknown function call received: delete_everything")
        );
    }

    #[test]
    fn second_call_while_generating_is_rejected() {
        let (mut app, _tx) = app_with_session();
        app.dispatch_function_call(call(GENERATE_SEQUENCES, json!({"tone": "warm"})));
        app.dispatch_function_call(call(
            MODIFY_SEQUENCES,
            json!({"modification_instruction": "shorter"}),
        ));
        assert_eq!(app.backend.calls().len(), 1);
        assert_eq!(banner(&app), Some("A sequence request is already in progress."));
    }

    #[test]
    fn failed_save_restores_original_list() {
        let (mut app, _tx) = app_with_session();
        let original = vec![sequence(1, "Hi Sam"), sequence(2, "Hello Jo")];
        app.replace_sequences(original.clone());

        app.workspace.edit(SequenceId(1), "Hi Sam, quick question");
        let content = app.workspace.save(SequenceId(1)).expect("save should start");
        app.save_sequence_edit(SequenceId(1), content);

        assert_eq!(app.sequences[0].content, "Hi Sam, quick question");
        assert_eq!(app.sequences[0].role, SequenceRole::Edited);
        assert_eq!(
            app.backend.calls(),
            vec![Call::UpdateSequence(
                app.epoch,
                SequenceId(1),
                "Hi Sam, quick question".to_string()
            )]
        );

        let epoch = app.epoch;
        app.apply_event(AppEvent::SequenceSaved {
            epoch,
            id: SequenceId(1),
            result: Err(ApiError::Backend {
                status: 404,
                message: None,
            }),
        });
        assert_eq!(app.sequences, original);
        assert_eq!(app.workspace.buffer(SequenceId(1)), "Hi Sam");
        assert!(!app.workspace.is_saving(SequenceId(1)));
        assert_eq!(banner(&app), Some("Failed to save changes for sequence 1."));
    }

    #[test]
    fn successful_save_adopts_backend_row() {
        let (mut app, _tx) = app_with_session();
        app.replace_sequences(vec![sequence(1, "Hi Sam")]);
        app.save_sequence_edit(SequenceId(1), "Hi Sam!".to_string());

        let mut echoed = sequence(1, "Hi Sam!");
        echoed.role = SequenceRole::Edited;
        echoed.updated_at = "2024-05-01T10:00:00".to_string();
        let epoch = app.epoch;
        app.apply_event(AppEvent::SequenceSaved {
            epoch,
            id: SequenceId(1),
            result: Ok(Some(echoed.clone())),
        });
        assert_eq!(app.sequences, vec![echoed]);
        assert!(banner(&app).is_none());
    }

    #[test]
    fn stale_completions_are_dropped() {
        let (mut app, _tx) = app_with_session();
        let old_epoch = app.epoch;
        app.start_session();

        app.apply_event(AppEvent::SequencesLoaded {
            epoch: old_epoch,
            origin: SequenceOrigin::Generate,
            result: Ok(vec![sequence(1, "late")]),
        });
        app.apply_event(AppEvent::SessionCreated {
            epoch: old_epoch,
            result: Ok(SessionId(41)),
        });
        assert!(app.sequences.is_empty());
        assert!(app.session.is_none());
    }

    #[test]
    fn reply_with_function_call_triggers_generation() {
        let (mut app, _tx) = app_with_session();
        let epoch = app.epoch;
        app.apply_event(AppEvent::HistoryLoaded {
            epoch,
            result: Ok(serde_json::from_value(json!({"messages": []})).expect("history parses")),
        });
        app.chat.set_input("Ready");
        app.chat.send_message(epoch, &app.backend);
        app.backend.clear();

        let reply: ChatReply = serde_json::from_value(json!({
            "session_id": 42,
            "ai_message": "Generating now.",
            "function_call": {"name": GENERATE_SEQUENCES, "args": {"target_role": "SDR"}}
        }))
        .expect("reply should parse");
        app.apply_event(AppEvent::MessageReplied {
            epoch,
            result: Ok(reply),
        });

        assert!(app.generating);
        assert!(matches!(
            app.backend.calls().as_slice(),
            [Call::GenerateSequences(_, SessionId(42), _)]
        ));
    }

    #[test]
    fn refresh_requires_session() {
        let (mut app, _tx) = new_app();
        app.refresh_sequences();
        assert!(app.backend.calls().is_empty());
        assert!(banner(&app).is_some());

        let (mut app, _tx) = app_with_session();
        app.refresh_sequences();
        assert_eq!(
            app.backend.calls(),
            vec![Call::ListSequences(app.epoch, SessionId(42))]
        );
    }

    #[test]
    fn generate_during_refresh_is_issued_and_wins() {
        let (mut app, _tx) = app_with_session();
        app.refresh_sequences();
        app.backend.clear();

        app.dispatch_function_call(call(GENERATE_SEQUENCES, json!({"target_role": "SDR"})));
        assert!(banner(&app).is_none());
        assert!(matches!(
            app.backend.calls().as_slice(),
            [Call::GenerateSequences(_, SessionId(42), _)]
        ));

        let epoch = app.epoch;
        app.apply_event(AppEvent::SequencesLoaded {
            epoch,
            origin: SequenceOrigin::Refresh,
            result: Ok(vec![sequence(3, "stale")]),
        });
        assert!(app.sequences.is_empty());
        assert!(app.generating);

        app.apply_event(AppEvent::SequencesLoaded {
            epoch,
            origin: SequenceOrigin::Generate,
            result: Ok(vec![sequence(4, "fresh")]),
        });
        assert_eq!(app.sequences, vec![sequence(4, "fresh")]);
        assert!(!app.generating);
    }

    #[test]
    fn refresh_result_replaces_sequences() {
        let (mut app, _tx) = app_with_session();
        app.refresh_sequences();
        app.refresh_sequences();
        assert_eq!(app.backend.calls().len(), 1);
        assert!(app.refreshing);
        assert!(!app.generating);

        let epoch = app.epoch;
        app.apply_event(AppEvent::SequencesLoaded {
            epoch,
            origin: SequenceOrigin::Refresh,
            result: Ok(vec![sequence(5, "stored")]),
        });
        assert!(!app.refreshing);
        assert_eq!(app.sequences, vec![sequence(5, "stored")]);
    }

    #[test]
    fn queued_events_are_drained_in_order() {
        let (mut app, tx) = new_app();
        app.start_session();
        let epoch = app.epoch;
        tx.send(AppEvent::SessionCreated {
            epoch,
            result: Ok(SessionId(9)),
        })
        .expect("channel open");
        tx.send(AppEvent::HistoryLoaded {
            epoch,
            result: Ok(serde_json::from_value(json!({"messages": [], "rag_activated": true}))
                .expect("history parses")),
        })
        .expect("channel open");

        app.drain_events();
        assert_eq!(app.session, Some(SessionId(9)));
        assert!(app.chat.rag_active());
    }
}
