use crate::session::sequence::{Sequence, SequenceId, SequenceRole};
use crate::session::SessionId;
use crate::theme::Theme;
use crate::ui::{Flash, COPY_FLASH_TTL};
use eframe::egui::{self, RichText, ScrollArea};
use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceAction {
    Save(SequenceId),
    Copy(SequenceId),
    Refresh,
}

pub struct WorkspacePanel {
    edits: BTreeMap<SequenceId, String>,
    saving: BTreeSet<SequenceId>,
    copied: Flash<SequenceId>,
}

impl Default for WorkspacePanel {
    fn default() -> Self {
        Self {
            edits: BTreeMap::new(),
            saving: BTreeSet::new(),
            copied: Flash::new(COPY_FLASH_TTL),
        }
    }
}

impl WorkspacePanel {
    pub fn load(&mut self, sequences: &[Sequence]) {
        self.edits = sequences
            .iter()
            .map(|sequence| (sequence.seq_id, sequence.content.clone()))
            .collect();
    }

    pub fn edit(&mut self, id: SequenceId, content: impl Into<String>) {
        self.edits.insert(id, content.into());
    }

    pub fn buffer(&self, id: SequenceId) -> &str {
        self.edits.get(&id).map(String::as_str).unwrap_or_default()
    }

    pub fn is_saving(&self, id: SequenceId) -> bool {
        self.saving.contains(&id)
    }

    pub fn can_save(&self, id: SequenceId, persisted: &str) -> bool {
        !self.is_saving(id) && self.buffer(id) != persisted
    }

    pub fn save(&mut self, id: SequenceId) -> Option<String> {
        if !self.saving.insert(id) {
            return None;
        }
        Some(self.buffer(id).to_string())
    }

    pub fn finish_save(&mut self, id: SequenceId) {
        self.saving.remove(&id);
    }

    pub fn copy(&self, id: SequenceId) -> String {
        self.buffer(id).to_string()
    }

    pub fn mark_copied(&mut self, id: SequenceId) {
        self.copied.show(id);
    }

    pub fn copied(&self) -> Option<SequenceId> {
        self.copied.get().copied()
    }

    pub fn tick(&mut self, now: Instant) -> Option<Duration> {
        self.copied.tick(now)
    }

    pub fn render(
        &mut self,
        ui: &mut egui::Ui,
        theme: &Theme,
        session: Option<SessionId>,
        sequences: &[Sequence],
        generating: bool,
    ) -> Option<WorkspaceAction> {
        let mut action = None;

        ui.horizontal(|ui| {
            ui.heading("Generated Samples");
            if ui
                .add_enabled(session.is_some() && !generating, egui::Button::new("Refresh"))
                .clicked()
            {
                action = Some(WorkspaceAction::Refresh);
            }
        });
        ui.separator();

        if generating {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Generating sequences... Please wait.");
            });
            return action;
        }

        if session.is_none() {
            ui.label(
                RichText::new("Start a new session to generate sequences.")
                    .color(theme.text_muted),
            );
            return action;
        }

        if sequences.is_empty() {
            ui.label(
                RichText::new(
                    "Chat with the AI to gather information, and sequences will appear here once generated.",
                )
                .color(theme.text_muted),
            );
            return action;
        }

        let copied = self.copied();
        ScrollArea::vertical()
            .id_salt("workspace_samples")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for sequence in sequences {
                    let id = sequence.seq_id;
                    let saving = self.is_saving(id);
                    let can_save = self.can_save(id, &sequence.content);
                    let buffer = self.edits.entry(id).or_default();

                    theme.card_frame().show(ui, |ui| {
                        if sequence.role == SequenceRole::Edited {
                            ui.label(RichText::new("edited").color(theme.text_muted).small());
                        }
                        ui.add_enabled(
                            !saving,
                            egui::TextEdit::multiline(buffer)
                                .desired_rows(6)
                                .desired_width(f32::INFINITY),
                        );
                        ui.add_space(theme.spacing_4);
                        ui.horizontal(|ui| {
                            let copy_label = if copied == Some(id) { "Copied!" } else { "Copy" };
                            if ui
                                .add_enabled(!saving, egui::Button::new(copy_label))
                                .clicked()
                            {
                                action = Some(WorkspaceAction::Copy(id));
                            }

                            let save_label = if saving { "Saving..." } else { "Save Edit" };
                            if ui
                                .add_enabled(can_save, egui::Button::new(save_label))
                                .clicked()
                            {
                                action = Some(WorkspaceAction::Save(id));
                            }
                        });
                    });
                    ui.add_space(theme.spacing_8);
                }
            });

        action
    }
}
