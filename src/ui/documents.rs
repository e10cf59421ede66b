use crate::backend::{Backend, SelectedDocument};
use crate::error::ActionError;
use crate::session::sequence::UploadReport;
use crate::theme::Theme;
use eframe::egui::{self, RichText};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const UPLOAD_FAILED_TEXT: &str = "An unknown error occurred during upload.";

pub fn accepted_mime(path: &Path) -> Option<mime::Mime> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "pdf" => Some(mime::APPLICATION_PDF),
        "txt" => Some(mime::TEXT_PLAIN),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentAction {
    Select(PathBuf),
    Upload,
}

#[derive(Default)]
pub struct DocumentPanel {
    selected: Option<SelectedDocument>,
    path_input: String,
    uploading: bool,
    status: Option<String>,
    error: Option<String>,
}

impl DocumentPanel {
    #[cfg(test)]
    pub fn selected(&self) -> Option<&SelectedDocument> {
        self.selected.as_ref()
    }

    #[cfg(test)]
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    #[cfg(test)]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[cfg(test)]
    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    pub fn select(&mut self, path: PathBuf) -> Result<(), ActionError> {
        let Some(mime) = accepted_mime(&path) else {
            let err = ActionError::UnsupportedFileType;
            self.error = Some(err.to_string());
            return Err(err);
        };

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        self.status = Some(format!("Selected file: {file_name}"));
        self.error = None;
        self.selected = Some(SelectedDocument {
            path,
            file_name,
            mime,
        });
        Ok(())
    }

    pub fn accept_dropped(&mut self, files: &[egui::DroppedFile]) {
        let Some(path) = files.iter().find_map(|file| file.path.clone()) else {
            return;
        };
        if let Err(err) = self.select(path) {
            debug!(error = %err, "dropped file not selected");
        }
    }

    pub fn upload(&mut self, backend: &impl Backend) -> Result<(), ActionError> {
        if self.uploading {
            return Ok(());
        }
        let Some(document) = self.selected.clone() else {
            let err = ActionError::NoFileSelected;
            self.error = Some(err.to_string());
            return Err(err);
        };

        self.uploading = true;
        self.status = Some(format!("Uploading {}...", document.file_name));
        self.error = None;
        backend.upload_document(document);
        Ok(())
    }

    pub fn apply_upload(&mut self, result: Result<UploadReport, ActionError>) {
        self.uploading = false;
        match result {
            Ok(report) => {
                info!(
                    file = %report.filename,
                    vectors = report.vector_count.unwrap_or_default(),
                    status = ?report.status,
                    "document uploaded"
                );
                self.status = Some(report.summary());
                self.selected = None;
            }
            Err(err) => {
                warn!(error = %err, "document upload failed");
                self.status = None;
                self.error = Some(format!("Upload failed: {}", err.message_or(UPLOAD_FAILED_TEXT)));
            }
        }
    }

    pub fn render(
        &mut self,
        ui: &mut egui::Ui,
        theme: &Theme,
        hovering_files: bool,
    ) -> Option<DocumentAction> {
        let mut action = None;

        ui.heading("Upload Documents");
        ui.label("Upload company, job description, or candidate information (PDF or TXT).");
        ui.add_space(theme.spacing_8);

        theme.card_frame().show(ui, |ui| {
            ui.set_width(ui.available_width());
            if hovering_files {
                ui.label("Drop the file here ...");
            } else {
                ui.label("Drag 'n' drop a file onto the window, or enter a path below");
            }
            ui.label(
                RichText::new("(Only *.pdf and *.txt files)")
                    .color(theme.text_muted)
                    .small(),
            );
            ui.horizontal(|ui| {
                ui.add_enabled(
                    !self.uploading,
                    egui::TextEdit::singleline(&mut self.path_input)
                        .hint_text("/path/to/document.pdf"),
                );
                let can_select = !self.uploading && !self.path_input.trim().is_empty();
                if ui
                    .add_enabled(can_select, egui::Button::new("Select"))
                    .clicked()
                {
                    action = Some(DocumentAction::Select(PathBuf::from(self.path_input.trim())));
                }
            });
        });

        if let Some(selected) = self.selected.as_ref().filter(|_| !self.uploading) {
            ui.label(format!("Selected: {}", selected.file_name));
        }

        if let Some(status) = &self.status {
            ui.label(RichText::new(status).color(theme.success));
        }
        if let Some(error) = &self.error {
            ui.label(RichText::new(error).color(theme.danger));
        }

        let label = if self.uploading {
            "Uploading..."
        } else {
            "Upload and Process"
        };
        if ui
            .add_enabled(
                self.selected.is_some() && !self.uploading,
                egui::Button::new(label),
            )
            .clicked()
        {
            action = Some(DocumentAction::Upload);
        }

        action
    }
}
