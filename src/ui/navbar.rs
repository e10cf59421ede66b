use crate::session::SessionId;
use crate::theme::Theme;
use crate::ui::ActiveView;
use eframe::egui::{self, RichText};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    NewSession,
    Show(ActiveView),
}

pub fn new_session_label(session: Option<SessionId>) -> &'static str {
    if session.is_some() {
        "New Session"
    } else {
        "Start Session"
    }
}

pub fn render(
    ui: &mut egui::Ui,
    theme: &Theme,
    session: Option<SessionId>,
    view: ActiveView,
) -> Option<NavAction> {
    let mut action = None;

    ui.horizontal(|ui| {
        ui.label(
            RichText::new("Helix")
                .strong()
                .size(18.0)
                .color(theme.accent_primary),
        );
        ui.separator();
        match session {
            Some(id) => ui.label(format!("Session {id}")),
            None => ui.label(RichText::new("No active session").color(theme.text_muted)),
        };

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.button(new_session_label(session)).clicked() {
                action = Some(NavAction::NewSession);
            }
            ui.separator();
            if ui
                .selectable_label(view == ActiveView::Documents, "Documents")
                .clicked()
            {
                action = Some(NavAction::Show(ActiveView::Documents));
            }
            if ui
                .selectable_label(view == ActiveView::Workspace, "Workspace")
                .clicked()
            {
                action = Some(NavAction::Show(ActiveView::Workspace));
            }
        });
    });

    action
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_button_label_tracks_session() {
        assert_eq!(new_session_label(None), "Start Session");
        assert_eq!(new_session_label(Some(SessionId(3))), "New Session");
    }
}
