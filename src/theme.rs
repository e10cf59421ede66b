use crate::session::Sender;
use eframe::egui::{self, Color32, CornerRadius, FontId, Frame, Margin, Stroke, TextStyle};

#[derive(Debug, Clone)]
pub struct Theme {
    pub surface_0: Color32,
    pub surface_1: Color32,
    pub surface_2: Color32,
    pub surface_3: Color32,
    pub accent_primary: Color32,
    pub accent_muted: Color32,
    pub success: Color32,
    pub danger: Color32,
    pub danger_tint: Color32,
    pub text_primary: Color32,
    pub text_muted: Color32,
    pub user_bubble: Color32,
    pub ai_bubble: Color32,
    pub system_bubble: Color32,
    pub spacing_4: f32,
    pub spacing_8: f32,
    pub spacing_12: f32,
    pub radius_8: u8,
    pub radius_12: u8,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            surface_0: Color32::from_rgb(0x0F, 0x11, 0x15),
            surface_1: Color32::from_rgb(0x16, 0x1A, 0x20),
            surface_2: Color32::from_rgb(0x1C, 0x22, 0x2B),
            surface_3: Color32::from_rgb(0x22, 0x2A, 0x35),
            accent_primary: Color32::from_rgb(0x6D, 0x5D, 0xF6),
            accent_muted: Color32::from_rgb(0x55, 0x48, 0xC8),
            success: Color32::from_rgb(0x22, 0xC5, 0x5E),
            danger: Color32::from_rgb(0xEF, 0x44, 0x44),
            danger_tint: Color32::from_rgba_premultiplied(239, 68, 68, 38),
            text_primary: Color32::from_rgb(0xE6, 0xED, 0xF3),
            text_muted: Color32::from_rgb(0x8B, 0x94, 0x9E),
            user_bubble: Color32::from_rgb(0x2A, 0x2F, 0x5A),
            ai_bubble: Color32::from_rgb(0x1C, 0x22, 0x2B),
            system_bubble: Color32::from_rgb(0x2B, 0x26, 0x1A),
            spacing_4: 4.0,
            spacing_8: 8.0,
            spacing_12: 12.0,
            radius_8: 8,
            radius_12: 12,
        }
    }
}

impl Theme {
    pub fn apply_visuals(&self, ctx: &egui::Context) {
        let mut visuals = egui::Visuals::dark();
        visuals.panel_fill = self.surface_1;
        visuals.extreme_bg_color = self.surface_0;
        visuals.override_text_color = Some(self.text_primary);
        visuals.widgets.inactive.bg_fill = self.surface_2;
        visuals.widgets.inactive.weak_bg_fill = self.surface_2;
        visuals.widgets.inactive.bg_stroke = Stroke::NONE;
        visuals.widgets.hovered.bg_fill = self.surface_3;
        visuals.widgets.hovered.weak_bg_fill = self.surface_3;
        visuals.widgets.active.bg_fill = self.accent_muted;
        visuals.widgets.active.weak_bg_fill = self.accent_muted;
        visuals.selection.bg_fill = self.accent_muted;
        visuals.hyperlink_color = self.accent_primary;

        let mut style = (*ctx.style()).clone();
        style.visuals = visuals;
        style.spacing.item_spacing = egui::vec2(8.0, 8.0);
        style.spacing.button_padding = egui::vec2(12.0, 6.0);
        style.text_styles.insert(TextStyle::Heading, FontId::proportional(18.0));
        style.text_styles.insert(TextStyle::Body, FontId::proportional(14.0));
        style.text_styles.insert(TextStyle::Monospace, FontId::monospace(13.0));
        style.text_styles.insert(TextStyle::Small, FontId::proportional(12.0));
        ctx.set_style(style);
    }

    pub fn card_frame(&self) -> Frame {
        Frame::new()
            .fill(self.surface_2)
            .inner_margin(Margin::same(self.spacing_12 as i8))
            .corner_radius(CornerRadius::same(self.radius_12))
            .stroke(Stroke::NONE)
    }

    pub fn bubble_frame(&self, sender: Sender) -> Frame {
        let fill = match sender {
            Sender::User => self.user_bubble,
            Sender::Ai => self.ai_bubble,
            Sender::System => self.system_bubble,
        };
        Frame::new()
            .fill(fill)
            .inner_margin(Margin::symmetric(self.spacing_12 as i8, self.spacing_8 as i8))
            .corner_radius(CornerRadius::same(self.radius_8))
    }

    pub fn banner_frame(&self) -> Frame {
        Frame::new()
            .fill(self.danger_tint)
            .inner_margin(Margin::symmetric(self.spacing_12 as i8, self.spacing_8 as i8))
            .corner_radius(CornerRadius::same(self.radius_8))
            .stroke(Stroke::new(1.0, self.danger))
    }
}
