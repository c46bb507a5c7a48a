//! Keyboard/mouse reference shown in the help overlay (F1).

use eframe::egui;

/// Single help entry (key binding + description)
#[derive(Clone, Debug)]
pub struct HelpEntry {
    pub key: &'static str,
    pub desc: &'static str,
}

impl HelpEntry {
    pub const fn new(key: &'static str, desc: &'static str) -> Self {
        Self { key, desc }
    }
}

/// Transport controls
pub const PLAYBACK_HELP: &[HelpEntry] = &[
    HelpEntry::new("Space / K", "Play/Pause"),
    HelpEntry::new("Left / J", "Seek Back (step)"),
    HelpEntry::new("Right / L", "Seek Forward (step)"),
    HelpEntry::new("S", "Cycle Speed"),
    HelpEntry::new("Click bar", "Seek to Position"),
];

/// Window and library
pub const GLOBAL_HELP: &[HelpEntry] = &[
    HelpEntry::new("F1", "Toggle Help"),
    HelpEntry::new("F2", "Toggle Library"),
    HelpEntry::new("O / Ctrl+O", "Open File"),
    HelpEntry::new("F / Z", "Toggle Fullscreen"),
    HelpEntry::new("ESC", "Exit Fullscreen / Dismiss Error"),
    HelpEntry::new("Drop files", "Add to Library (opens first if idle)"),
];

/// Render help overlay
pub fn render_help_overlay(ui: &mut egui::Ui) {
    let font_id = egui::FontId::proportional(13.0);
    let text_color = egui::Color32::from_rgba_unmultiplied(255, 255, 255, 200);
    let key_color = egui::Color32::from_rgb(255, 200, 100);

    let max_key_len = PLAYBACK_HELP
        .iter()
        .chain(GLOBAL_HELP.iter())
        .map(|e| e.key.len())
        .max()
        .unwrap_or(10);
    let max_key_width = (max_key_len as f32) * 8.0 + 20.0;

    let render_entries = |ui: &mut egui::Ui, entries: &[HelpEntry]| {
        for entry in entries {
            ui.horizontal(|ui| {
                ui.add_sized(
                    [max_key_width, 18.0],
                    egui::Label::new(
                        egui::RichText::new(entry.key)
                            .font(font_id.clone())
                            .color(key_color),
                    ),
                );
                ui.label(
                    egui::RichText::new(entry.desc)
                        .font(font_id.clone())
                        .color(text_color),
                );
            });
        }
    };

    egui::Frame::NONE
        .fill(egui::Color32::from_rgba_unmultiplied(0, 0, 0, 180))
        .inner_margin(12.0)
        .corner_radius(4.0)
        .show(ui, |ui| {
            for (title, entries) in all_help_sections() {
                ui.label(
                    egui::RichText::new(title)
                        .font(font_id.clone())
                        .color(egui::Color32::GRAY),
                );
                ui.add_space(4.0);
                render_entries(ui, entries);
                ui.add_space(8.0);
            }
        });
}

pub fn all_help_sections() -> Vec<(&'static str, &'static [HelpEntry])> {
    vec![("Playback", PLAYBACK_HELP), ("Global", GLOBAL_HELP)]
}
