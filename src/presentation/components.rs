use crate::domain::models::{DeviceRecord, MessageSeverity};
use eframe::egui;

pub struct Components;

impl Components {
    pub fn heading(ui: &mut egui::Ui, text: &str) {
        ui.label(egui::RichText::new(text).heading().strong());
    }

    pub fn sub_heading(ui: &mut egui::Ui, text: &str) {
        ui.label(egui::RichText::new(text).strong().size(16.0));
    }

    pub fn card<R>(
        ui: &mut egui::Ui,
        title: &str,
        add_contents: impl FnOnce(&mut egui::Ui) -> R,
    ) -> R {
        let stroke = ui.style().visuals.widgets.noninteractive.bg_stroke;
        let bg = ui.style().visuals.widgets.noninteractive.bg_fill;

        egui::Frame::none()
            .inner_margin(egui::Margin::same(14.0))
            .stroke(stroke)
            .fill(bg)
            .show(ui, |ui| {
                ui.vertical(|ui| {
                    ui.label(egui::RichText::new(title).strong().size(18.0));
                    ui.add_space(6.0);
                    add_contents(ui)
                })
                .inner
            })
            .inner
    }

    pub fn status_banner(ui: &mut egui::Ui, text: &str, colors: (egui::Color32, egui::Color32)) {
        let (bg_color, text_color) = colors;
        ui.add_sized(
            [ui.available_width(), 32.0],
            egui::Label::new(
                egui::RichText::new(text)
                    .color(text_color)
                    .background_color(bg_color)
                    .size(16.0)
                    .strong(),
            )
            .wrap_mode(egui::TextWrapMode::Extend),
        );
    }

    pub fn severity_color(severity: MessageSeverity) -> egui::Color32 {
        match severity {
            MessageSeverity::Info => egui::Color32::from_rgb(40, 90, 220),
            MessageSeverity::Success => egui::Color32::from_rgb(0, 150, 0),
            MessageSeverity::Warning => egui::Color32::from_rgb(200, 150, 0),
            MessageSeverity::Error => egui::Color32::RED,
        }
    }

    /// Name, address and major class on one line; buttons go in `actions`.
    pub fn device_row(
        ui: &mut egui::Ui,
        device: &DeviceRecord,
        tag: Option<&str>,
        actions: impl FnOnce(&mut egui::Ui),
    ) {
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new(&device.name).strong());
            ui.label(egui::RichText::new(&device.address).monospace());
            ui.label(egui::RichText::new(device.major_class().label()).weak());
            if let Some(tag) = tag {
                ui.label(egui::RichText::new(tag).italics());
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), actions);
        });
    }
}
