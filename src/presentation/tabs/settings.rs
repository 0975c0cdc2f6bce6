use crate::domain::models::MessageSeverity;
use crate::domain::permissions::Permission;
use crate::presentation::app::BluetoothApp;
use crate::presentation::components::Components;
use eframe::egui;

const ALL_PERMISSIONS: [Permission; 3] = [
    Permission::BluetoothScan,
    Permission::BluetoothConnect,
    Permission::Location,
];

pub fn render(app: &mut BluetoothApp, ui: &mut egui::Ui) {
    Components::heading(ui, "Settings");
    ui.add_space(20.0);

    let settings_mut = app.settings.get_mut();

    Components::card(ui, "Discovery", |ui| {
        ui.horizontal(|ui| {
            ui.label("Sweep Window (ms):");
            ui.add(egui::Slider::new(&mut settings_mut.discovery.scan_window_ms, 2000..=30000));
        });
        ui.checkbox(
            &mut settings_mut.discovery.printer_filter,
            "Hide devices that can't be printers",
        );
        ui.checkbox(
            &mut settings_mut.discovery.include_paired,
            "Include paired devices in sweeps",
        );
    });

    ui.add_space(10.0);

    Components::card(ui, "Permissions", |ui| {
        let mut enforce = settings_mut.granted_permissions.is_some();
        if ui
            .checkbox(&mut enforce, "Check grants before radio calls")
            .changed()
        {
            settings_mut.granted_permissions = enforce.then(|| ALL_PERMISSIONS.to_vec());
        }

        if let Some(granted) = &mut settings_mut.granted_permissions {
            ui.indent("grants", |ui| {
                for permission in ALL_PERMISSIONS {
                    let mut on = granted.contains(&permission);
                    if ui.checkbox(&mut on, permission.label()).changed() {
                        if on {
                            granted.push(permission);
                        } else {
                            granted.retain(|p| *p != permission);
                        }
                    }
                }
            });
        }
    });

    ui.add_space(10.0);

    Components::card(ui, "Logging", |ui| {
        ui.horizontal(|ui| {
            ui.label("Verbosity Level:");
            egui::ComboBox::from_id_salt("log_level")
                .selected_text(&settings_mut.log_settings.level)
                .show_ui(ui, |ui| {
                    for level in &["trace", "debug", "info", "warn", "error"] {
                        ui.selectable_value(
                            &mut settings_mut.log_settings.level,
                            level.to_string(),
                            *level,
                        );
                    }
                });
        });

        ui.checkbox(
            &mut settings_mut.log_settings.console_logging_enabled,
            "Console Logs",
        );
        ui.checkbox(
            &mut settings_mut.log_settings.file_logging_enabled,
            "File Logs",
        );

        if settings_mut.log_settings.file_logging_enabled {
            ui.indent("file_logs", |ui| {
                ui.horizontal(|ui| {
                    ui.label("Directory:");
                    ui.text_edit_singleline(&mut settings_mut.log_settings.log_dir);
                });
                ui.horizontal(|ui| {
                    ui.label("Rotation:");
                    egui::ComboBox::from_id_salt("log_rot")
                        .selected_text(&settings_mut.log_settings.rotation)
                        .show_ui(ui, |ui| {
                            for rot in &["daily", "hourly", "never"] {
                                ui.selectable_value(
                                    &mut settings_mut.log_settings.rotation,
                                    rot.to_string(),
                                    *rot,
                                );
                            }
                        });
                });
            });
        }
    });

    ui.add_space(10.0);

    ui.label(
        egui::RichText::new("Changes apply after a restart.")
            .italics()
            .size(12.0),
    );
    if ui.button("Save Settings").clicked() {
        match app.settings.save() {
            Ok(()) => app.board.notify("Settings saved", MessageSeverity::Success),
            Err(e) => {
                tracing::error!("Failed to save settings: {}", e);
                app.board
                    .notify(format!("Could not save settings: {}", e), MessageSeverity::Error);
            }
        }
    }

    if let Some(msg) = &app.board.status {
        ui.label(
            egui::RichText::new(&msg.message).color(Components::severity_color(msg.severity)),
        );
    }
}
