use crate::domain::models::{BluetoothCommand, DeviceRecord, DiscoveryState};
use crate::presentation::app::{BluetoothApp, RadioStatus};
use crate::presentation::components::Components;
use crate::presentation::theme::banner;
use eframe::egui;

const RADIO_WAIT_MS: u64 = 30_000;

enum RowAction {
    Pair(String),
    Unpair(String),
    Save(DeviceRecord),
}

pub fn render(app: &mut BluetoothApp, ui: &mut egui::Ui) {
    Components::heading(ui, "Bluetooth Printers");
    ui.add_space(20.0);

    ui_status_panel(app, ui);

    let mut actions = Vec::new();

    ui_radio_panel(app, ui);
    ui.add_space(15.0);

    ui_saved_panel(app, ui, &mut actions);
    ui.add_space(15.0);

    ui_discovery_panel(app, ui, &mut actions);
    ui.add_space(15.0);

    ui_paired_panel(app, ui, &mut actions);
    ui.add_space(15.0);

    ui_sweep_panel(app, ui, &mut actions);
    ui.add_space(15.0);

    ui_manual_pair_panel(app, ui);

    for action in actions {
        match action {
            RowAction::Pair(address) => app.send(BluetoothCommand::Pair(address)),
            RowAction::Unpair(address) => app.send(BluetoothCommand::Unpair(address)),
            RowAction::Save(device) => app.save_device(device),
        }
    }
}

fn ui_status_panel(app: &BluetoothApp, ui: &mut egui::Ui) {
    if let Some(msg) = &app.board.status {
        ui.label(
            egui::RichText::new(&msg.message)
                .color(Components::severity_color(msg.severity))
                .strong(),
        );
        ui.add_space(10.0);
    }
}

fn ui_radio_panel(app: &mut BluetoothApp, ui: &mut egui::Ui) {
    Components::card(ui, "Radio", |ui| {
        let (text, colors) = match app.board.radio {
            RadioStatus::Enabled => ("BLUETOOTH ON", banner::OK),
            RadioStatus::Disabled => ("BLUETOOTH OFF", banner::OFF),
            RadioStatus::Missing => ("NO ADAPTER", banner::FAIL),
            RadioStatus::Unknown => ("CHECKING...", banner::BUSY),
        };
        Components::status_banner(ui, text, colors);

        if app.board.radio == RadioStatus::Disabled {
            ui.label("Switch Bluetooth on in the system settings.");
            if ui.button("Wait for Bluetooth (30s)").clicked() {
                app.send(BluetoothCommand::WaitForRadio(RADIO_WAIT_MS));
            }
        }

        ui.horizontal(|ui| {
            if ui.button("Check Radio").clicked() {
                app.send(BluetoothCommand::CheckEnabled);
            }
            if ui.button("Refresh Paired").clicked() {
                app.send(BluetoothCommand::GetPairedDevices);
            }
        });
    });
}

fn ui_saved_panel(app: &mut BluetoothApp, ui: &mut egui::Ui, actions: &mut Vec<RowAction>) {
    let saved = app.settings.get().saved_device.clone();
    let mut forget = false;

    Components::card(ui, "Default Printer", |ui| match &saved {
        Some(device) => {
            let tag = app.board.is_paired(&device.address).then_some("paired");
            Components::device_row(ui, device, tag, |ui| {
                if ui.button("Forget").clicked() {
                    forget = true;
                }
                if tag.is_none() && ui.button("Pair").clicked() {
                    actions.push(RowAction::Pair(device.address.clone()));
                }
            });
        }
        None => {
            ui.label("No printer saved yet. Pick one from the lists below.");
        }
    });

    if forget {
        app.forget_device();
    }
}

fn ui_discovery_panel(app: &mut BluetoothApp, ui: &mut egui::Ui, actions: &mut Vec<RowAction>) {
    let mut start = false;

    Components::card(ui, "Nearby Devices", |ui| {
        ui.horizontal(|ui| {
            if app.board.discovery == DiscoveryState::Scanning {
                if ui.button("Stop Discovery").clicked() {
                    app.send(BluetoothCommand::StopDiscovery);
                }
                ui.spinner();
            } else if ui.button("Start Discovery").clicked() {
                start = true;
            }
        });

        let printers_only = app.settings.get().discovery.printer_filter;
        let visible: Vec<&DeviceRecord> = app
            .board
            .found
            .iter()
            .filter(|d| !printers_only || d.is_likely_printer())
            .collect();

        if visible.is_empty() {
            return;
        }

        ui.separator();
        egui::ScrollArea::vertical()
            .id_salt("found_devices")
            .max_height(180.0)
            .show(ui, |ui| {
                for device in visible {
                    let paired = app.board.is_paired(&device.address);
                    Components::device_row(ui, device, paired.then_some("paired"), |ui| {
                        if ui.button("Save").clicked() {
                            actions.push(RowAction::Save(device.clone()));
                        }
                        if !paired && ui.button("Pair").clicked() {
                            actions.push(RowAction::Pair(device.address.clone()));
                        }
                    });
                }
            });
    });

    if start {
        app.start_discovery();
    }
}

fn ui_paired_panel(app: &BluetoothApp, ui: &mut egui::Ui, actions: &mut Vec<RowAction>) {
    Components::card(ui, "Paired Devices", |ui| {
        if app.board.paired.is_empty() {
            ui.label("No paired devices.");
            return;
        }
        for device in &app.board.paired {
            Components::device_row(ui, device, None, |ui| {
                if ui.button("Save").clicked() {
                    actions.push(RowAction::Save(device.clone()));
                }
                if ui.button("Unpair").clicked() {
                    actions.push(RowAction::Unpair(device.address.clone()));
                }
            });
        }
    });
}

fn ui_sweep_panel(app: &mut BluetoothApp, ui: &mut egui::Ui, actions: &mut Vec<RowAction>) {
    let mut start = false;
    let window = app.settings.get().discovery.scan_window().as_secs();

    Components::card(ui, "Printer Sweep", |ui| {
        ui.horizontal(|ui| {
            if app.board.sweep_running {
                ui.spinner();
                ui.label(format!("Listening for {}s...", window));
            } else if ui.button(format!("Sweep ({}s)", window)).clicked() {
                start = true;
            }
        });

        for swept in &app.board.sweep_results {
            let tag = swept.paired.then_some("paired");
            Components::device_row(ui, &swept.record, tag, |ui| {
                if ui.button("Save").clicked() {
                    actions.push(RowAction::Save(swept.record.clone()));
                }
                if !swept.paired && ui.button("Pair").clicked() {
                    actions.push(RowAction::Pair(swept.record.address.clone()));
                }
            });
        }
    });

    if start {
        app.start_sweep();
    }
}

fn ui_manual_pair_panel(app: &mut BluetoothApp, ui: &mut egui::Ui) {
    Components::card(ui, "Pair by Address", |ui| {
        ui.horizontal(|ui| {
            ui.label("Address:");
            ui.text_edit_singleline(&mut app.address_input);
            if ui.button("Pair").clicked() {
                let address = app.address_input.trim().to_string();
                if !address.is_empty() {
                    app.send(BluetoothCommand::Pair(address));
                }
            }
        });
    });
}
