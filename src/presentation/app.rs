use crate::domain::error::BluetoothError;
use crate::domain::models::{
    AppEvent, BluetoothCommand, CommandReply, DeviceRecord, DiscoveryState, MessageSeverity,
    StatusMessage, SweptDevice, Tab,
};
use crate::domain::settings::SettingsService;
use crate::infrastructure::bluetooth::spawn_worker;
use crate::infrastructure::logging::{init_logger, LoggingGuard};
use eframe::egui;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, trace};

/// Radio as last reported by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioStatus {
    Unknown,
    Enabled,
    Disabled,
    Missing,
}

/// Everything the device screens render, fed only by [`AppEvent`]s.
#[derive(Debug)]
pub struct DeviceBoard {
    pub radio: RadioStatus,
    pub discovery: DiscoveryState,
    pub paired: Vec<DeviceRecord>,
    /// Found devices of the current session, one entry per address.
    pub found: Vec<DeviceRecord>,
    pub sweep_results: Vec<SweptDevice>,
    pub sweep_running: bool,
    pub status: Option<StatusMessage>,
    /// Set when a bond finished and the paired list is stale.
    pub paired_stale: bool,
}

impl Default for DeviceBoard {
    fn default() -> Self {
        Self {
            radio: RadioStatus::Unknown,
            discovery: DiscoveryState::Idle,
            paired: Vec::new(),
            found: Vec::new(),
            sweep_results: Vec::new(),
            sweep_running: false,
            status: None,
            paired_stale: false,
        }
    }
}

impl DeviceBoard {
    pub(crate) fn notify(&mut self, message: impl Into<String>, severity: MessageSeverity) {
        self.status = Some(StatusMessage {
            message: message.into(),
            severity,
        });
    }

    pub fn apply(&mut self, event: AppEvent) {
        match event {
            AppEvent::DeviceFound(record) => {
                // The radio may report a device several times per inquiry.
                match self.found.iter_mut().find(|d| d.address == record.address) {
                    Some(existing) => *existing = record,
                    None => self.found.push(record),
                }
            }
            AppEvent::DiscoveryState(state) => self.discovery = state,
            AppEvent::DiscoveryFinished => {
                self.notify(
                    format!("Inquiry finished, {} devices nearby", self.found.len()),
                    MessageSeverity::Info,
                );
            }
            AppEvent::BondStateChanged { address, bonded } => {
                self.paired_stale = true;
                if bonded {
                    self.notify(format!("Paired with {}", address), MessageSeverity::Success);
                } else {
                    self.notify(
                        format!("Pairing with {} did not complete", address),
                        MessageSeverity::Warning,
                    );
                }
            }
            AppEvent::RadioStateChanged { enabled } => {
                if enabled {
                    self.radio = RadioStatus::Enabled;
                    self.paired_stale = true;
                    self.notify("Bluetooth switched on", MessageSeverity::Success);
                } else {
                    self.radio = RadioStatus::Disabled;
                    self.notify("Bluetooth switched off", MessageSeverity::Warning);
                }
            }
            AppEvent::CommandResult(Ok(reply)) => self.apply_reply(reply),
            AppEvent::CommandResult(Err(e)) => {
                self.sweep_running = false;
                if e == BluetoothError::NoRadio {
                    self.radio = RadioStatus::Missing;
                }
            }
            AppEvent::LogMessage(msg) => self.status = Some(msg),
        }
    }

    fn apply_reply(&mut self, reply: CommandReply) {
        match reply {
            CommandReply::RadioEnabled(enabled) => {
                self.radio = if enabled {
                    RadioStatus::Enabled
                } else {
                    RadioStatus::Disabled
                };
            }
            CommandReply::PairedDevices(devices) => {
                self.paired = devices;
                self.paired_stale = false;
            }
            CommandReply::DiscoveryStarted(accepted) => {
                if !accepted {
                    self.notify(
                        "Radio declined the scan request. Is Bluetooth on?",
                        MessageSeverity::Warning,
                    );
                }
            }
            CommandReply::DiscoveryStopped(_) => {}
            CommandReply::PairRequested { address, initiated } => {
                if initiated {
                    self.notify(
                        format!("Pairing with {} started, confirm on the device if asked", address),
                        MessageSeverity::Info,
                    );
                } else {
                    self.notify(
                        format!("{} was not paired (already bonded or refused)", address),
                        MessageSeverity::Warning,
                    );
                }
            }
            CommandReply::UnpairRequested { address, performed } => {
                if !performed {
                    self.notify(
                        format!("Unpairing is not supported here; remove {} in system settings", address),
                        MessageSeverity::Warning,
                    );
                }
            }
            CommandReply::SweepCompleted(devices) => {
                self.sweep_running = false;
                self.notify(
                    format!("Sweep complete, {} devices", devices.len()),
                    MessageSeverity::Success,
                );
                self.sweep_results = devices;
            }
        }
    }

    pub fn is_paired(&self, address: &str) -> bool {
        self.paired.iter().any(|d| d.address == address)
    }
}

pub struct BluetoothApp {
    pub(crate) settings: SettingsService,

    // Bluetooth
    pub(crate) bluetooth_tx: Option<mpsc::UnboundedSender<BluetoothCommand>>,
    pub(crate) events_rx: mpsc::UnboundedReceiver<AppEvent>,

    pub(crate) board: DeviceBoard,

    // UI State
    pub(crate) selected_tab: Tab,
    pub(crate) address_input: String,
    pub(crate) is_dark_mode: bool,

    pub(crate) _logging_guard: Option<LoggingGuard>,
}

impl BluetoothApp {
    pub fn new(cc: &eframe::CreationContext<'_>, settings: SettingsService) -> Self {
        crate::presentation::theme::apply_theme(&cc.egui_ctx, false);

        let logging_guard = init_logger(&settings.get().log_settings)
            .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
            .ok();

        info!("Starting Bluetooth pairing host");

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut board = DeviceBoard::default();

        let bluetooth_tx = match spawn_worker(
            settings.get().permission_gate(),
            settings.get().discovery.clone(),
            events_tx,
        ) {
            Ok(tx) => Some(tx),
            Err(e) => {
                error!("Failed to start Bluetooth worker: {}", e);
                board.notify(
                    format!("Bluetooth worker failed to start: {}", e),
                    MessageSeverity::Error,
                );
                None
            }
        };

        let app = Self {
            settings,
            bluetooth_tx,
            events_rx,
            board,
            selected_tab: Tab::Devices,
            address_input: String::new(),
            is_dark_mode: false,
            _logging_guard: logging_guard,
        };

        app.send(BluetoothCommand::CheckEnabled);
        app.send(BluetoothCommand::GetPairedDevices);
        app
    }

    pub(crate) fn send(&self, command: BluetoothCommand) {
        if let Some(tx) = &self.bluetooth_tx {
            if tx.send(command).is_err() {
                error!("Bluetooth worker is gone");
            }
        }
    }

    pub(crate) fn start_discovery(&mut self) {
        self.board.found.clear();
        self.send(BluetoothCommand::StartDiscovery);
    }

    pub(crate) fn start_sweep(&mut self) {
        self.board.sweep_running = true;
        self.board.sweep_results.clear();
        self.send(BluetoothCommand::Sweep);
    }

    pub(crate) fn save_device(&mut self, device: DeviceRecord) {
        let name = device.name.clone();
        match self.settings.save_device(device) {
            Ok(()) => self
                .board
                .notify(format!("{} saved as default printer", name), MessageSeverity::Success),
            Err(e) => {
                error!("Failed to save device: {}", e);
                self.board
                    .notify(format!("Could not save device: {}", e), MessageSeverity::Error);
            }
        }
    }

    pub(crate) fn forget_device(&mut self) {
        if let Err(e) = self.settings.forget_device() {
            error!("Failed to forget device: {}", e);
            self.board
                .notify(format!("Could not forget device: {}", e), MessageSeverity::Error);
        }
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            if let Some((name, payload)) = event.to_host_event() {
                trace!("{} {}", name, payload);
            }
            self.board.apply(event);
        }

        if self.board.paired_stale {
            self.board.paired_stale = false;
            self.send(BluetoothCommand::GetPairedDevices);
        }
    }
}

impl eframe::App for BluetoothApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();

        if self.board.discovery == DiscoveryState::Scanning || self.board.sweep_running {
            ctx.request_repaint_after(Duration::from_millis(100));
        } else {
            ctx.request_repaint_after(Duration::from_millis(500));
        }

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.selectable_value(&mut self.selected_tab, Tab::Devices, "Devices");
                ui.selectable_value(&mut self.selected_tab, Tab::Settings, "Settings");

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let switch_icon = if self.is_dark_mode { "☀ Light" } else { "🌙 Dark" };
                    if ui.button(switch_icon).clicked() {
                        self.is_dark_mode = !self.is_dark_mode;
                        crate::presentation::theme::apply_theme(ctx, self.is_dark_mode);
                    }
                });
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.vertical_centered(|ui| {
                    ui.set_max_width(800.0);
                    ui.add_space(20.0);

                    use crate::presentation::tabs;
                    match self.selected_tab {
                        Tab::Devices => tabs::devices::render(self, ui),
                        Tab::Settings => tabs::settings::render(self, ui),
                    }

                    ui.add_space(50.0);
                });
            });
        });
    }
}
