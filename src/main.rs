use bluetooth_pairing::domain::settings::SettingsService;
use bluetooth_pairing::presentation::app::BluetoothApp;
use eframe::egui;

fn main() -> anyhow::Result<()> {
    let settings = SettingsService::new()?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([820.0, 720.0])
            .with_title("Bluetooth Printer Pairing"),
        ..Default::default()
    };

    eframe::run_native(
        "Bluetooth Printer Pairing",
        options,
        Box::new(|cc| Ok(Box::new(BluetoothApp::new(cc, settings)))),
    )
    .map_err(|e| anyhow::anyhow!("UI failed: {}", e))
}
