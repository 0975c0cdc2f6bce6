use crate::domain::models::DeviceRecord;
use crate::domain::permissions::{AssumeGranted, GrantedPermissions, Permission, PermissionGate};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_true")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_true")]
    pub show_file_line: bool,
    #[serde(default = "default_false")]
    pub show_thread_ids: bool,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging_enabled: default_true(),
            console_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_file_line: default_true(),
            show_thread_ids: default_false(),
            show_target: default_true(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "bluetooth_pairing".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverySettings {
    /// How long a sweep listens for found devices.
    #[serde(default = "default_scan_window_ms")]
    pub scan_window_ms: u64,
    /// Drop devices whose major class can't be a printer.
    #[serde(default = "default_true")]
    pub printer_filter: bool,
    /// Seed sweep results with already bonded devices.
    #[serde(default = "default_true")]
    pub include_paired: bool,
}

impl DiscoverySettings {
    pub fn scan_window(&self) -> Duration {
        Duration::from_millis(self.scan_window_ms)
    }
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            scan_window_ms: default_scan_window_ms(),
            printer_filter: default_true(),
            include_paired: default_true(),
        }
    }
}

fn default_scan_window_ms() -> u64 {
    8000
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub log_settings: LogSettings,

    #[serde(default)]
    pub discovery: DiscoverySettings,

    /// Device the user picked last; survives restarts.
    #[serde(default)]
    pub saved_device: Option<DeviceRecord>,

    /// Grants confirmed by the host. `None` leaves enforcement to the OS.
    #[serde(default)]
    pub granted_permissions: Option<Vec<Permission>>,
}

impl Settings {
    pub fn permission_gate(&self) -> Arc<dyn PermissionGate> {
        match &self.granted_permissions {
            Some(granted) => Arc::new(GrantedPermissions::new(granted.iter().copied())),
            None => Arc::new(AssumeGranted),
        }
    }
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        Ok(Self::with_path(settings_path))
    }

    /// Load from an explicit file, falling back to defaults if it is missing
    /// or unreadable.
    pub fn with_path(settings_path: PathBuf) -> Self {
        let settings = match Self::load_from_file(&settings_path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::debug!(
                    "Using default settings ({}): {}",
                    settings_path.display(),
                    e
                );
                Settings::default()
            }
        };

        Self {
            settings,
            settings_path,
        }
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("BluetoothPairing");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &Path) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn save_device(&mut self, device: DeviceRecord) -> anyhow::Result<()> {
        if self.settings.saved_device.as_ref() != Some(&device) {
            self.settings.saved_device = Some(device);
            self.save()?;
        }
        Ok(())
    }

    pub fn forget_device(&mut self) -> anyhow::Result<()> {
        if self.settings.saved_device.take().is_some() {
            self.save()?;
        }
        Ok(())
    }
}
