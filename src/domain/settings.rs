use crate::domain::peripherals::{CommandMode, FailurePolicy};
use crate::infrastructure::bluetooth::profile;
use crate::infrastructure::link::ConflictPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
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
    "matata_link".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

/// BLE link and correlator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkSettings {
    #[serde(default = "default_service_uuid")]
    pub service_uuid: String,
    #[serde(default = "default_write_uuid")]
    pub write_char_uuid: String,
    #[serde(default = "default_notify_uuid")]
    pub notify_char_uuid: String,
    /// Timeout for link-level requests such as the handshake
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
    /// Write size used when the platform does not report the MTU
    #[serde(default = "default_write_chunk_size")]
    pub write_chunk_size: usize,
    #[serde(default = "default_true")]
    pub handshake_on_greeting: bool,
    #[serde(default = "default_notification_retries")]
    pub notification_retries: u32,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            service_uuid: default_service_uuid(),
            write_char_uuid: default_write_uuid(),
            notify_char_uuid: default_notify_uuid(),
            request_timeout_ms: default_request_timeout_ms(),
            conflict_policy: ConflictPolicy::default(),
            write_chunk_size: default_write_chunk_size(),
            handshake_on_greeting: default_true(),
            notification_retries: default_notification_retries(),
        }
    }
}

impl LinkSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Sensor read behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadSettings {
    #[serde(default = "default_read_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_sentinel")]
    pub on_failure: FailurePolicy,
}

impl Default for ReadSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_read_timeout_ms(),
            on_failure: default_sentinel(),
        }
    }
}

/// Actuator command behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandSettings {
    #[serde(default)]
    pub mode: CommandMode,
    #[serde(default = "default_ack_timeout_ms")]
    pub ack_timeout_ms: u64,
    #[serde(default = "default_propagate")]
    pub on_failure: FailurePolicy,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            mode: CommandMode::default(),
            ack_timeout_ms: default_ack_timeout_ms(),
            on_failure: default_propagate(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub log_settings: LogSettings,
    #[serde(default)]
    pub link: LinkSettings,
    #[serde(default)]
    pub sensors: ReadSettings,
    #[serde(default)]
    pub commands: CommandSettings,
    #[serde(default)]
    pub known_bluetooth_addresses: Vec<u64>,
    #[serde(default)]
    pub last_connected_address: Option<u64>,
}

fn default_service_uuid() -> String {
    profile::SERVICE_UUID.to_string()
}
fn default_write_uuid() -> String {
    profile::WRITE_CHAR_UUID.to_string()
}
fn default_notify_uuid() -> String {
    profile::NOTIFY_CHAR_UUID.to_string()
}
fn default_request_timeout_ms() -> u64 {
    1000
}
fn default_write_chunk_size() -> usize {
    crate::infrastructure::link::packet::DEFAULT_CHUNK_SIZE
}
fn default_notification_retries() -> u32 {
    3
}
fn default_read_timeout_ms() -> u64 {
    500
}
fn default_ack_timeout_ms() -> u64 {
    2000
}
fn default_sentinel() -> FailurePolicy {
    FailurePolicy::Sentinel
}
fn default_propagate() -> FailurePolicy {
    FailurePolicy::Propagate
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

    /// Load from an explicit file, falling back to defaults when it is missing or invalid
    pub fn with_path(settings_path: PathBuf) -> Self {
        let settings = match Self::load_from_file(&settings_path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::debug!("Using default settings ({}): {}", settings_path.display(), e);
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
        path.push("MatataLink");
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

    pub fn add_known_address(&mut self, address: u64) -> anyhow::Result<()> {
        if !self.settings.known_bluetooth_addresses.contains(&address) {
            self.settings.known_bluetooth_addresses.push(address);
        }
        self.settings.last_connected_address = Some(address);
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{ "sensors": { "timeout_ms": 250 } }"#).unwrap();
        assert_eq!(settings.sensors.timeout_ms, 250);
        assert_eq!(settings.sensors.on_failure, FailurePolicy::Sentinel);
        assert_eq!(settings.commands.on_failure, FailurePolicy::Propagate);
        assert_eq!(settings.commands.mode, CommandMode::FireAndForget);
        assert_eq!(settings.link.conflict_policy, ConflictPolicy::Reject);
        assert_eq!(settings.link.service_uuid, profile::SERVICE_UUID);
        assert_eq!(settings.link.notify_char_uuid, profile::NOTIFY_CHAR_UUID);
        assert_eq!(settings.log_settings.level, "info");
    }

    #[test]
    fn test_policies_serialize_as_snake_case() {
        let mut settings = Settings::default();
        settings.link.conflict_policy = ConflictPolicy::Replace;
        settings.commands.mode = CommandMode::Acknowledged;
        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json["link"]["conflict_policy"], "replace");
        assert_eq!(json["commands"]["mode"], "acknowledged");
        assert_eq!(json["sensors"]["on_failure"], "sentinel");
    }

    #[test]
    fn test_save_and_reload() {
        let path = std::env::temp_dir().join(format!(
            "matata_link_settings_{}.json",
            std::process::id()
        ));
        let mut service = SettingsService::with_path(path.clone());
        service.add_known_address(0xAABBCCDDEEFF).unwrap();

        let reloaded = SettingsService::with_path(path.clone());
        assert_eq!(reloaded.get().last_connected_address, Some(0xAABBCCDDEEFF));
        assert_eq!(reloaded.get().known_bluetooth_addresses, vec![0xAABBCCDDEEFF]);
        let _ = fs::remove_file(path);
    }
}
