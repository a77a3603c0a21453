use crate::infrastructure::bluetooth::protocol::{UART_SERVICE_UUID, UART_TX_CHAR_UUID};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

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
    #[serde(default = "default_false")]
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
            show_file_line: default_false(),
            show_thread_ids: default_false(),
            show_target: default_true(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
        }
    }
}

/// Identifiers of the well-known write channel tried before the fallback scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportSettings {
    #[serde(default = "default_service_uuid")]
    pub service_uuid: String,
    #[serde(default = "default_write_char_uuid")]
    pub write_char_uuid: String,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            service_uuid: default_service_uuid(),
            write_char_uuid: default_write_char_uuid(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorySettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Upper bound on one advisory request, in seconds
    #[serde(default = "default_advisory_timeout")]
    pub timeout_secs: u64,
}

impl Default for AdvisorySettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            model: default_model(),
            endpoint: default_endpoint(),
            timeout_secs: default_advisory_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub log_settings: LogSettings,
    #[serde(default)]
    pub transport: TransportSettings,
    #[serde(default)]
    pub advisory: AdvisorySettings,
    #[serde(default = "default_false")]
    pub haptics_enabled: bool,
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
    "grid_remote".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}
fn default_service_uuid() -> String {
    UART_SERVICE_UUID.to_string()
}
fn default_write_char_uuid() -> String {
    UART_TX_CHAR_UUID.to_string()
}
fn default_model() -> String {
    "gemini-3-flash-preview".to_string()
}
fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_advisory_timeout() -> u64 {
    10
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        let settings = Self::load_from_file(&settings_path).unwrap_or_default();

        Ok(Self {
            settings,
            settings_path,
        })
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("GridRemote");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &PathBuf) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    /// Write the current settings, creating the file on first run
    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn path(&self) -> &PathBuf {
        &self.settings_path
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::bluetooth::protocol;

    #[test]
    fn test_partial_file_fills_defaults() {
        let json = r#"{ "transport": { "service_uuid": "0000ffe0-0000-1000-8000-00805f9b34fb" } }"#;
        let settings: Settings = serde_json::from_str(json).unwrap();

        assert_eq!(
            settings.transport.service_uuid,
            "0000ffe0-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(
            settings.transport.write_char_uuid,
            "6e400002-b5a3-f393-e0a9-e50e24dcca9e"
        );
        assert_eq!(settings.log_settings.file_name_prefix, "grid_remote");
        assert!(settings.advisory.enabled);
        assert_eq!(settings.advisory.timeout_secs, 10);
        assert!(!settings.haptics_enabled);
    }

    #[test]
    fn test_default_transport_matches_uart_ids() {
        let transport = TransportSettings::default();
        assert_eq!(
            protocol::parse_uuid(&transport.service_uuid).unwrap(),
            UART_SERVICE_UUID
        );
        assert_eq!(
            protocol::parse_uuid(&transport.write_char_uuid).unwrap(),
            UART_TX_CHAR_UUID
        );
        assert_eq!(transport.service_uuid, "6e400001-b5a3-f393-e0a9-e50e24dcca9e");
    }

    #[test]
    fn test_settings_roundtrip_through_json() {
        let mut settings = Settings::default();
        settings.advisory.model = "custom-model".to_string();
        settings.log_settings.rotation = "never".to_string();

        let json = serde_json::to_string_pretty(&settings).unwrap();
        let loaded: Settings = serde_json::from_str(&json).unwrap();

        assert_eq!(loaded.advisory.model, "custom-model");
        assert_eq!(loaded.log_settings.rotation, "never");
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        let path = std::env::temp_dir().join("grid_remote_missing_settings.json");
        let _ = fs::remove_file(&path);
        assert!(SettingsService::load_from_file(&path).is_err());
    }
}
