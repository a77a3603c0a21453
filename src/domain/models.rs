use std::fmt;

/// Maximum number of characters of a device name shown in the panel header
pub const DEVICE_NAME_DISPLAY_LEN: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        };
        f.write_str(text)
    }
}

/// Published connection state: exactly one status plus an optional message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionState {
    pub status: ConnectionStatus,
    pub error_message: Option<String>,
}

impl ConnectionState {
    pub fn disconnected() -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            error_message: None,
        }
    }

    pub fn connecting() -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            error_message: None,
        }
    }

    pub fn connected() -> Self {
        Self {
            status: ConnectionStatus::Connected,
            error_message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ConnectionStatus::Error,
            error_message: Some(message.into()),
        }
    }

    /// Peripheral-initiated disconnection
    pub fn device_lost() -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            error_message: Some("Device disconnected.".to_string()),
        }
    }

    /// Whether the panel should accept button presses in this state
    pub fn accepts_commands(&self) -> bool {
        self.status != ConnectionStatus::Connecting
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::disconnected()
    }
}

/// A peripheral seen while scanning, offered to the device picker
#[cfg(any(windows, test))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedDevice {
    pub id: String,
    pub name: String,
    pub address: u64,
    pub signal_strength: i16,
}

/// One labeled grid button and the value it stands for
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridValue {
    pub id: &'static str,
    pub label: &'static str,
    pub value: f64,
}

#[derive(Debug, Clone)]
pub enum AppEvent {
    ConnectionStatus(ConnectionState),
    LogMessage(StatusMessage),
    /// Raised by the platform when the peripheral of session `session_id` dropped
    DeviceDisconnected { session_id: u64 },
    /// Advisory note for the button `label`, delivered after the press
    AdvisoryText {
        label: &'static str,
        text: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub message: String,
    pub severity: MessageSeverity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Info,
    Success,
    Warning,
    Error,
}

/// Name shown next to the connection indicator
pub fn device_display_name(name: Option<&str>) -> String {
    match name {
        Some(name) if !name.is_empty() => name.chars().take(DEVICE_NAME_DISPLAY_LEN).collect(),
        _ => "No Device".to_string(),
    }
}
