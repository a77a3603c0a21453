//! Remote Link Protocol
//!
//! Identifiers and wire format used to talk to the controlled peripheral.
//! Commands are plain text lines written to a single characteristic.

use anyhow::Result;
use uuid::Uuid;

/// Nordic UART Service, the well-known transport service
pub const UART_SERVICE_UUID: Uuid = Uuid::from_u128(0x6E400001_B5A3_F393_E0A9_E50E24DCCA9E);

/// UART TX characteristic - where commands are written
pub const UART_TX_CHAR_UUID: Uuid = Uuid::from_u128(0x6E400002_B5A3_F393_E0A9_E50E24DCCA9E);

/// Generic Access service (0x1800)
pub const GENERIC_ACCESS_UUID: Uuid = Uuid::from_u128(0x00001800_0000_1000_8000_00805f9b34fb);

/// Appended to every command before it is written
pub const LINE_TERMINATOR: char = '\n';

/// Write capabilities advertised by a characteristic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteFlags {
    pub write: bool,
    pub write_without_response: bool,
}

impl WriteFlags {
    /// Whether the characteristic accepts outbound writes of either kind
    pub fn is_writable(&self) -> bool {
        self.write || self.write_without_response
    }
}

/// Encode a command as the bytes sent over the link: the text plus a line
/// terminator, UTF-8 encoded.
pub fn encode_command(text: &str) -> Vec<u8> {
    let mut line = String::with_capacity(text.len() + 1);
    line.push_str(text);
    line.push(LINE_TERMINATOR);
    line.into_bytes()
}

/// Parse a UUID string from settings
pub fn parse_uuid(uuid_str: &str) -> Result<Uuid> {
    Uuid::parse_str(uuid_str.trim())
        .map_err(|e| anyhow::anyhow!("Invalid UUID '{}': {}", uuid_str, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uuid() {
        let uuid = parse_uuid(" 6e400001-b5a3-f393-e0a9-e50e24dcca9e ").unwrap();
        assert_eq!(uuid, UART_SERVICE_UUID);
        assert!(parse_uuid("not-a-uuid").is_err());
    }

    #[test]
    fn test_generic_access_uuid() {
        assert_eq!(
            GENERIC_ACCESS_UUID.to_string(),
            "00001800-0000-1000-8000-00805f9b34fb"
        );
    }

    #[test]
    fn test_encode_command_appends_newline() {
        assert_eq!(encode_command("FOO"), b"FOO\n".to_vec());
        assert_eq!(encode_command(""), b"\n".to_vec());
    }

    #[test]
    fn test_write_flags() {
        assert!(!WriteFlags::default().is_writable());
        assert!(WriteFlags { write: true, write_without_response: false }.is_writable());
        assert!(WriteFlags { write: false, write_without_response: true }.is_writable());
    }
}
