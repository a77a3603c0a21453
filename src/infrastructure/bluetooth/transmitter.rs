//! Command Transmitter
//!
//! Writes one text command to the resolved channel. Without a channel the
//! command is only logged and still reported as sent.

use crate::infrastructure::bluetooth::platform::ChannelHandle;
use crate::infrastructure::bluetooth::protocol;
use tracing::{debug, error, info};

/// Send `text` as one line. Returns `false` only when a real write failed.
pub async fn send(channel: Option<&dyn ChannelHandle>, text: &str) -> bool {
    let Some(channel) = channel else {
        info!("[Bluetooth Simulation] Sending: {}", text);
        return true;
    };

    let bytes = protocol::encode_command(text);
    match channel.write_bytes(&bytes).await {
        Ok(()) => {
            debug!("Wrote {} bytes to {}", bytes.len(), channel.uuid());
            true
        }
        Err(e) => {
            error!("Failed to send data: {}", e);
            false
        }
    }
}
