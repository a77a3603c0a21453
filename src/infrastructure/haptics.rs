//! Haptic feedback after a button press. Fire-and-forget.

use std::io::Write;
use std::time::Duration;
use tracing::trace;

/// Pulse length used after a command is sent
pub const PRESS_PULSE: Duration = Duration::from_millis(20);

pub trait Haptics: Send + Sync {
    fn pulse(&self, duration: Duration);
}

/// Host without a vibration motor
pub struct Unsupported;

impl Haptics for Unsupported {
    fn pulse(&self, duration: Duration) {
        trace!("Haptics unsupported, skipping {:?} pulse", duration);
    }
}

/// Terminal bell as the closest thing a console has to a vibration
pub struct TerminalBell;

impl Haptics for TerminalBell {
    fn pulse(&self, _duration: Duration) {
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(b"\x07").and_then(|_| stdout.flush());
    }
}

pub fn from_settings(enabled: bool) -> Box<dyn Haptics> {
    if enabled {
        Box::new(TerminalBell)
    } else {
        Box::new(Unsupported)
    }
}
