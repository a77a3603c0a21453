//! Terminal input shared by the panel and the device picker.
//!
//! The picker is only built where a scanning backend exists.

#[cfg(any(windows, test))]
use crate::domain::models::ScannedDevice;
#[cfg(windows)]
use crate::infrastructure::bluetooth::platform::DevicePicker;
#[cfg(windows)]
use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
#[cfg(windows)]
use tokio::sync::mpsc;

pub type ConsoleInput = Arc<Mutex<Lines<BufReader<Stdin>>>>;

pub fn stdin_lines() -> ConsoleInput {
    Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()).lines()))
}

/// Next line from the terminal, `None` on EOF or read error
pub async fn next_line(input: &ConsoleInput) -> Option<String> {
    input.lock().await.next_line().await.ok().flatten()
}

#[cfg(any(windows, test))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Cancel,
    Pick(usize),
    Invalid,
}

/// Interpret a picker line against `available` listed devices (1-based)
#[cfg(any(windows, test))]
pub fn parse_choice(line: &str, available: usize) -> Choice {
    let line = line.trim();
    if line.is_empty() || line.eq_ignore_ascii_case("cancel") {
        return Choice::Cancel;
    }
    match line.parse::<usize>() {
        Ok(n) if (1..=available).contains(&n) => Choice::Pick(n - 1),
        _ => Choice::Invalid,
    }
}

#[cfg(any(windows, test))]
pub fn describe_device(index: usize, device: &ScannedDevice) -> String {
    format!(
        "  [{}] {} ({}, {} dBm)",
        index + 1,
        device.name,
        device.id,
        device.signal_strength
    )
}

/// Lists peripherals as they are discovered and lets the user choose one
#[cfg(windows)]
pub struct ConsolePicker {
    input: ConsoleInput,
}

#[cfg(windows)]
impl ConsolePicker {
    pub fn new(input: ConsoleInput) -> Self {
        Self { input }
    }
}

#[cfg(windows)]
#[async_trait]
impl DevicePicker for ConsolePicker {
    async fn pick(
        &self,
        mut found: mpsc::UnboundedReceiver<ScannedDevice>,
    ) -> Option<ScannedDevice> {
        println!("Scanning for devices. Enter a number to connect, or an empty line to cancel.");
        let mut devices: Vec<ScannedDevice> = Vec::new();

        loop {
            tokio::select! {
                Some(device) = found.recv() => {
                    println!("{}", describe_device(devices.len(), &device));
                    devices.push(device);
                }
                line = next_line(&self.input) => {
                    match parse_choice(&line?, devices.len()) {
                        Choice::Cancel => return None,
                        Choice::Pick(index) => return devices.get(index).cloned(),
                        Choice::Invalid => println!("Pick a number between 1 and {}", devices.len()),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_choice() {
        assert_eq!(parse_choice("", 3), Choice::Cancel);
        assert_eq!(parse_choice(" cancel ", 3), Choice::Cancel);
        assert_eq!(parse_choice("1", 3), Choice::Pick(0));
        assert_eq!(parse_choice("3", 3), Choice::Pick(2));
        assert_eq!(parse_choice("4", 3), Choice::Invalid);
        assert_eq!(parse_choice("0", 3), Choice::Invalid);
        assert_eq!(parse_choice("1", 0), Choice::Invalid);
        assert_eq!(parse_choice("pump", 3), Choice::Invalid);
    }

    #[test]
    fn test_describe_device() {
        let device = ScannedDevice {
            id: "AABBCCDDEEFF".to_string(),
            name: "Pump".to_string(),
            address: 0xAABBCCDDEEFF,
            signal_strength: -61,
        };
        assert_eq!(describe_device(0, &device), "  [1] Pump (AABBCCDDEEFF, -61 dBm)");
    }
}
