//! BLE Scanner Module
//!
//! Streams advertising peripherals to the device picker while a chooser is
//! open.

use crate::domain::models::ScannedDevice;
use anyhow::Result;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::info;
use windows::Devices::Bluetooth::Advertisement::{
    BluetoothLEAdvertisementReceivedEventArgs, BluetoothLEAdvertisementWatcher,
    BluetoothLEScanningMode,
};
use windows::Foundation::TypedEventHandler;

/// BLE Scanner for discovering peripherals
pub struct BleScanner {
    watcher: Option<BluetoothLEAdvertisementWatcher>,
}

impl BleScanner {
    pub fn new() -> Self {
        Self { watcher: None }
    }

    /// Start scanning; every peripheral is reported once, unfiltered.
    pub fn start(&mut self, sender: mpsc::UnboundedSender<ScannedDevice>) -> Result<()> {
        self.stop()?;

        info!("Starting BLE scan (all devices)");

        let watcher = BluetoothLEAdvertisementWatcher::new()?;
        watcher.SetScanningMode(BluetoothLEScanningMode::Active)?;

        let seen = Arc::new(Mutex::new(HashSet::new()));
        let handler = TypedEventHandler::new(
            move |_: windows::core::Ref<BluetoothLEAdvertisementWatcher>,
                  args: windows::core::Ref<BluetoothLEAdvertisementReceivedEventArgs>| {
                if let Some(args) = args.as_ref() {
                    let address = args.BluetoothAddress()?;
                    let first_sighting = seen
                        .lock()
                        .map(|mut seen| seen.insert(address))
                        .unwrap_or(false);
                    if !first_sighting {
                        return Ok(());
                    }

                    let name = args.Advertisement()?.LocalName()?.to_string();
                    let rssi = args.RawSignalStrengthInDBm()?;

                    let device = ScannedDevice {
                        id: format!("{:012X}", address),
                        name: if name.is_empty() {
                            "Unknown".to_string()
                        } else {
                            name
                        },
                        address,
                        signal_strength: rssi,
                    };

                    let _ = sender.send(device);
                }
                Ok(())
            },
        );

        watcher.Received(&handler)?;
        watcher.Start()?;
        self.watcher = Some(watcher);

        Ok(())
    }

    /// Stop scanning
    pub fn stop(&mut self) -> Result<()> {
        if let Some(watcher) = self.watcher.take() {
            info!("Stopping BLE scan...");
            watcher.Stop()?;
        }
        Ok(())
    }
}

impl Drop for BleScanner {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
