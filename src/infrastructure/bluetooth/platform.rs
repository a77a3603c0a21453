//! Platform Bluetooth surface
//!
//! One trait per handle kind handed out by the host's Bluetooth stack. The
//! lifecycle manager and the channel resolver only ever see these traits, so
//! a platform backend (or a simulated peripheral in tests) plugs in behind
//! them.

#[cfg(windows)]
use crate::domain::models::ScannedDevice;
use crate::infrastructure::bluetooth::protocol::WriteFlags;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
#[cfg(windows)]
use tokio::sync::mpsc;
use uuid::Uuid;

/// Failures produced by the wireless link
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("Bluetooth is not supported on this host.")]
    UnsupportedPlatform,

    // Raised by the platform backends and the simulated peripheral
    #[cfg_attr(not(any(windows, test)), allow(dead_code))]
    #[error("{0}")]
    DiscoveryAborted(String),

    #[error("Could not connect to GATT server: {0}")]
    SessionFailure(String),

    #[cfg_attr(not(any(windows, test)), allow(dead_code))]
    #[error("GATT error: {0}")]
    Gatt(String),

    #[cfg_attr(not(any(windows, test)), allow(dead_code))]
    #[error("Failed to send data: {0}")]
    WriteFailure(String),

    #[error("Device disconnected.")]
    PeripheralDisconnected,
}

impl LinkError {
    #[cfg(any(windows, test))]
    pub fn no_device_selected() -> Self {
        Self::DiscoveryAborted("No device selected.".to_string())
    }
}

/// Constraints passed to the platform chooser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDeviceOptions {
    /// Offer every advertising peripheral, no filter
    pub accept_all_devices: bool,
    /// Services the platform must allow access to once connected
    pub optional_services: Vec<Uuid>,
}

/// Registration token returned by [`DeviceHandle::on_disconnected`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub i64);

pub type DisconnectListener = Arc<dyn Fn() + Send + Sync>;

/// The host's wireless-scan facility
#[async_trait]
pub trait BluetoothPlatform: Send + Sync {
    async fn request_device(
        &self,
        options: &RequestDeviceOptions,
    ) -> Result<Arc<dyn DeviceHandle>, LinkError>;
}

/// A physical peripheral
#[async_trait]
pub trait DeviceHandle: Send + Sync {
    fn id(&self) -> String;

    fn name(&self) -> Option<String>;

    /// Open a GATT session; `None` when the platform yields no session
    async fn open_session(&self) -> Result<Option<Arc<dyn SessionHandle>>, LinkError>;

    fn on_disconnected(&self, listener: DisconnectListener) -> Result<ListenerId, LinkError>;

    fn off_disconnected(&self, id: ListenerId);
}

/// An open GATT session to a peripheral
#[async_trait]
pub trait SessionHandle: Send + Sync {
    async fn get_service(&self, uuid: Uuid) -> Result<Arc<dyn ServiceHandle>, LinkError>;

    async fn get_all_services(&self) -> Result<Vec<Arc<dyn ServiceHandle>>, LinkError>;

    fn is_active(&self) -> bool;

    fn close(&self);
}

#[async_trait]
pub trait ServiceHandle: Send + Sync {
    fn uuid(&self) -> Uuid;

    async fn get_characteristic(&self, uuid: Uuid) -> Result<Arc<dyn ChannelHandle>, LinkError>;

    async fn get_all_characteristics(&self) -> Result<Vec<Arc<dyn ChannelHandle>>, LinkError>;
}

/// A characteristic; the resolved one is the outbound command channel
#[async_trait]
pub trait ChannelHandle: Send + Sync {
    fn uuid(&self) -> Uuid;

    fn write_flags(&self) -> WriteFlags;

    async fn write_bytes(&self, bytes: &[u8]) -> Result<(), LinkError>;
}

/// The chooser shown while scanning. Receives peripherals as they are
/// discovered and returns the one the user picked, or `None` on cancel.
#[cfg(windows)]
#[async_trait]
pub trait DevicePicker: Send + Sync {
    async fn pick(&self, found: mpsc::UnboundedReceiver<ScannedDevice>) -> Option<ScannedDevice>;
}

/// Locate the host's scanning facility, if it has one
#[cfg(windows)]
pub async fn detect(picker: Arc<dyn DevicePicker>) -> Option<Arc<dyn BluetoothPlatform>> {
    crate::infrastructure::bluetooth::winrt::WinRtPlatform::detect(picker)
        .await
        .map(|platform| Arc::new(platform) as Arc<dyn BluetoothPlatform>)
}

/// Locate the host's scanning facility, if it has one
#[cfg(not(windows))]
pub fn detect() -> Option<Arc<dyn BluetoothPlatform>> {
    tracing::warn!("No Bluetooth backend is available for this host");
    None
}
