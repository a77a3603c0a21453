//! WinRT backend
//!
//! Implements the platform handle traits on top of
//! `Windows.Devices.Bluetooth`.

use crate::infrastructure::bluetooth::platform::{
    BluetoothPlatform, ChannelHandle, DeviceHandle, DevicePicker, DisconnectListener, LinkError,
    ListenerId, RequestDeviceOptions, ServiceHandle, SessionHandle,
};
use crate::infrastructure::bluetooth::protocol::WriteFlags;
use crate::infrastructure::bluetooth::scanner::BleScanner;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use windows::core::GUID;
use windows::Devices::Bluetooth::GenericAttributeProfile::{
    GattCharacteristic, GattCharacteristicProperties, GattCommunicationStatus, GattDeviceService,
    GattSession, GattSessionStatus, GattWriteOption,
};
use windows::Devices::Bluetooth::{BluetoothAdapter, BluetoothConnectionStatus, BluetoothLEDevice};
use windows::Foundation::TypedEventHandler;
use windows::Storage::Streams::DataWriter;

fn to_guid(uuid: Uuid) -> GUID {
    GUID::from_u128(uuid.as_u128())
}

fn to_uuid(guid: GUID) -> Uuid {
    Uuid::from_u128(guid.to_u128())
}

fn gatt_error(e: windows::core::Error) -> LinkError {
    LinkError::Gatt(e.to_string())
}

pub struct WinRtPlatform {
    picker: Arc<dyn DevicePicker>,
}

impl WinRtPlatform {
    /// Returns `None` when the host has no LE-capable adapter
    pub async fn detect(picker: Arc<dyn DevicePicker>) -> Option<Self> {
        let adapter = match BluetoothAdapter::GetDefaultAsync() {
            Ok(op) => op.await.ok()?,
            Err(e) => {
                warn!("Bluetooth adapter lookup failed: {}", e);
                return None;
            }
        };
        if !adapter.IsLowEnergySupported().unwrap_or(false) {
            warn!("Default Bluetooth adapter does not support LE");
            return None;
        }
        info!("Using default Bluetooth LE adapter");
        Some(Self { picker })
    }
}

#[async_trait]
impl BluetoothPlatform for WinRtPlatform {
    async fn request_device(
        &self,
        options: &RequestDeviceOptions,
    ) -> Result<Arc<dyn DeviceHandle>, LinkError> {
        let (sender, found) = mpsc::unbounded_channel();
        let mut scanner = BleScanner::new();
        scanner
            .start(sender)
            .map_err(|e| LinkError::DiscoveryAborted(format!("Scan failed: {}", e)))?;

        let chosen = self.picker.pick(found).await;
        if let Err(e) = scanner.stop() {
            warn!("Failed to stop scan: {}", e);
        }
        let chosen = chosen.ok_or_else(LinkError::no_device_selected)?;

        info!("Connecting to Bluetooth device: {:#X}", chosen.address);
        let device = BluetoothLEDevice::FromBluetoothAddressAsync(chosen.address)
            .map_err(gatt_error)?
            .await
            .map_err(gatt_error)?;

        Ok(Arc::new(WinDevice {
            device,
            allowed_services: options.optional_services.clone(),
        }))
    }
}

struct WinDevice {
    device: BluetoothLEDevice,
    allowed_services: Vec<Uuid>,
}

#[async_trait]
impl DeviceHandle for WinDevice {
    fn id(&self) -> String {
        self.device
            .BluetoothAddress()
            .map(|address| format!("{:012X}", address))
            .unwrap_or_default()
    }

    fn name(&self) -> Option<String> {
        self.device
            .Name()
            .ok()
            .map(|name| name.to_string())
            .filter(|name| !name.is_empty())
    }

    async fn open_session(&self) -> Result<Option<Arc<dyn SessionHandle>>, LinkError> {
        let device_id = self.device.BluetoothDeviceId().map_err(gatt_error)?;
        let session = GattSession::FromDeviceIdAsync(&device_id)
            .map_err(gatt_error)?
            .await
            .map_err(gatt_error)?;
        session.SetMaintainConnection(true).map_err(gatt_error)?;

        // MaintainConnection brings the link up asynchronously; the services
        // query forces it before the session is reported.
        let services = self
            .device
            .GetGattServicesAsync()
            .map_err(gatt_error)?
            .await
            .map_err(gatt_error)?;
        if services.Status().map_err(gatt_error)? != GattCommunicationStatus::Success {
            return Ok(None);
        }

        Ok(Some(Arc::new(WinSession {
            device: self.device.clone(),
            session,
            allowed_services: self.allowed_services.clone(),
        })))
    }

    fn on_disconnected(&self, listener: DisconnectListener) -> Result<ListenerId, LinkError> {
        let handler =
            TypedEventHandler::new(move |dev: windows::core::Ref<BluetoothLEDevice>, _| {
                if let Some(dev) = dev.as_ref() {
                    if dev.ConnectionStatus()? == BluetoothConnectionStatus::Disconnected {
                        listener();
                    }
                }
                Ok(())
            });
        let token = self
            .device
            .ConnectionStatusChanged(&handler)
            .map_err(gatt_error)?;
        Ok(ListenerId(token))
    }

    fn off_disconnected(&self, id: ListenerId) {
        if let Err(e) = self.device.RemoveConnectionStatusChanged(id.0) {
            warn!("Failed to remove disconnection listener: {}", e);
        }
    }
}

struct WinSession {
    device: BluetoothLEDevice,
    session: GattSession,
    allowed_services: Vec<Uuid>,
}

impl WinSession {
    async fn wrap_service(&self, service: GattDeviceService) -> Arc<dyn ServiceHandle> {
        let uuid = service.Uuid().map(to_uuid).unwrap_or_default();
        if self.allowed_services.contains(&uuid) {
            match service.RequestAccessAsync() {
                Ok(op) => match op.await {
                    Ok(status) => debug!("Service {} access status: {:?}", uuid, status),
                    Err(e) => warn!("Service {} access request failed: {}", uuid, e),
                },
                Err(e) => warn!("Service {} access request failed: {}", uuid, e),
            }
        }
        Arc::new(WinService { service, uuid })
    }
}

#[async_trait]
impl SessionHandle for WinSession {
    async fn get_service(&self, uuid: Uuid) -> Result<Arc<dyn ServiceHandle>, LinkError> {
        let result = self
            .device
            .GetGattServicesForUuidAsync(to_guid(uuid))
            .map_err(gatt_error)?
            .await
            .map_err(gatt_error)?;
        let status = result.Status().map_err(gatt_error)?;
        if status != GattCommunicationStatus::Success {
            return Err(LinkError::Gatt(format!(
                "Failed to get service {}: {:?}",
                uuid, status
            )));
        }

        let services = result.Services().map_err(gatt_error)?;
        if services.Size().map_err(gatt_error)? == 0 {
            return Err(LinkError::Gatt(format!("No service matching {}", uuid)));
        }
        let service = services.GetAt(0).map_err(gatt_error)?;
        Ok(self.wrap_service(service).await)
    }

    async fn get_all_services(&self) -> Result<Vec<Arc<dyn ServiceHandle>>, LinkError> {
        let result = self
            .device
            .GetGattServicesAsync()
            .map_err(gatt_error)?
            .await
            .map_err(gatt_error)?;
        let status = result.Status().map_err(gatt_error)?;
        if status != GattCommunicationStatus::Success {
            return Err(LinkError::Gatt(format!(
                "Failed to get GATT services: {:?}",
                status
            )));
        }

        let services = result.Services().map_err(gatt_error)?;
        let count = services.Size().map_err(gatt_error)?;
        info!("Found {} services", count);

        let mut handles = Vec::with_capacity(count as usize);
        for i in 0..count {
            let service = services.GetAt(i).map_err(gatt_error)?;
            handles.push(self.wrap_service(service).await);
        }
        Ok(handles)
    }

    fn is_active(&self) -> bool {
        self.session
            .SessionStatus()
            .map(|s| s == GattSessionStatus::Active)
            .unwrap_or(false)
    }

    fn close(&self) {
        if let Err(e) = self.session.Close() {
            warn!("Failed to close GATT session: {}", e);
        }
    }
}

struct WinService {
    service: GattDeviceService,
    uuid: Uuid,
}

#[async_trait]
impl ServiceHandle for WinService {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    async fn get_characteristic(&self, uuid: Uuid) -> Result<Arc<dyn ChannelHandle>, LinkError> {
        let result = self
            .service
            .GetCharacteristicsForUuidAsync(to_guid(uuid))
            .map_err(gatt_error)?
            .await
            .map_err(gatt_error)?;
        if result.Status().map_err(gatt_error)? != GattCommunicationStatus::Success {
            return Err(LinkError::Gatt("Failed to get characteristics".to_string()));
        }

        let characteristics = result.Characteristics().map_err(gatt_error)?;
        if characteristics.Size().map_err(gatt_error)? == 0 {
            return Err(LinkError::Gatt(format!("No characteristic matching {}", uuid)));
        }
        let characteristic = characteristics.GetAt(0).map_err(gatt_error)?;
        Ok(Arc::new(WinChannel::new(characteristic)))
    }

    async fn get_all_characteristics(&self) -> Result<Vec<Arc<dyn ChannelHandle>>, LinkError> {
        let result = self
            .service
            .GetCharacteristicsAsync()
            .map_err(gatt_error)?
            .await
            .map_err(gatt_error)?;
        if result.Status().map_err(gatt_error)? != GattCommunicationStatus::Success {
            return Err(LinkError::Gatt("Failed to get characteristics".to_string()));
        }

        let characteristics = result.Characteristics().map_err(gatt_error)?;
        let count = characteristics.Size().map_err(gatt_error)?;
        debug!("Service {} has {} characteristics", self.uuid, count);

        (0..count)
            .map(|i| {
                characteristics
                    .GetAt(i)
                    .map(|c| Arc::new(WinChannel::new(c)) as Arc<dyn ChannelHandle>)
                    .map_err(gatt_error)
            })
            .collect()
    }
}

struct WinChannel {
    characteristic: GattCharacteristic,
    uuid: Uuid,
    flags: WriteFlags,
}

impl WinChannel {
    fn new(characteristic: GattCharacteristic) -> Self {
        let uuid = characteristic.Uuid().map(to_uuid).unwrap_or_default();
        let props = characteristic
            .CharacteristicProperties()
            .map(|p| p.0)
            .unwrap_or(0);
        let flags = WriteFlags {
            write: props & GattCharacteristicProperties::Write.0 != 0,
            write_without_response: props & GattCharacteristicProperties::WriteWithoutResponse.0
                != 0,
        };
        Self {
            characteristic,
            uuid,
            flags,
        }
    }
}

#[async_trait]
impl ChannelHandle for WinChannel {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn write_flags(&self) -> WriteFlags {
        self.flags
    }

    async fn write_bytes(&self, bytes: &[u8]) -> Result<(), LinkError> {
        let write_error = |e: windows::core::Error| LinkError::WriteFailure(e.to_string());

        let writer = DataWriter::new().map_err(write_error)?;
        writer.WriteBytes(bytes).map_err(write_error)?;
        let buffer = writer.DetachBuffer().map_err(write_error)?;

        let option = if self.flags.write {
            GattWriteOption::WriteWithResponse
        } else {
            GattWriteOption::WriteWithoutResponse
        };
        let status = self
            .characteristic
            .WriteValueWithOptionAsync(&buffer, option)
            .map_err(write_error)?
            .await
            .map_err(write_error)?;

        if status != GattCommunicationStatus::Success {
            return Err(LinkError::WriteFailure(format!("{:?}", status)));
        }
        Ok(())
    }
}
