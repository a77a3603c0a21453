//! In-memory peripheral used by the link tests.

use crate::infrastructure::bluetooth::platform::{
    BluetoothPlatform, ChannelHandle, DeviceHandle, DisconnectListener, LinkError, ListenerId,
    RequestDeviceOptions, ServiceHandle, SessionHandle,
};
use crate::infrastructure::bluetooth::protocol::WriteFlags;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Clone)]
pub struct SimCharacteristic {
    uuid: Uuid,
    flags: WriteFlags,
    fail_writes: bool,
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl SimCharacteristic {
    pub fn new(uuid: Uuid, flags: WriteFlags) -> Self {
        Self {
            uuid,
            flags,
            fail_writes: false,
            writes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChannelHandle for SimCharacteristic {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn write_flags(&self) -> WriteFlags {
        self.flags
    }

    async fn write_bytes(&self, bytes: &[u8]) -> Result<(), LinkError> {
        if self.fail_writes {
            return Err(LinkError::WriteFailure("GATT operation failed".to_string()));
        }
        self.writes.lock().unwrap().push(bytes.to_vec());
        Ok(())
    }
}

#[derive(Clone)]
pub struct SimService {
    uuid: Uuid,
    characteristics: Vec<SimCharacteristic>,
}

impl SimService {
    pub fn new(uuid: Uuid) -> Self {
        Self {
            uuid,
            characteristics: Vec::new(),
        }
    }

    pub fn with(mut self, characteristic: SimCharacteristic) -> Self {
        self.characteristics.push(characteristic);
        self
    }
}

#[async_trait]
impl ServiceHandle for SimService {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    async fn get_characteristic(&self, uuid: Uuid) -> Result<Arc<dyn ChannelHandle>, LinkError> {
        self.characteristics
            .iter()
            .find(|c| c.uuid == uuid)
            .map(|c| Arc::new(c.clone()) as Arc<dyn ChannelHandle>)
            .ok_or_else(|| LinkError::Gatt(format!("No characteristic matching {}", uuid)))
    }

    async fn get_all_characteristics(&self) -> Result<Vec<Arc<dyn ChannelHandle>>, LinkError> {
        Ok(self
            .characteristics
            .iter()
            .map(|c| Arc::new(c.clone()) as Arc<dyn ChannelHandle>)
            .collect())
    }
}

/// How `open_session` behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Active,
    Missing,
    Inactive,
    Refused,
}

struct SimState {
    name: String,
    services: Mutex<Vec<SimService>>,
    session_mode: Mutex<SessionMode>,
    fail_enumeration: AtomicBool,
    silent_close: AtomicBool,
    drop_on_lookup: AtomicBool,
    active: AtomicBool,
    enumerations: AtomicUsize,
    closes: AtomicUsize,
    next_listener: AtomicI64,
    listeners: Mutex<BTreeMap<i64, DisconnectListener>>,
}

#[derive(Clone)]
pub struct SimPeripheral {
    state: Arc<SimState>,
}

impl SimPeripheral {
    pub fn new(name: &str) -> Self {
        Self {
            state: Arc::new(SimState {
                name: name.to_string(),
                services: Mutex::new(Vec::new()),
                session_mode: Mutex::new(SessionMode::Active),
                fail_enumeration: AtomicBool::new(false),
                silent_close: AtomicBool::new(false),
                drop_on_lookup: AtomicBool::new(false),
                active: AtomicBool::new(false),
                enumerations: AtomicUsize::new(0),
                closes: AtomicUsize::new(0),
                next_listener: AtomicI64::new(1),
                listeners: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    pub fn with_service(self, service: SimService) -> Self {
        self.state.services.lock().unwrap().push(service);
        self
    }

    pub fn with_session_mode(self, mode: SessionMode) -> Self {
        *self.state.session_mode.lock().unwrap() = mode;
        self
    }

    pub fn failing_enumeration(self) -> Self {
        self.state.fail_enumeration.store(true, Ordering::SeqCst);
        self
    }

    /// Closing the session ends it without raising a disconnection
    pub fn silent_close(self) -> Self {
        self.state.silent_close.store(true, Ordering::SeqCst);
        self
    }

    /// The link drops while the channel is being looked up
    pub fn dropping_during_lookup(self) -> Self {
        self.state.drop_on_lookup.store(true, Ordering::SeqCst);
        self
    }

    /// A session handle on this peripheral, marked active
    pub fn session(&self) -> Arc<dyn SessionHandle> {
        self.state.active.store(true, Ordering::SeqCst);
        Arc::new(SimSession {
            peripheral: self.clone(),
        })
    }

    pub fn enumeration_count(&self) -> usize {
        self.state.enumerations.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    pub fn listener_count(&self) -> usize {
        self.state.listeners.lock().unwrap().len()
    }

    pub fn is_active(&self) -> bool {
        self.state.active.load(Ordering::SeqCst)
    }

    /// Simulate the peripheral dropping the link
    pub fn drop_link(&self) {
        self.state.active.store(false, Ordering::SeqCst);
        let listeners: Vec<DisconnectListener> =
            self.state.listeners.lock().unwrap().values().cloned().collect();
        for listener in listeners {
            listener();
        }
    }
}

#[async_trait]
impl DeviceHandle for SimPeripheral {
    fn id(&self) -> String {
        format!("sim-{}", self.state.name)
    }

    fn name(&self) -> Option<String> {
        Some(self.state.name.clone())
    }

    async fn open_session(&self) -> Result<Option<Arc<dyn SessionHandle>>, LinkError> {
        let mode = *self.state.session_mode.lock().unwrap();
        match mode {
            SessionMode::Active => Ok(Some(self.session())),
            SessionMode::Missing => Ok(None),
            SessionMode::Inactive => Ok(Some(Arc::new(SimSession {
                peripheral: self.clone(),
            }))),
            SessionMode::Refused => Err(LinkError::SessionFailure("connection refused".to_string())),
        }
    }

    fn on_disconnected(&self, listener: DisconnectListener) -> Result<ListenerId, LinkError> {
        let id = self.state.next_listener.fetch_add(1, Ordering::SeqCst);
        self.state.listeners.lock().unwrap().insert(id, listener);
        Ok(ListenerId(id))
    }

    fn off_disconnected(&self, id: ListenerId) {
        self.state.listeners.lock().unwrap().remove(&id.0);
    }
}

struct SimSession {
    peripheral: SimPeripheral,
}

#[async_trait]
impl SessionHandle for SimSession {
    async fn get_service(&self, uuid: Uuid) -> Result<Arc<dyn ServiceHandle>, LinkError> {
        if self.peripheral.state.drop_on_lookup.load(Ordering::SeqCst) {
            self.peripheral.drop_link();
        }
        self.peripheral
            .state
            .services
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.uuid == uuid)
            .map(|s| Arc::new(s.clone()) as Arc<dyn ServiceHandle>)
            .ok_or_else(|| LinkError::Gatt(format!("No service matching {}", uuid)))
    }

    async fn get_all_services(&self) -> Result<Vec<Arc<dyn ServiceHandle>>, LinkError> {
        let state = &self.peripheral.state;
        state.enumerations.fetch_add(1, Ordering::SeqCst);
        if state.fail_enumeration.load(Ordering::SeqCst) {
            return Err(LinkError::Gatt("service enumeration failed".to_string()));
        }
        Ok(state
            .services
            .lock()
            .unwrap()
            .iter()
            .map(|s| Arc::new(s.clone()) as Arc<dyn ServiceHandle>)
            .collect())
    }

    fn is_active(&self) -> bool {
        self.peripheral.is_active()
    }

    fn close(&self) {
        let state = &self.peripheral.state;
        state.closes.fetch_add(1, Ordering::SeqCst);
        if state.silent_close.load(Ordering::SeqCst) {
            state.active.store(false, Ordering::SeqCst);
        } else {
            self.peripheral.drop_link();
        }
    }
}

/// Platform whose chooser always returns the configured peripheral
#[derive(Default)]
pub struct SimPlatform {
    device: Mutex<Option<SimPeripheral>>,
    requests: Mutex<Vec<RequestDeviceOptions>>,
}

impl SimPlatform {
    pub fn new(device: Option<SimPeripheral>) -> Self {
        Self {
            device: Mutex::new(device),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn set_device(&self, device: Option<SimPeripheral>) {
        *self.device.lock().unwrap() = device;
    }

    pub fn requests(&self) -> Vec<RequestDeviceOptions> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl BluetoothPlatform for SimPlatform {
    async fn request_device(
        &self,
        options: &RequestDeviceOptions,
    ) -> Result<Arc<dyn DeviceHandle>, LinkError> {
        self.requests.lock().unwrap().push(options.clone());
        self.device
            .lock()
            .unwrap()
            .clone()
            .map(|device| Arc::new(device) as Arc<dyn DeviceHandle>)
            .ok_or_else(LinkError::no_device_selected)
    }
}
