//! Bluetooth Service Module
//!
//! Connection lifecycle manager. Owns the session and the published
//! connection state, runs the discovery handshake, and reacts to
//! disconnection notifications.

use crate::domain::models::{AppEvent, ConnectionState, MessageSeverity, StatusMessage};
use crate::infrastructure::bluetooth::connection::{
    self, ConnectionConfig, LiveSession, Session,
};
use crate::infrastructure::bluetooth::platform::{
    BluetoothPlatform, LinkError, RequestDeviceOptions,
};
use crate::infrastructure::bluetooth::{resolver, transmitter};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Main Bluetooth service coordinating all BLE operations
pub struct BluetoothService {
    platform: Option<Arc<dyn BluetoothPlatform>>,
    config: ConnectionConfig,
    session: Session,
    state: ConnectionState,
    next_session_id: u64,
    event_sender: mpsc::UnboundedSender<AppEvent>,
}

impl BluetoothService {
    /// Create a new Bluetooth service. `platform` is `None` on hosts without
    /// a scanning facility.
    pub fn new(
        platform: Option<Arc<dyn BluetoothPlatform>>,
        config: ConnectionConfig,
        event_sender: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            platform,
            config,
            session: Session::empty(),
            state: ConnectionState::disconnected(),
            next_session_id: 1,
            event_sender,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn device_name(&self) -> Option<String> {
        self.session.device().and_then(|d| d.name())
    }

    /// Discover a peripheral, open a session and resolve the write channel.
    ///
    /// Publishes `Connecting` before any I/O, then exactly one terminal
    /// state. Nothing is retried.
    pub async fn connect(&mut self) -> ConnectionState {
        if let Some(server) = self.session.server() {
            connection::disconnect(server.as_ref());
        }
        self.replace(Session::empty(), ConnectionState::connecting());
        self.send_log("Connecting to device...", MessageSeverity::Info);

        match self.establish().await {
            Ok(session) => {
                let message = match (session.device().and_then(|d| d.name()), session.channel()) {
                    (Some(name), Some(_)) => format!("Connected to {}", name),
                    (Some(name), None) => {
                        format!("Connected to {} (no writable characteristic, simulating)", name)
                    }
                    (None, _) => "Connected".to_string(),
                };
                info!("{}", message);
                self.replace(session, ConnectionState::connected());
                self.send_log(&message, MessageSeverity::Success);
            }
            Err(e) => {
                error!("Connection failed: {}", e);
                self.replace(Session::empty(), ConnectionState::error(e.to_string()));
                self.send_log(&format!("Connection failed: {}", e), MessageSeverity::Error);
            }
        }

        self.state.clone()
    }

    async fn establish(&mut self) -> Result<Session, LinkError> {
        let platform = self.platform.clone().ok_or(LinkError::UnsupportedPlatform)?;

        let options = RequestDeviceOptions {
            accept_all_devices: true,
            optional_services: self.config.optional_services(),
        };
        debug!(
            accept_all = options.accept_all_devices,
            services = options.optional_services.len(),
            "Requesting device"
        );
        let device = platform.request_device(&options).await?;
        info!("Device selected: {:?}", device.name());

        let server = device
            .open_session()
            .await
            .map_err(|e| match e {
                LinkError::SessionFailure(_) => e,
                other => LinkError::SessionFailure(other.to_string()),
            })?
            .ok_or_else(|| LinkError::SessionFailure("no GATT session".to_string()))?;
        if !server.is_active() {
            return Err(LinkError::SessionFailure("session is not active".to_string()));
        }

        let channel = match resolver::resolve(server.as_ref(), &self.config.channel_ids).await {
            Ok(channel) => channel,
            Err(e) => {
                connection::disconnect(server.as_ref());
                return Err(e);
            }
        };

        let session_id = self.next_session_id;
        self.next_session_id += 1;

        let sender = self.event_sender.clone();
        let subscription = connection::observe_disconnection(&device, move || {
            let _ = sender.send(AppEvent::DeviceDisconnected { session_id });
        })
        .inspect_err(|_| connection::disconnect(server.as_ref()))?;

        // A drop before the listener existed would otherwise go unnoticed
        if !server.is_active() {
            return Err(LinkError::SessionFailure(
                "link dropped while resolving the channel".to_string(),
            ));
        }

        Ok(Session::live(LiveSession::new(
            session_id,
            device,
            server,
            channel,
            subscription,
        )))
    }

    /// Apply a disconnection notification raised for `session_id`.
    ///
    /// Notifications for a session that has already been replaced are
    /// ignored; otherwise the session is cleared and `Disconnected` published.
    pub fn handle_disconnection(&mut self, session_id: u64) -> &ConnectionState {
        if self.session.id() != Some(session_id) {
            warn!("Ignoring disconnection of stale session {}", session_id);
            return &self.state;
        }

        let reason = LinkError::PeripheralDisconnected.to_string();
        info!("{}", reason);
        self.replace(Session::empty(), ConnectionState::device_lost());
        self.send_log(&reason, MessageSeverity::Warning);
        &self.state
    }

    /// Close the current GATT session and publish `Disconnected`.
    ///
    /// Dropping the session releases the device and channel handles, so the
    /// platform is free to tear the link down. A disconnection notification
    /// raised by the close arrives for a session that no longer exists and
    /// is ignored.
    pub fn disconnect(&mut self) {
        let Some(server) = self.session.server() else {
            info!("Disconnect requested with no session");
            return;
        };
        connection::disconnect(server.as_ref());

        info!("Disconnected by user");
        self.replace(Session::empty(), ConnectionState::disconnected());
        self.send_log("Disconnected", MessageSeverity::Info);
    }

    /// Send one command over the current channel (simulated without one)
    pub async fn send(&self, text: &str) -> bool {
        let channel = self.session.channel().map(|c| c.as_ref());
        transmitter::send(channel, text).await
    }

    fn replace(&mut self, session: Session, state: ConnectionState) {
        self.session = session;
        self.state = state;
        let _ = self
            .event_sender
            .send(AppEvent::ConnectionStatus(self.state.clone()));
    }

    fn send_log(&self, message: &str, severity: MessageSeverity) {
        let _ = self.event_sender.send(AppEvent::LogMessage(StatusMessage {
            message: message.to_string(),
            severity,
        }));
    }
}
