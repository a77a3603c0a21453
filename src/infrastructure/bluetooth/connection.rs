//! BLE Connection Module
//!
//! The session bundle owned by the lifecycle manager, disconnection
//! subscriptions, and session teardown.

use crate::infrastructure::bluetooth::platform::{
    ChannelHandle, DeviceHandle, LinkError, ListenerId, SessionHandle,
};
use crate::infrastructure::bluetooth::protocol::GENERIC_ACCESS_UUID;
use crate::infrastructure::bluetooth::resolver::ChannelIds;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Configuration for connection behavior
#[derive(Debug, Clone, Default)]
pub struct ConnectionConfig {
    /// Well-known write channel tried before the fallback scan
    pub channel_ids: ChannelIds,
}

impl ConnectionConfig {
    /// Services the platform must grant access to after discovery
    pub fn optional_services(&self) -> Vec<Uuid> {
        vec![self.channel_ids.service, GENERIC_ACCESS_UUID]
    }
}

/// Cancellation handle for a disconnection listener. Dropping it
/// deregisters the listener.
pub struct DisconnectSubscription {
    device: Arc<dyn DeviceHandle>,
    id: Option<ListenerId>,
}

impl DisconnectSubscription {
    pub fn cancel(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(id) = self.id.take() {
            debug!("Removing disconnection listener from {}", self.device.id());
            self.device.off_disconnected(id);
        }
    }
}

impl Drop for DisconnectSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

/// Register `on_disconnect` for peripheral-initiated disconnections of
/// `device`. Exactly one listener is registered per call.
pub fn observe_disconnection<F>(
    device: &Arc<dyn DeviceHandle>,
    on_disconnect: F,
) -> Result<DisconnectSubscription, LinkError>
where
    F: Fn() + Send + Sync + 'static,
{
    let id = device.on_disconnected(Arc::new(on_disconnect))?;
    debug!("Listening for disconnection of {}", device.id());
    Ok(DisconnectSubscription {
        device: device.clone(),
        id: Some(id),
    })
}

/// Tear down `server` if it is still active. Does not touch the published
/// connection state; the resulting disconnection notification does.
pub fn disconnect(server: &dyn SessionHandle) {
    if server.is_active() {
        info!("Closing GATT session");
        server.close();
    }
}

/// A live connection: device, GATT session, and the resolved channel
pub struct LiveSession {
    pub id: u64,
    pub device: Arc<dyn DeviceHandle>,
    pub server: Arc<dyn SessionHandle>,
    pub channel: Option<Arc<dyn ChannelHandle>>,
    _subscription: DisconnectSubscription,
}

impl LiveSession {
    pub fn new(
        id: u64,
        device: Arc<dyn DeviceHandle>,
        server: Arc<dyn SessionHandle>,
        channel: Option<Arc<dyn ChannelHandle>>,
        subscription: DisconnectSubscription,
    ) -> Self {
        Self {
            id,
            device,
            server,
            channel,
            _subscription: subscription,
        }
    }
}

/// The handles owned by the lifecycle manager. Always replaced as a whole.
#[derive(Default)]
pub struct Session {
    live: Option<LiveSession>,
}

impl Session {
    pub fn empty() -> Self {
        Self { live: None }
    }

    pub fn live(live: LiveSession) -> Self {
        Self { live: Some(live) }
    }

    pub fn id(&self) -> Option<u64> {
        self.live.as_ref().map(|l| l.id)
    }

    pub fn device(&self) -> Option<&Arc<dyn DeviceHandle>> {
        self.live.as_ref().map(|l| &l.device)
    }

    pub fn server(&self) -> Option<&Arc<dyn SessionHandle>> {
        self.live.as_ref().map(|l| &l.server)
    }

    pub fn channel(&self) -> Option<&Arc<dyn ChannelHandle>> {
        self.live.as_ref().and_then(|l| l.channel.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_none()
    }
}
