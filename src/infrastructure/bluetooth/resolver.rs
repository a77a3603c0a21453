//! Transport Channel Resolver
//!
//! Finds the one characteristic that commands are written to. The well-known
//! UART service is tried first; if it is missing, every service is scanned
//! for the first characteristic that accepts writes.

use crate::infrastructure::bluetooth::platform::{ChannelHandle, LinkError, SessionHandle};
use crate::infrastructure::bluetooth::protocol::{self, UART_SERVICE_UUID, UART_TX_CHAR_UUID};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Identifiers of the well-known write channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelIds {
    pub service: Uuid,
    pub write_characteristic: Uuid,
}

impl ChannelIds {
    pub fn from_strings(service: &str, write_characteristic: &str) -> Result<Self> {
        Ok(Self {
            service: protocol::parse_uuid(service)?,
            write_characteristic: protocol::parse_uuid(write_characteristic)?,
        })
    }
}

impl Default for ChannelIds {
    fn default() -> Self {
        Self {
            service: UART_SERVICE_UUID,
            write_characteristic: UART_TX_CHAR_UUID,
        }
    }
}

/// Resolve the outbound channel of `session`.
///
/// Returns `Ok(None)` when no writable characteristic exists; the caller then
/// runs in simulated mode. Errors only come from the fallback enumeration.
pub async fn resolve(
    session: &dyn SessionHandle,
    ids: &ChannelIds,
) -> Result<Option<Arc<dyn ChannelHandle>>, LinkError> {
    match well_known_channel(session, ids).await {
        Ok(channel) => {
            info!("Found well-known write characteristic {}", channel.uuid());
            return Ok(Some(channel));
        }
        Err(e) => {
            warn!("UART service not found ({}), scanning all services...", e);
        }
    }

    let channel = scan_for_writable(session).await?;
    if channel.is_none() {
        warn!("No writable characteristic found. Commands will be logged only.");
    }
    Ok(channel)
}

async fn well_known_channel(
    session: &dyn SessionHandle,
    ids: &ChannelIds,
) -> Result<Arc<dyn ChannelHandle>, LinkError> {
    let service = session.get_service(ids.service).await?;
    service.get_characteristic(ids.write_characteristic).await
}

async fn scan_for_writable(
    session: &dyn SessionHandle,
) -> Result<Option<Arc<dyn ChannelHandle>>, LinkError> {
    let services = session.get_all_services().await?;
    debug!("Scanning {} services for a writable characteristic", services.len());

    for service in services {
        let characteristics = service.get_all_characteristics().await?;
        if let Some(writable) = characteristics
            .into_iter()
            .find(|c| c.write_flags().is_writable())
        {
            info!(
                "Using writable characteristic {} of service {}",
                writable.uuid(),
                service.uuid()
            );
            return Ok(Some(writable));
        }
    }

    Ok(None)
}
