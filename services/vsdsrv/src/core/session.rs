//! Instrument session
//!
//! Owns exactly one open link. The device-addressing convention is resolved
//! once when the session is created, and the link is proven alive with a
//! probe read before the session is handed out.

use tracing::{debug, info, warn};

use super::connection::{ConnectionConfig, TransportKind};
use super::link::{AddressingConvention, Connector, DeviceAddress, RegisterLink};
use crate::error::{Result, VsdError};

/// The single live connection to the instrument
pub struct Session {
    link: Box<dyn RegisterLink>,
    device: DeviceAddress,
    transport: TransportKind,
    endpoint: String,
    closed: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("device", &self.device)
            .field("transport", &self.transport)
            .field("endpoint", &self.endpoint)
            .field("closed", &self.closed)
            .finish()
    }
}

/// Pick the link's preferred convention, or fall back when it cannot say
pub fn resolve_addressing(link: &dyn RegisterLink) -> AddressingConvention {
    link.addressing_conventions()
        .and_then(|conventions| conventions.first().copied())
        .unwrap_or(AddressingConvention::FALLBACK)
}

impl Session {
    /// Open a link, resolve addressing and run the liveness probe.
    ///
    /// If the probe read fails the link is closed before returning `ProbeFailed`.
    pub async fn connect(
        connector: &dyn Connector,
        config: &ConnectionConfig,
        probe_address: u16,
    ) -> Result<Self> {
        config.validate()?;

        let link = connector.open(config).await?;
        let convention = resolve_addressing(link.as_ref());
        debug!("Addressing convention: {:?}", convention);

        let mut session = Self {
            link,
            device: DeviceAddress {
                convention,
                id: config.device_id,
            },
            transport: config.transport,
            endpoint: config.endpoint(),
            closed: false,
        };

        if let Err(e) = session.read_holding(probe_address, 1).await {
            warn!("Probe read at {} failed: {}", probe_address, e);
            session.close().await;
            return Err(VsdError::ProbeFailed(format!(
                "no answer at register {} from {} ({})",
                probe_address, session.endpoint, e
            )));
        }

        info!(
            "Session up: {} {} device {:?}={}",
            session.transport, session.endpoint, convention, config.device_id
        );
        Ok(session)
    }

    /// Close the link. Safe to call more than once; teardown errors are logged.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.link.close().await {
            warn!("Error closing {} link: {}", self.transport, e);
        }
        debug!("Session closed: {}", self.endpoint);
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(VsdError::NotConnected)
        } else {
            Ok(())
        }
    }

    pub async fn read_holding(&mut self, address: u16, count: u16) -> Result<Vec<u16>> {
        self.ensure_open()?;
        self.link.read_holding(self.device, address, count).await
    }

    pub async fn read_coil(&mut self, address: u16) -> Result<bool> {
        self.ensure_open()?;
        self.link.read_coil(self.device, address).await
    }

    pub async fn write_holding(&mut self, address: u16, values: &[u16]) -> Result<()> {
        self.ensure_open()?;
        self.link.write_holding(self.device, address, values).await
    }

    pub async fn write_coil(&mut self, address: u16, value: bool) -> Result<()> {
        self.ensure_open()?;
        self.link.write_coil(self.device, address, value).await
    }

    pub fn addressing(&self) -> AddressingConvention {
        self.device.convention
    }

    pub fn device_id(&self) -> u8 {
        self.device.id
    }

    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
