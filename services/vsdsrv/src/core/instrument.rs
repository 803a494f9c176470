//! Instrument client
//!
//! Composes the session, codec and catalog into logical `read(id)` and
//! `write(id, value)`. A single `tokio::sync::Mutex<Option<Session>>`
//! serializes every device transaction in the process.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use super::catalog::{RegisterCatalog, RegisterDescriptor};
use super::codec::{self, PointValue, RawValue};
use super::connection::{ConnectionConfig, TransportKind};
use super::link::{AddressingConvention, Connector};
use super::session::Session;
use crate::error::{Result, VsdError};

/// Number of registers in the site name field (two characters each)
pub const SITE_NAME_WORDS: u16 = 5;

/// Fixed addresses the instrument needs outside the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstrumentSettings {
    /// Register read right after connecting to prove the device answers
    pub probe_address: u16,
    /// Base register of the site name field
    pub site_name_address: u16,
}

impl Default for InstrumentSettings {
    fn default() -> Self {
        Self {
            probe_address: 855,
            site_name_address: 0,
        }
    }
}

/// Result of a successful write
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct WriteAck {
    pub id: String,
    /// Engineering value requested
    pub value: f64,
    /// Encoding transmitted to the device
    pub raw: RawValue,
}

/// Snapshot of the session slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct InstrumentStatus {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addressing: Option<AddressingConvention>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<u8>,
}

impl InstrumentStatus {
    fn of(session: Option<&Session>) -> Self {
        match session {
            Some(session) => Self {
                connected: true,
                transport: Some(session.transport()),
                endpoint: Some(session.endpoint().to_string()),
                addressing: Some(session.addressing()),
                device_id: Some(session.device_id()),
            },
            None => Self {
                connected: false,
                transport: None,
                endpoint: None,
                addressing: None,
                device_id: None,
            },
        }
    }
}

/// The register access front door
pub struct Instrument {
    catalog: Arc<RegisterCatalog>,
    connector: Arc<dyn Connector>,
    settings: InstrumentSettings,
    session: Mutex<Option<Session>>,
}

impl Instrument {
    pub fn new(
        catalog: Arc<RegisterCatalog>,
        connector: Arc<dyn Connector>,
        settings: InstrumentSettings,
    ) -> Self {
        Self {
            catalog,
            connector,
            settings,
            session: Mutex::new(None),
        }
    }

    pub fn catalog(&self) -> &RegisterCatalog {
        &self.catalog
    }

    pub(super) async fn lock(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().await
    }

    /// Replace any live session with a new one.
    ///
    /// A TCP host is resolved before the lock is taken. The old session is
    /// then torn down and teardown errors are ignored. On failure the slot is
    /// left empty.
    pub async fn connect(&self, config: &ConnectionConfig) -> Result<InstrumentStatus> {
        // Name lookup happens outside the lock
        let target = config.resolve().await;

        let mut slot = self.session.lock().await;

        if let Some(mut old) = slot.take() {
            info!("Closing previous session to {}", old.endpoint());
            old.close().await;
        }

        let target = match target {
            Ok(target) => target,
            Err(e) => {
                warn!("Connect to {} failed: {}", config.endpoint(), e);
                return Err(e);
            },
        };

        match Session::connect(self.connector.as_ref(), &target, self.settings.probe_address)
            .await
        {
            Ok(session) => {
                info!("Connected via {} {}", session.transport(), session.endpoint());
                *slot = Some(session);
                Ok(InstrumentStatus::of(slot.as_ref()))
            },
            Err(e) => {
                warn!("Connect to {} failed: {}", config.endpoint(), e);
                Err(e)
            },
        }
    }

    /// Close the live session, if any
    pub async fn disconnect(&self) -> Result<()> {
        let mut slot = self.session.lock().await;
        match slot.take() {
            Some(mut session) => {
                session.close().await;
                info!("Disconnected from {}", session.endpoint());
            },
            None => debug!("Disconnect with no live session"),
        }
        Ok(())
    }

    pub async fn status(&self) -> InstrumentStatus {
        let slot = self.session.lock().await;
        InstrumentStatus::of(slot.as_ref())
    }

    pub async fn is_connected(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Read one register by id
    pub async fn read(&self, id: &str) -> Result<PointValue> {
        let desc = self.catalog.lookup(id)?;
        let mut slot = self.session.lock().await;
        let session = slot.as_mut().ok_or(VsdError::NotConnected)?;
        read_descriptor(session, desc).await
    }

    /// Write one register by id.
    ///
    /// Check order: catalog lookup, read-only, finite value, connectivity.
    pub async fn write(&self, id: &str, value: f64) -> Result<WriteAck> {
        let desc = self.catalog.lookup(id)?;
        if !desc.access.is_writable() {
            return Err(VsdError::AccessDenied(id.to_string()));
        }
        if !value.is_finite() {
            return Err(VsdError::InvalidValue(format!("{} for '{}'", value, id)));
        }

        let mut slot = self.session.lock().await;
        let session = slot.as_mut().ok_or(VsdError::NotConnected)?;

        let raw = codec::encode(value, desc.primitive_type, desc.scale);
        match raw {
            RawValue::Coil(bit) => session.write_coil(desc.address, bit).await?,
            RawValue::Word(word) => session.write_holding(desc.address, &[word]).await?,
        }
        info!("Write {} = {} (raw {:?})", id, value, raw);

        Ok(WriteAck {
            id: id.to_string(),
            value,
            raw,
        })
    }

    /// Read the site name text field
    pub async fn read_site_name(&self) -> Result<String> {
        let mut slot = self.session.lock().await;
        let session = slot.as_mut().ok_or(VsdError::NotConnected)?;
        let words = session
            .read_holding(self.settings.site_name_address, SITE_NAME_WORDS)
            .await?;
        Ok(codec::decode_ascii(&words))
    }

    /// Write the site name text field; returns the text as stored
    pub async fn write_site_name(&self, text: &str) -> Result<String> {
        let words = codec::encode_ascii(text, usize::from(SITE_NAME_WORDS));
        let mut slot = self.session.lock().await;
        let session = slot.as_mut().ok_or(VsdError::NotConnected)?;
        session
            .write_holding(self.settings.site_name_address, &words)
            .await?;
        let stored = codec::decode_ascii(&words);
        info!("Site name set to '{}'", stored);
        Ok(stored)
    }
}

/// One logical read inside an already-held lock
pub(super) async fn read_descriptor(
    session: &mut Session,
    desc: &RegisterDescriptor,
) -> Result<PointValue> {
    let raw = if desc.primitive_type.is_coil() {
        RawValue::Coil(session.read_coil(desc.address).await?)
    } else {
        let words = session.read_holding(desc.address, 1).await?;
        let word = words
            .first()
            .copied()
            .ok_or_else(|| VsdError::transaction(format!("empty response at {}", desc.address)))?;
        RawValue::Word(word)
    };
    let value = codec::decode(raw, desc.primitive_type, desc.scale);
    debug!("Read {} @ {} = {} ({:?})", desc.id, desc.address, value, raw);
    Ok(value)
}
