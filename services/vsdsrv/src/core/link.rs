//! Transport links
//!
//! A link is one open Modbus transport. Both transports (RTU serial and TCP)
//! sit behind the `RegisterLink` trait, and a `Connector` opens the right one
//! from a `ConnectionConfig`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use utoipa::ToSchema;
use voltage_modbus::{ModbusClient, ModbusRtuClient, ModbusTcpClient};

use super::connection::{ConnectionConfig, TransportKind};
use crate::error::{Result, VsdError};

/// How a request names the target device on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AddressingConvention {
    /// RTU slave address
    Slave,
    /// MBAP unit identifier
    Unit,
    /// Generic device identifier
    DeviceId,
}

impl AddressingConvention {
    /// Used when a link cannot report what it accepts
    pub const FALLBACK: AddressingConvention = AddressingConvention::Slave;
}

/// Target device on the bus, in the convention resolved at connect time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceAddress {
    pub convention: AddressingConvention,
    pub id: u8,
}

/// Function-code level operations on one open transport
#[async_trait]
pub trait RegisterLink: Send {
    /// Addressing conventions this link accepts, preferred first.
    /// `None` when the link cannot tell.
    ///
    /// The convention only shapes requests on links that take named
    /// addressing; `VoltageLink` sends the plain device id either way.
    fn addressing_conventions(&self) -> Option<Vec<AddressingConvention>> {
        None
    }

    /// FC03
    async fn read_holding(
        &mut self,
        device: DeviceAddress,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>>;

    /// FC01, single coil
    async fn read_coil(&mut self, device: DeviceAddress, address: u16) -> Result<bool>;

    /// FC16, used even for a single word
    async fn write_holding(
        &mut self,
        device: DeviceAddress,
        address: u16,
        values: &[u16],
    ) -> Result<()>;

    /// FC05
    async fn write_coil(&mut self, device: DeviceAddress, address: u16, value: bool)
        -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}

/// Opens links from connection parameters
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, config: &ConnectionConfig) -> Result<Box<dyn RegisterLink>>;
}

// ============================================================================
// voltage_modbus backed link
// ============================================================================

/// Link over a real voltage_modbus client
pub enum VoltageLink {
    Tcp(ModbusTcpClient),
    Rtu(ModbusRtuClient),
}

impl VoltageLink {
    fn name(&self) -> &'static str {
        match self {
            VoltageLink::Tcp(_) => "MODBUS-TCP",
            VoltageLink::Rtu(_) => "MODBUS-RTU",
        }
    }
}

#[async_trait]
impl RegisterLink for VoltageLink {
    fn addressing_conventions(&self) -> Option<Vec<AddressingConvention>> {
        match self {
            VoltageLink::Tcp(_) => Some(vec![AddressingConvention::Unit, AddressingConvention::Slave]),
            VoltageLink::Rtu(_) => Some(vec![AddressingConvention::Slave]),
        }
    }

    async fn read_holding(
        &mut self,
        device: DeviceAddress,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>> {
        debug!(
            "[{}] FC03 {:?}={} addr={} count={}",
            self.name(),
            device.convention,
            device.id,
            address,
            count
        );
        let words = match self {
            VoltageLink::Tcp(client) => client.read_03(device.id, address, count).await?,
            VoltageLink::Rtu(client) => client.read_03(device.id, address, count).await?,
        };
        if words.len() < usize::from(count) {
            return Err(VsdError::transaction(format!(
                "short FC03 response at {}: {} of {} words",
                address,
                words.len(),
                count
            )));
        }
        Ok(words)
    }

    async fn read_coil(&mut self, device: DeviceAddress, address: u16) -> Result<bool> {
        debug!(
            "[{}] FC01 {:?}={} addr={}",
            self.name(),
            device.convention,
            device.id,
            address
        );
        let bits = match self {
            VoltageLink::Tcp(client) => client.read_01(device.id, address, 1).await?,
            VoltageLink::Rtu(client) => client.read_01(device.id, address, 1).await?,
        };
        bits.first()
            .copied()
            .ok_or_else(|| VsdError::transaction(format!("empty FC01 response at {}", address)))
    }

    async fn write_holding(
        &mut self,
        device: DeviceAddress,
        address: u16,
        values: &[u16],
    ) -> Result<()> {
        debug!(
            "[{}] FC16 {:?}={} addr={} values={:?}",
            self.name(),
            device.convention,
            device.id,
            address,
            values
        );
        match self {
            VoltageLink::Tcp(client) => client.write_10(device.id, address, values).await?,
            VoltageLink::Rtu(client) => client.write_10(device.id, address, values).await?,
        }
        Ok(())
    }

    async fn write_coil(
        &mut self,
        device: DeviceAddress,
        address: u16,
        value: bool,
    ) -> Result<()> {
        debug!(
            "[{}] FC05 {:?}={} addr={} value={}",
            self.name(),
            device.convention,
            device.id,
            address,
            value
        );
        match self {
            VoltageLink::Tcp(client) => client.write_05(device.id, address, value).await?,
            VoltageLink::Rtu(client) => client.write_05(device.id, address, value).await?,
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            VoltageLink::Tcp(client) => client.close().await?,
            VoltageLink::Rtu(client) => client.close().await?,
        }
        Ok(())
    }
}

/// Connector that opens real serial or TCP transports
#[derive(Debug, Default, Clone, Copy)]
pub struct ModbusConnector;

impl ModbusConnector {
    async fn open_tcp(config: &ConnectionConfig) -> Result<VoltageLink> {
        let socket_addr = match config.resolved_addr {
            Some(addr) => addr,
            None => config.resolve().await?.resolved_addr.ok_or_else(|| {
                VsdError::connection(format!("No address for {}", config.endpoint()))
            })?,
        };

        debug!("Connecting to TCP Modbus server at {}", socket_addr);
        let client = ModbusTcpClient::new(socket_addr, config.timeout_duration())
            .await
            .map_err(|e| {
                VsdError::connection(format!("TCP connection to {} failed: {}", socket_addr, e))
            })?;
        Ok(VoltageLink::Tcp(client))
    }

    fn open_rtu(config: &ConnectionConfig) -> Result<VoltageLink> {
        let port = config
            .serial_port()
            .ok_or_else(|| VsdError::config("Serial port not defined"))?;

        debug!("Opening RTU port {}", config.endpoint());
        let client = ModbusRtuClient::with_config_and_logging(
            port,
            config.baud_rate,
            config.data_bits(),
            config.serial_stop_bits(),
            config.serial_parity(),
            config.timeout_duration(),
            None,
        )
        .map_err(|e| VsdError::connection(format!("RTU open {} failed: {}", port, e)))?;
        Ok(VoltageLink::Rtu(client))
    }
}

#[async_trait]
impl Connector for ModbusConnector {
    async fn open(&self, config: &ConnectionConfig) -> Result<Box<dyn RegisterLink>> {
        config.validate()?;

        let link = match config.transport {
            TransportKind::Tcp => Self::open_tcp(config).await,
            TransportKind::Serial => Self::open_rtu(config),
        };

        match link {
            Ok(link) => {
                info!("Link open: {} {}", config.transport, config.endpoint());
                Ok(Box::new(link))
            },
            Err(e) => {
                warn!("Link open failed: {}", e);
                Err(e)
            },
        }
    }
}

/// Serial port entry for the port picker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SerialPortInfo {
    pub device: String,
    pub description: String,
}

/// Enumerate serial ports present on this host
pub fn available_serial_ports() -> Result<Vec<SerialPortInfo>> {
    let ports = tokio_serial::available_ports()
        .map_err(|e| VsdError::internal(format!("Serial port enumeration failed: {}", e)))?;

    Ok(ports
        .into_iter()
        .map(|port| {
            let description = match port.port_type {
                tokio_serial::SerialPortType::UsbPort(usb) => usb
                    .product
                    .or(usb.manufacturer)
                    .unwrap_or_else(|| "USB serial".to_string()),
                tokio_serial::SerialPortType::PciPort => "PCI serial".to_string(),
                tokio_serial::SerialPortType::BluetoothPort => "Bluetooth serial".to_string(),
                tokio_serial::SerialPortType::Unknown => "n/a".to_string(),
            };
            SerialPortInfo {
                device: port.port_name,
                description,
            }
        })
        .collect())
}
