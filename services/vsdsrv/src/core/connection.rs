//! Connection configuration
//!
//! Transport selection plus the serial framing or TCP endpoint parameters.
//! The field names used by the operator UI are accepted as aliases.

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{Result, VsdError};

/// Default serial baud rate
pub const DEFAULT_BAUD_RATE: u32 = 19200;
/// Default Modbus TCP port
pub const DEFAULT_TCP_PORT: u16 = 502;
/// Device identifier used when the request does not name one
pub const DEFAULT_DEVICE_ID: u8 = 1;

/// Transport kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// RS-485 Modbus RTU
    #[default]
    #[serde(alias = "rtu")]
    Serial,
    /// Modbus TCP
    Tcp,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Serial => write!(f, "serial"),
            TransportKind::Tcp => write!(f, "tcp"),
        }
    }
}

/// Serial parity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Parity {
    #[default]
    #[serde(rename = "N", alias = "n", alias = "none")]
    None,
    #[serde(rename = "E", alias = "e", alias = "even")]
    Even,
    #[serde(rename = "O", alias = "o", alias = "odd")]
    Odd,
}

impl Parity {
    fn letter(self) -> char {
        match self {
            Parity::None => 'N',
            Parity::Even => 'E',
            Parity::Odd => 'O',
        }
    }
}

/// Parameters for one connect attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConnectionConfig {
    #[serde(default, alias = "connection_type", alias = "mode")]
    pub transport: TransportKind,

    /// Serial port name, e.g. `/dev/ttyUSB0` or `COM3`
    #[serde(default)]
    pub port: Option<String>,

    #[serde(default = "default_baud_rate", alias = "baudrate")]
    pub baud_rate: u32,

    #[serde(default = "default_bytesize", alias = "data_bits")]
    pub bytesize: u8,

    #[serde(default)]
    pub parity: Parity,

    #[serde(default = "default_stop_bits", alias = "stopbits")]
    pub stop_bits: u8,

    /// Per-transaction timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: f64,

    /// TCP host name or IP address
    #[serde(default, alias = "ip_address")]
    pub host: Option<String>,

    #[serde(default = "default_tcp_port")]
    pub tcp_port: u16,

    #[serde(default = "default_device_id", alias = "slave_id", alias = "unit_id")]
    pub device_id: u8,

    /// `host` resolved ahead of the connect, see [`ConnectionConfig::resolve`]
    #[serde(skip)]
    pub resolved_addr: Option<SocketAddr>,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_bytesize() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

fn default_timeout() -> f64 {
    1.0
}

fn default_tcp_port() -> u16 {
    DEFAULT_TCP_PORT
}

fn default_device_id() -> u8 {
    DEFAULT_DEVICE_ID
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::Serial,
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            bytesize: default_bytesize(),
            parity: Parity::None,
            stop_bits: default_stop_bits(),
            timeout: default_timeout(),
            host: None,
            tcp_port: DEFAULT_TCP_PORT,
            device_id: DEFAULT_DEVICE_ID,
            resolved_addr: None,
        }
    }
}

impl ConnectionConfig {
    pub fn serial(port: impl Into<String>) -> Self {
        Self {
            port: Some(port.into()),
            ..Default::default()
        }
    }

    pub fn tcp(host: impl Into<String>, tcp_port: u16) -> Self {
        Self {
            transport: TransportKind::Tcp,
            host: Some(host.into()),
            tcp_port,
            ..Default::default()
        }
    }

    /// Reject parameters that cannot open a link, before any I/O
    pub fn validate(&self) -> Result<()> {
        if !self.timeout.is_finite() || self.timeout <= 0.0 {
            return Err(VsdError::config(format!(
                "timeout must be a positive number of seconds, got {}",
                self.timeout
            )));
        }

        match self.transport {
            TransportKind::Serial => {
                if self.serial_port().is_none() {
                    return Err(VsdError::config("Serial port not defined"));
                }
                if self.baud_rate == 0 {
                    return Err(VsdError::config("baud_rate must be positive"));
                }
                if !(5..=8).contains(&self.bytesize) {
                    return Err(VsdError::config(format!(
                        "bytesize must be 5-8, got {}",
                        self.bytesize
                    )));
                }
                if !matches!(self.stop_bits, 1 | 2) {
                    return Err(VsdError::config(format!(
                        "stop_bits must be 1 or 2, got {}",
                        self.stop_bits
                    )));
                }
            },
            TransportKind::Tcp => {
                if self.tcp_host().is_none() {
                    return Err(VsdError::config("TCP host not defined"));
                }
                if self.tcp_port == 0 {
                    return Err(VsdError::config("tcp_port must be non-zero"));
                }
            },
        }
        Ok(())
    }

    /// Validate, then resolve the TCP host name to a socket address.
    ///
    /// Name lookup can stall on DNS, so callers do this before taking the
    /// session lock. Serial configs come back unchanged.
    pub async fn resolve(&self) -> Result<ConnectionConfig> {
        self.validate()?;
        let mut resolved = self.clone();
        if self.transport != TransportKind::Tcp || self.resolved_addr.is_some() {
            return Ok(resolved);
        }

        let host = self
            .tcp_host()
            .ok_or_else(|| VsdError::config("TCP host not defined"))?;
        let mut addrs = tokio::net::lookup_host((host, self.tcp_port))
            .await
            .map_err(|e| VsdError::connection(format!("Cannot resolve {}: {}", host, e)))?;
        let addr = addrs
            .next()
            .ok_or_else(|| VsdError::connection(format!("No address for {}", host)))?;
        resolved.resolved_addr = Some(addr);
        Ok(resolved)
    }

    pub fn serial_port(&self) -> Option<&str> {
        self.port.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }

    pub fn tcp_host(&self) -> Option<&str> {
        self.host.as_deref().map(str::trim).filter(|h| !h.is_empty())
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs_f64(self.timeout.max(0.001))
    }

    /// Human-readable endpoint, e.g. `/dev/ttyUSB0@19200 8N1` or `10.0.0.5:502`
    pub fn endpoint(&self) -> String {
        match self.transport {
            TransportKind::Serial => format!(
                "{}@{} {}{}{}",
                self.serial_port().unwrap_or("?"),
                self.baud_rate,
                self.bytesize,
                self.parity.letter(),
                self.stop_bits
            ),
            TransportKind::Tcp => {
                format!("{}:{}", self.tcp_host().unwrap_or("?"), self.tcp_port)
            },
        }
    }

    pub(crate) fn data_bits(&self) -> tokio_serial::DataBits {
        match self.bytesize {
            5 => tokio_serial::DataBits::Five,
            6 => tokio_serial::DataBits::Six,
            7 => tokio_serial::DataBits::Seven,
            _ => tokio_serial::DataBits::Eight,
        }
    }

    pub(crate) fn serial_parity(&self) -> tokio_serial::Parity {
        match self.parity {
            Parity::None => tokio_serial::Parity::None,
            Parity::Even => tokio_serial::Parity::Even,
            Parity::Odd => tokio_serial::Parity::Odd,
        }
    }

    pub(crate) fn serial_stop_bits(&self) -> tokio_serial::StopBits {
        match self.stop_bits {
            2 => tokio_serial::StopBits::Two,
            _ => tokio_serial::StopBits::One,
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_field_device() {
        let config: ConnectionConfig = serde_json::from_str(r#"{"port": "COM3"}"#).unwrap();
        assert_eq!(config.transport, TransportKind::Serial);
        assert_eq!(config.baud_rate, 19200);
        assert_eq!(config.bytesize, 8);
        assert_eq!(config.parity, Parity::None);
        assert_eq!(config.stop_bits, 1);
        assert_eq!(config.timeout, 1.0);
        assert_eq!(config.tcp_port, 502);
        assert_eq!(config.device_id, 1);
        assert!(config.validate().is_ok());
        assert_eq!(config.endpoint(), "COM3@19200 8N1");
    }

    #[test]
    fn test_ui_field_aliases() {
        let config: ConnectionConfig = serde_json::from_str(
            r#"{"connection_type": "tcp", "ip_address": "192.168.1.20", "tcp_port": 5020,
                "timeout": 2.5}"#,
        )
        .unwrap();
        assert_eq!(config.transport, TransportKind::Tcp);
        assert_eq!(config.tcp_host(), Some("192.168.1.20"));
        assert_eq!(config.timeout_duration(), Duration::from_millis(2500));
        assert_eq!(config.endpoint(), "192.168.1.20:5020");

        let serial: ConnectionConfig = serde_json::from_str(
            r#"{"port": "/dev/ttyUSB0", "baudrate": 9600, "parity": "E", "stopbits": 2}"#,
        )
        .unwrap();
        assert_eq!(serial.baud_rate, 9600);
        assert_eq!(serial.parity, Parity::Even);
        assert_eq!(serial.serial_stop_bits(), tokio_serial::StopBits::Two);
        assert_eq!(serial.serial_parity(), tokio_serial::Parity::Even);
    }

    #[test]
    fn test_missing_port_or_host_is_configuration_error() {
        assert!(matches!(
            ConnectionConfig::default().validate(),
            Err(VsdError::Configuration(_))
        ));
        let mut tcp = ConnectionConfig::tcp("  ", 502);
        assert!(matches!(tcp.validate(), Err(VsdError::Configuration(_))));
        tcp.host = Some("plc.local".to_string());
        assert!(tcp.validate().is_ok());
    }

    #[test]
    fn test_invalid_framing_is_rejected() {
        let mut config = ConnectionConfig::serial("COM1");
        config.bytesize = 9;
        assert!(config.validate().is_err());

        let mut config = ConnectionConfig::serial("COM1");
        config.stop_bits = 3;
        assert!(config.validate().is_err());

        let mut config = ConnectionConfig::serial("COM1");
        config.timeout = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_transport_is_rejected_by_parsing() {
        assert!(serde_json::from_str::<ConnectionConfig>(r#"{"transport": "usb"}"#).is_err());
    }

    #[tokio::test]
    async fn test_resolve_fills_tcp_address() {
        let config = ConnectionConfig::tcp("127.0.0.1", 5020).resolve().await.unwrap();
        assert_eq!(config.resolved_addr, Some("127.0.0.1:5020".parse().unwrap()));
        assert_eq!(config.endpoint(), "127.0.0.1:5020");

        let serial = ConnectionConfig::serial("COM3").resolve().await.unwrap();
        assert_eq!(serial.resolved_addr, None);
    }

    #[tokio::test]
    async fn test_resolve_validates_before_lookup() {
        let mut config = ConnectionConfig::tcp("127.0.0.1", 502);
        config.timeout = -1.0;
        assert!(matches!(
            config.resolve().await,
            Err(VsdError::Configuration(_))
        ));
        assert!(matches!(
            ConnectionConfig::tcp("  ", 502).resolve().await,
            Err(VsdError::Configuration(_))
        ));
    }
}
