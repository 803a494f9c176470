//! Error handling for the VSD register access service
//!
//! Every failure the core can report is a distinct `VsdError` variant so that
//! callers can tell client mistakes, link problems and device silence apart.

use axum::http::StatusCode;
use thiserror::Error;

/// VSD service error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VsdError {
    /// Missing port/host or invalid framing parameters; no I/O was attempted
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The transport link could not be opened
    #[error("Connection error: {0}")]
    Connection(String),

    /// The link opened but the device did not answer the liveness probe
    #[error("Probe failed: {0}")]
    ProbeFailed(String),

    /// No live session
    #[error("Instrument not connected")]
    NotConnected,

    /// Register id absent from the catalog
    #[error("Register not mapped: {0}")]
    NotFound(String),

    /// Write attempted on a read-only register
    #[error("Register is read-only: {0}")]
    AccessDenied(String),

    /// Value cannot be encoded (NaN or infinite)
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// A single Modbus transaction failed
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// A non-empty batch produced no successful reads
    #[error("Device unresponsive")]
    DeviceUnresponsive,

    /// Startup failures: catalog or config load
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for the VSD service
pub type Result<T> = std::result::Result<T, VsdError>;

impl VsdError {
    pub fn config(msg: impl Into<String>) -> Self {
        VsdError::Configuration(msg.into())
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        VsdError::Connection(msg.into())
    }

    pub fn transaction(msg: impl Into<String>) -> Self {
        VsdError::Transaction(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        VsdError::Internal(msg.into())
    }

    /// Stable machine-readable code
    pub fn error_code(&self) -> &'static str {
        match self {
            VsdError::Configuration(_) => "VSD_CONFIGURATION",
            VsdError::Connection(_) => "VSD_CONNECTION",
            VsdError::ProbeFailed(_) => "VSD_PROBE_FAILED",
            VsdError::NotConnected => "VSD_NOT_CONNECTED",
            VsdError::NotFound(_) => "VSD_NOT_FOUND",
            VsdError::AccessDenied(_) => "VSD_ACCESS_DENIED",
            VsdError::InvalidValue(_) => "VSD_INVALID_VALUE",
            VsdError::Transaction(_) => "VSD_TRANSACTION",
            VsdError::DeviceUnresponsive => "VSD_DEVICE_UNRESPONSIVE",
            VsdError::Internal(_) => "VSD_INTERNAL",
        }
    }

    /// Only per-operation failures can be retried on the same session
    pub fn is_retryable(&self) -> bool {
        matches!(self, VsdError::Transaction(_))
    }

    /// Whether the caller must establish a new session before trying again
    pub fn needs_reconnect(&self) -> bool {
        matches!(
            self,
            VsdError::Connection(_)
                | VsdError::ProbeFailed(_)
                | VsdError::NotConnected
                | VsdError::DeviceUnresponsive
        )
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            VsdError::Configuration(_) | VsdError::InvalidValue(_) => StatusCode::BAD_REQUEST,
            VsdError::Connection(_) | VsdError::Transaction(_) => StatusCode::BAD_GATEWAY,
            VsdError::ProbeFailed(_) => StatusCode::GATEWAY_TIMEOUT,
            VsdError::NotConnected => StatusCode::CONFLICT,
            VsdError::NotFound(_) => StatusCode::NOT_FOUND,
            VsdError::AccessDenied(_) => StatusCode::FORBIDDEN,
            VsdError::DeviceUnresponsive => StatusCode::SERVICE_UNAVAILABLE,
            VsdError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<voltage_modbus::ModbusError> for VsdError {
    fn from(err: voltage_modbus::ModbusError) -> Self {
        VsdError::Transaction(err.to_string())
    }
}

impl From<std::io::Error> for VsdError {
    fn from(err: std::io::Error) -> Self {
        VsdError::Internal(format!("IO: {}", err))
    }
}

impl From<csv::Error> for VsdError {
    fn from(err: csv::Error) -> Self {
        VsdError::Configuration(format!("Catalog CSV: {}", err))
    }
}

impl From<figment::Error> for VsdError {
    fn from(err: figment::Error) -> Self {
        VsdError::Configuration(err.to_string())
    }
}

// ============================================================================
// API Adaptation: VsdError → AppError conversion
// ============================================================================

impl From<VsdError> for common::AppError {
    fn from(err: VsdError) -> Self {
        common::AppError::with_status(err.http_status(), err.to_string()).with_details(format!(
            "error_code: {}, retryable: {}, reconnect: {}",
            err.error_code(),
            err.is_retryable(),
            err.needs_reconnect()
        ))
    }
}
