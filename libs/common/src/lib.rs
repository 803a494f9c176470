//! `vsdsrv` basic library
//!
//! Provides the pieces shared by the service binary and its tests:
//! - unified API response envelope and HTTP error type
//! - logging initialisation
//! - graceful shutdown signal handling
//! - serde default helpers

pub mod api_types;
pub mod logging;
pub mod serde_helpers;
pub mod service_bootstrap;
pub mod shutdown;

// Re-export commonly used API types
pub use api_types::{ErrorInfo, ErrorResponse, HealthStatus, ServiceStatus, SuccessResponse};

// Re-export AppError when axum feature is enabled
#[cfg(feature = "axum")]
pub use api_types::AppError;

pub use logging::LogConfig;
