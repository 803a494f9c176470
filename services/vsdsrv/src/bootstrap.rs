//! Service bootstrap and initialization
//!
//! Command-line arguments, configuration loading with CLI overrides, logging
//! bring-up and the `--validate` mode.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use common::service_bootstrap::ServiceInfo;

use crate::config::VsdConfig;
use crate::core::RegisterCatalog;
use crate::error::{Result, VsdError};

/// Command-line arguments for vsdsrv
#[derive(Parser, Debug, Clone)]
#[command(
    name = "vsdsrv",
    version = env!("CARGO_PKG_VERSION"),
    about = "VSD / downhole tool register access service",
    long_about = None
)]
pub struct Args {
    /// Configuration file (YAML)
    #[arg(short = 'c', long, env = "VSDSRV_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long)]
    pub log_level: Option<String>,

    /// Bind address for API server (`host:port` or host)
    #[arg(short = 'b', long)]
    pub bind_address: Option<String>,

    /// Disable the startup banner
    #[arg(long)]
    pub no_banner: bool,

    /// Validation mode - load configuration and catalog, then exit
    #[arg(long)]
    pub validate: bool,
}

impl Args {
    /// Load configuration and apply CLI overrides on top
    pub fn load_config(&self) -> Result<VsdConfig> {
        let mut config = VsdConfig::load(self.config.as_deref())?;
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(bind) = &self.bind_address {
            config.apply_bind_address(bind)?;
        }
        config.validate()?;
        Ok(config)
    }
}

pub fn service_info(config: &VsdConfig) -> ServiceInfo {
    ServiceInfo::new(
        config.service.name.clone(),
        env!("CARGO_PKG_VERSION"),
        "VSD / downhole tool register access over Modbus RTU/TCP",
        config.api.port,
    )
}

/// Initialize logging from the loaded configuration
pub fn initialize_logging(config: &VsdConfig, service: &ServiceInfo) -> Result<()> {
    common::service_bootstrap::init_logging(
        service,
        &config.logging.level,
        config.logging.dir.clone(),
        config.logging.json,
    )
    .map_err(|e| VsdError::internal(format!("Failed to init logging: {}", e)))
}

/// Check configuration and catalog, reporting what would be served
pub fn validate_configuration(config: &VsdConfig) -> Result<RegisterCatalog> {
    config.validate()?;
    let catalog = config.instrument.load_catalog()?;
    let writable = catalog.iter().filter(|d| d.access.is_writable()).count();

    info!("API: {}", config.api.bind_address());
    info!(
        "Catalog: {} registers ({} writable) from {}",
        catalog.len(),
        writable,
        config
            .instrument
            .catalog_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "built-in map".to_string())
    );
    info!(
        "Probe register: {}, site name at {}",
        config.instrument.probe_address, config.instrument.site_name_address
    );
    Ok(catalog)
}
