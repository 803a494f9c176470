//! Service startup helpers: banner and logging bring-up

use std::path::PathBuf;

use crate::logging::{self, LogConfig};
use tracing::info;

/// Service metadata for startup
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    /// Service name (e.g., "vsdsrv")
    pub name: String,
    /// Service version, normally the binary's `CARGO_PKG_VERSION`
    pub version: String,
    /// Service description
    pub description: String,
    /// Default API port
    pub default_port: u16,
}

impl ServiceInfo {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
        default_port: u16,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: description.into(),
            default_port,
        }
    }
}

const VSDSRV_BANNER: &str = r#"
 ██╗   ██╗███████╗██████╗ ███████╗██████╗ ██╗   ██╗
 ██║   ██║██╔════╝██╔══██╗██╔════╝██╔══██╗██║   ██║
 ██║   ██║███████╗██║  ██║███████╗██████╔╝██║   ██║
 ╚██╗ ██╔╝╚════██║██║  ██║╚════██║██╔══██╗╚██╗ ██╔╝
  ╚████╔╝ ███████║██████╔╝███████║██║  ██║ ╚████╔╝
   ╚═══╝  ╚══════╝╚═════╝ ╚══════╝╚═╝  ╚═╝  ╚═══╝
"#;

/// Print the startup banner
pub fn print_startup_banner(service: &ServiceInfo) {
    info!("{}", VSDSRV_BANNER);
    info!(" {} v{}", service.name.to_uppercase(), service.version);
    info!(" {}", service.description);
    info!(" Default Port: {}", service.default_port);
    info!("");
}

/// Initialize logging for a service from its configured level and directory
pub fn init_logging(
    service: &ServiceInfo,
    level: &str,
    log_dir: Option<PathBuf>,
    enable_json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = LogConfig::new(service.name.clone(), level)
        .with_log_dir(log_dir.map(|dir| dir.join(&service.name)))
        .with_json(enable_json);
    logging::init_with_config(config)
}
