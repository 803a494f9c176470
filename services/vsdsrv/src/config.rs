//! Service configuration
//!
//! Layered with figment, lowest priority first: built-in defaults, the YAML
//! file, then `VSDSRV_` environment variables (`__` separates sections, e.g.
//! `VSDSRV_API__PORT=6001`). CLI overrides are applied last by the binary.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::core::{InstrumentSettings, RegisterCatalog};
use crate::error::{Result, VsdError};

/// Default API port (the operator UI expects 5001)
pub const DEFAULT_PORT: u16 = 5001;
/// Config file read when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "config/vsdsrv.yaml";
/// Environment prefix
pub const ENV_PREFIX: &str = "VSDSRV_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "vsdsrv".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ApiConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for daily log files; console only when unset
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    pub probe_address: u16,
    pub site_name_address: u16,
    /// CSV point table replacing the built-in register map
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        let settings = InstrumentSettings::default();
        Self {
            probe_address: settings.probe_address,
            site_name_address: settings.site_name_address,
            catalog_path: None,
        }
    }
}

impl InstrumentConfig {
    pub fn settings(&self) -> InstrumentSettings {
        InstrumentSettings {
            probe_address: self.probe_address,
            site_name_address: self.site_name_address,
        }
    }

    /// Built-in map unless a CSV point table is configured
    pub fn load_catalog(&self) -> Result<RegisterCatalog> {
        match &self.catalog_path {
            Some(path) => RegisterCatalog::from_csv_path(path),
            None => Ok(RegisterCatalog::builtin()),
        }
    }
}

/// Complete vsdsrv configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VsdConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub instrument: InstrumentConfig,
}

impl VsdConfig {
    /// Provider chain without CLI overrides
    pub fn figment(path: Option<&Path>) -> Figment {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
        Figment::from(Serialized::defaults(VsdConfig::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load configuration. An explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            if !path.exists() {
                return Err(VsdError::config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
        }
        let config: VsdConfig = Self::figment(path).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `--bind-address` (`host:port` or bare host)
    pub fn apply_bind_address(&mut self, bind: &str) -> Result<()> {
        match bind.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() => {
                self.api.port = port
                    .parse()
                    .map_err(|_| VsdError::config(format!("Invalid port in '{}'", bind)))?;
                self.api.host = host.to_string();
            },
            _ => self.api.host = bind.to_string(),
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.service.name.trim().is_empty() {
            return Err(VsdError::config("service.name must not be empty"));
        }
        if self.api.host.trim().is_empty() {
            return Err(VsdError::config("api.host must not be empty"));
        }
        if self.api.port == 0 {
            return Err(VsdError::config("api.port must be non-zero"));
        }
        let end = u32::from(self.instrument.site_name_address)
            + u32::from(crate::core::instrument::SITE_NAME_WORDS);
        if end > 0x1_0000 {
            return Err(VsdError::config(format!(
                "site name field at {} runs past the register space",
                self.instrument.site_name_address
            )));
        }
        Ok(())
    }
}
