//! Register catalog
//!
//! Static mapping from logical register ids to their physical description.
//! The catalog is built once at startup, validated, and never mutated.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::error::{Result, VsdError};

/// Register primitive type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    #[serde(alias = "uint", alias = "UINT16")]
    Uint16,
    #[serde(alias = "int", alias = "INT16")]
    Int16,
    #[serde(alias = "COIL", alias = "bool")]
    Coil,
}

impl PrimitiveType {
    /// Holding registers and coils live in separate address spaces
    pub fn is_coil(self) -> bool {
        matches!(self, PrimitiveType::Coil)
    }
}

/// Register access mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Access {
    #[serde(rename = "read-only", alias = "ro", alias = "r")]
    ReadOnly,
    #[serde(rename = "read-write", alias = "rw")]
    ReadWrite,
}

impl Access {
    pub fn is_writable(self) -> bool {
        matches!(self, Access::ReadWrite)
    }
}

/// Physical description of one logical register
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RegisterDescriptor {
    pub id: String,
    pub address: u16,
    #[serde(rename = "type")]
    pub primitive_type: PrimitiveType,
    /// Positive integer divisor from raw word to engineering value
    pub scale: u32,
    #[serde(default)]
    pub unit: String,
    pub access: Access,
}

impl RegisterDescriptor {
    pub fn new(
        id: impl Into<String>,
        address: u16,
        primitive_type: PrimitiveType,
        scale: u32,
        unit: impl Into<String>,
        access: Access,
    ) -> Self {
        Self {
            id: id.into(),
            address,
            primitive_type,
            scale,
            unit: unit.into(),
            access,
        }
    }

    /// Number of decimal places implied by the scale
    pub fn decimals(&self) -> u32 {
        self.scale.max(1).ilog10()
    }
}

/// Immutable register map
#[derive(Debug, Clone)]
pub struct RegisterCatalog {
    entries: Vec<RegisterDescriptor>,
    index: HashMap<String, usize>,
}

impl RegisterCatalog {
    /// Build a catalog, rejecting any entry set that breaks the map invariants
    pub fn new(entries: Vec<RegisterDescriptor>) -> Result<Self> {
        let mut index = HashMap::with_capacity(entries.len());
        let mut holding = HashSet::new();
        let mut coils = HashSet::new();

        for (pos, entry) in entries.iter().enumerate() {
            if entry.id.trim().is_empty() {
                return Err(VsdError::config(format!("Register #{} has an empty id", pos + 1)));
            }
            if entry.scale == 0 {
                return Err(VsdError::config(format!(
                    "Register '{}' has scale 0",
                    entry.id
                )));
            }
            if entry.primitive_type.is_coil() && entry.scale != 1 {
                return Err(VsdError::config(format!(
                    "Coil '{}' must have scale 1, got {}",
                    entry.id, entry.scale
                )));
            }
            let family = if entry.primitive_type.is_coil() {
                &mut coils
            } else {
                &mut holding
            };
            if !family.insert(entry.address) {
                return Err(VsdError::config(format!(
                    "Register '{}' reuses {} address {}",
                    entry.id,
                    if entry.primitive_type.is_coil() { "coil" } else { "holding" },
                    entry.address
                )));
            }
            if index.insert(entry.id.clone(), pos).is_some() {
                return Err(VsdError::config(format!("Duplicate register id '{}'", entry.id)));
            }
        }

        Ok(Self { entries, index })
    }

    /// Catalog of the VSD controller and downhole tool
    pub fn builtin() -> Self {
        use Access::{ReadOnly as RO, ReadWrite as RW};
        use PrimitiveType::{Int16, Uint16};

        let table: &[(&str, u16, PrimitiveType, u32, &str, Access)] = &[
            // Controller firmware
            ("fw_ver_code", 1, Uint16, 1, "", RO),
            ("fw_rel_code", 2, Uint16, 1, "", RO),
            // Alarm setpoints
            ("vsd_ol_setpoint_0", 717, Uint16, 10, "A", RW),
            ("vsd_ul_setpoint", 751, Uint16, 10, "A", RW),
            // VSD general monitoring
            ("vsd_supply_voltage", 2103, Uint16, 1, "V", RO),
            ("vsd_temperature", 2102, Int16, 1, "°C", RO),
            // VSD tuning
            ("vsd_motor_rpm", 375, Uint16, 1, "RPM", RW),
            ("vsd_target_freq", 855, Uint16, 100, "Hz", RW),
            ("vsd_min_speed", 856, Uint16, 100, "Hz", RW),
            ("vsd_max_speed", 857, Uint16, 100, "Hz", RW),
            ("vsd_carrier_freq", 862, Uint16, 10, "kHz", RW),
            ("vsd_base_freq", 863, Uint16, 100, "Hz", RW),
            ("vsd_base_volts", 864, Uint16, 1, "V", RW),
            ("vsd_startup_freq", 865, Uint16, 100, "Hz", RW),
            ("vsd_voltage_boost", 869, Uint16, 10, "%", RW),
            // VSD output monitoring
            ("vsd_frequency_out", 2165, Uint16, 100, "Hz", RO),
            ("vsd_volts_in", 2169, Uint16, 10, "V", RO),
            ("vsd_volts_out", 2170, Uint16, 10, "V", RO),
            ("vsd_current", 2174, Uint16, 10, "A", RO),
            ("vsd_motor_current", 2175, Uint16, 10, "A", RO),
            // Downhole tool sensors
            ("dht_intake_pressure", 2136, Uint16, 10, "psi", RO),
            ("dht_discharge_pressure", 2137, Uint16, 10, "psi", RO),
            ("dht_intake_temp", 2139, Uint16, 10, "°C", RO),
            ("dht_motor_temp", 2140, Uint16, 10, "°C", RO),
            ("dht_vibration", 2141, Uint16, 1000, "g", RO),
            ("dht_active_leakage", 2142, Uint16, 1000, "mA", RO),
            ("dht_cz", 2144, Uint16, 1000, "mA", RO),
            ("dht_cf", 2145, Uint16, 1000, "mA", RO),
            ("dht_passive_leakage", 2147, Uint16, 1000, "mA", RO),
            ("dht_diff_pressure", 2161, Int16, 1, "psi", RO),
        ];

        let entries = table
            .iter()
            .map(|&(id, address, ty, scale, unit, access)| {
                RegisterDescriptor::new(id, address, ty, scale, unit, access)
            })
            .collect::<Vec<_>>();
        let index = entries
            .iter()
            .enumerate()
            .map(|(pos, entry)| (entry.id.clone(), pos))
            .collect();

        Self { entries, index }
    }

    /// Load a point table from CSV (`id,address,type,scale,unit,access`)
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            VsdError::config(format!("Cannot open catalog {}: {}", path.display(), e))
        })?;
        let catalog = Self::from_csv_reader(file)?;
        info!("Catalog: {} registers from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    pub fn from_csv_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(reader);

        let mut entries = Vec::new();
        for record in reader.deserialize::<RegisterDescriptor>() {
            let entry = record?;
            debug!("Catalog row: {} @ {}", entry.id, entry.address);
            entries.push(entry);
        }
        Self::new(entries)
    }

    /// Resolve a register id
    pub fn lookup(&self, id: &str) -> Result<&RegisterDescriptor> {
        self.index
            .get(id)
            .and_then(|&pos| self.entries.get(pos))
            .ok_or_else(|| VsdError::NotFound(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisterDescriptor> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
