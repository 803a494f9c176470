//! Request and response bodies of the HTTP API

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use crate::core::{Access, InstrumentStatus, PointValue, PrimitiveType, RegisterDescriptor};

pub use common::{AppError, HealthStatus, ServiceStatus, SuccessResponse};

/// Accept `60.5` as well as `"60.5"`; anything else is not a number
fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberLike {
        Number(f64),
        Text(String),
    }

    match NumberLike::deserialize(deserializer)? {
        NumberLike::Number(v) => Ok(v),
        NumberLike::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("'{}' is not a number", s))),
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct WriteRequest {
    pub id: String,
    #[serde(deserialize_with = "number_or_numeric_string")]
    #[schema(value_type = f64)]
    pub value: f64,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ReadBatchRequest {
    #[serde(default)]
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SiteNameRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SiteNameResponse {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReadResponse {
    pub id: String,
    pub value: PointValue,
    pub unit: String,
}

/// Catalog entry as listed by the API
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RegisterInfo {
    pub id: String,
    pub address: u16,
    #[serde(rename = "type")]
    pub primitive_type: PrimitiveType,
    pub scale: u32,
    pub decimals: u32,
    pub unit: String,
    pub access: Access,
}

impl From<&RegisterDescriptor> for RegisterInfo {
    fn from(desc: &RegisterDescriptor) -> Self {
        Self {
            id: desc.id.clone(),
            address: desc.address,
            primitive_type: desc.primitive_type,
            scale: desc.scale,
            decimals: desc.decimals(),
            unit: desc.unit.clone(),
            access: desc.access,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatusResponse {
    pub service: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub instrument: InstrumentStatus,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Connect result: status of the new session
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConnectResponse {
    pub message: String,
    pub status: InstrumentStatus,
}
