//! HTTP handlers
//!
//! Each handler maps one request onto one instrument operation and converts
//! `VsdError` into the shared error envelope.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Json,
};
use chrono::Utc;

use super::dto::{
    AppError, ConnectResponse, HealthStatus, MessageResponse, ReadBatchRequest, ReadResponse,
    RegisterInfo, ServiceStatus, SiteNameRequest, SiteNameResponse, StatusResponse,
    SuccessResponse, WriteRequest,
};
use super::routes::AppState;
use crate::core::link::{available_serial_ports, SerialPortInfo};
use crate::core::{BatchResult, ConnectionConfig, WriteAck};

type ApiResult<T> = Result<Json<SuccessResponse<T>>, AppError>;

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(SuccessResponse::new(data)))
}

/// Unwrap a JSON body, turning every parse failure into 400
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(inner)| inner)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

/// Health check endpoint
///
/// @route GET /health
/// @output `Json<SuccessResponse<HealthStatus>>` - liveness of the service, not the device
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthStatus)
    ),
    tag = "vsdsrv"
)]
pub async fn health_check(State(state): State<AppState>) -> ApiResult<HealthStatus> {
    ok(HealthStatus {
        status: ServiceStatus::Healthy,
        service: state.service_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        timestamp: Utc::now(),
    })
}

/// Service and instrument status
#[utoipa::path(
    get,
    path = "/api/status",
    responses(
        (status = 200, description = "Instrument status", body = StatusResponse)
    ),
    tag = "vsdsrv"
)]
pub async fn get_status(State(state): State<AppState>) -> ApiResult<StatusResponse> {
    ok(StatusResponse {
        service: state.service_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        instrument: state.instrument.status().await,
    })
}

/// List serial ports on this host
#[utoipa::path(
    get,
    path = "/api/ports",
    responses(
        (status = 200, description = "Serial ports", body = [SerialPortInfo]),
        (status = 500, description = "Port enumeration failed")
    ),
    tag = "vsdsrv"
)]
pub async fn list_ports() -> ApiResult<Vec<SerialPortInfo>> {
    let ports = tokio::task::spawn_blocking(available_serial_ports)
        .await
        .map_err(|e| AppError::internal_error(format!("Port enumeration task failed: {}", e)))??;
    ok(ports)
}

/// List the register catalog
#[utoipa::path(
    get,
    path = "/api/registers",
    responses(
        (status = 200, description = "Register catalog", body = [RegisterInfo])
    ),
    tag = "vsdsrv"
)]
pub async fn list_registers(State(state): State<AppState>) -> ApiResult<Vec<RegisterInfo>> {
    ok(state
        .instrument
        .catalog()
        .iter()
        .map(RegisterInfo::from)
        .collect())
}

/// Open a session, replacing any live one
#[utoipa::path(
    post,
    path = "/api/connect",
    request_body = ConnectionConfig,
    responses(
        (status = 200, description = "Connected", body = ConnectResponse),
        (status = 400, description = "Invalid connection parameters"),
        (status = 502, description = "Link could not be opened"),
        (status = 504, description = "Device did not answer the probe read")
    ),
    tag = "vsdsrv"
)]
pub async fn connect(
    State(state): State<AppState>,
    payload: Result<Json<ConnectionConfig>, JsonRejection>,
) -> ApiResult<ConnectResponse> {
    let config = body(payload)?;
    let status = state.instrument.connect(&config).await?;
    ok(ConnectResponse {
        message: "Connected".to_string(),
        status,
    })
}

/// Close the live session (no-op when disconnected)
#[utoipa::path(
    post,
    path = "/api/disconnect",
    responses(
        (status = 200, description = "Disconnected", body = MessageResponse)
    ),
    tag = "vsdsrv"
)]
pub async fn disconnect(State(state): State<AppState>) -> ApiResult<MessageResponse> {
    state.instrument.disconnect().await?;
    ok(MessageResponse::new("Disconnected"))
}

/// Read one register
#[utoipa::path(
    get,
    path = "/api/read/{id}",
    params(("id" = String, Path, description = "Register id")),
    responses(
        (status = 200, description = "Decoded value", body = ReadResponse),
        (status = 404, description = "Register not mapped"),
        (status = 409, description = "Not connected"),
        (status = 502, description = "Transaction failed")
    ),
    tag = "vsdsrv"
)]
pub async fn read_register(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ReadResponse> {
    let value = state.instrument.read(&id).await?;
    let unit = state
        .instrument
        .catalog()
        .lookup(&id)
        .map(|desc| desc.unit.clone())
        .unwrap_or_default();
    ok(ReadResponse { id, value, unit })
}

/// Write one register
#[utoipa::path(
    post,
    path = "/api/write",
    request_body = WriteRequest,
    responses(
        (status = 200, description = "Value written", body = WriteAck),
        (status = 400, description = "Value is not a finite number"),
        (status = 403, description = "Register is read-only"),
        (status = 404, description = "Register not mapped"),
        (status = 409, description = "Not connected"),
        (status = 502, description = "Transaction failed")
    ),
    tag = "vsdsrv"
)]
pub async fn write_register(
    State(state): State<AppState>,
    payload: Result<Json<WriteRequest>, JsonRejection>,
) -> ApiResult<WriteAck> {
    let req = body(payload)?;
    ok(state.instrument.write(&req.id, req.value).await?)
}

/// Read several registers under one lock
#[utoipa::path(
    post,
    path = "/api/read_batch",
    request_body = ReadBatchRequest,
    responses(
        (status = 200, description = "id → value, null where the read failed", body = serde_json::Value),
        (status = 409, description = "Not connected"),
        (status = 503, description = "Device unresponsive")
    ),
    tag = "vsdsrv"
)]
pub async fn read_batch(
    State(state): State<AppState>,
    payload: Result<Json<ReadBatchRequest>, JsonRejection>,
) -> ApiResult<BatchResult> {
    let req = body(payload)?;
    ok(state.instrument.read_batch(&req.ids).await?)
}

/// Read the site name
#[utoipa::path(
    get,
    path = "/api/site_name",
    responses(
        (status = 200, description = "Site name", body = SiteNameResponse),
        (status = 409, description = "Not connected")
    ),
    tag = "vsdsrv"
)]
pub async fn get_site_name(State(state): State<AppState>) -> ApiResult<SiteNameResponse> {
    let name = state.instrument.read_site_name().await?;
    ok(SiteNameResponse { name })
}

/// Write the site name (10 characters max)
#[utoipa::path(
    post,
    path = "/api/site_name",
    request_body = SiteNameRequest,
    responses(
        (status = 200, description = "Site name as stored", body = SiteNameResponse),
        (status = 409, description = "Not connected")
    ),
    tag = "vsdsrv"
)]
pub async fn set_site_name(
    State(state): State<AppState>,
    payload: Result<Json<SiteNameRequest>, JsonRejection>,
) -> ApiResult<SiteNameResponse> {
    let req = body(payload)?;
    let name = state.instrument.write_site_name(&req.name).await?;
    ok(SiteNameResponse { name })
}
