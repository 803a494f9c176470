//! API Route Configuration

use std::sync::Arc;

use axum::{
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use super::handlers;
use crate::core::Instrument;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub instrument: Arc<Instrument>,
    pub service_name: String,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(instrument: Arc<Instrument>, service_name: impl Into<String>) -> Self {
        Self {
            instrument,
            service_name: service_name.into(),
            started_at: Utc::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        (Utc::now() - self.started_at)
            .num_seconds()
            .max(0)
            .try_into()
            .unwrap_or(0)
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health_check,
        handlers::get_status,
        handlers::list_ports,
        handlers::list_registers,
        handlers::connect,
        handlers::disconnect,
        handlers::read_register,
        handlers::write_register,
        handlers::read_batch,
        handlers::get_site_name,
        handlers::set_site_name
    ),
    components(
        schemas(
            crate::core::ConnectionConfig,
            crate::core::TransportKind,
            crate::core::Parity,
            crate::core::InstrumentStatus,
            crate::core::AddressingConvention,
            crate::core::PointValue,
            crate::core::RawValue,
            crate::core::WriteAck,
            crate::core::link::SerialPortInfo,
            super::dto::WriteRequest,
            super::dto::ReadBatchRequest,
            super::dto::SiteNameRequest,
            super::dto::SiteNameResponse,
            super::dto::ReadResponse,
            super::dto::RegisterInfo,
            super::dto::StatusResponse,
            super::dto::ConnectResponse,
            super::dto::MessageResponse
        )
    ),
    tags(
        (name = "vsdsrv", description = "VSD / downhole tool register access")
    )
)]
pub struct VsdApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(VsdApiDoc::openapi())
}

/// Create all API routes
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/status", get(handlers::get_status))
        .route("/api/ports", get(handlers::list_ports))
        .route("/api/registers", get(handlers::list_registers))
        .route("/api/connect", post(handlers::connect))
        .route("/api/disconnect", post(handlers::disconnect))
        .route("/api/read/{id}", get(handlers::read_register))
        .route("/api/write", post(handlers::write_register))
        .route("/api/read_batch", post(handlers::read_batch))
        .route(
            "/api/site_name",
            get(handlers::get_site_name).post(handlers::set_site_name),
        )
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
