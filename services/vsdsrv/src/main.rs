//! VSD Register Access Service (`vsdsrv`)

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use vsdsrv::{
    api::{create_routes, AppState},
    bootstrap::{self, Args},
    core::{Instrument, ModbusConnector},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = args.load_config().context("Failed to load configuration")?;

    let service_info = bootstrap::service_info(&config);
    bootstrap::initialize_logging(&config, &service_info)?;
    if !args.no_banner {
        common::service_bootstrap::print_startup_banner(&service_info);
    }

    // Validation mode: validate and exit
    if args.validate {
        bootstrap::validate_configuration(&config)?;
        info!("Validation completed successfully");
        return Ok(());
    }

    let catalog = Arc::new(bootstrap::validate_configuration(&config)?);
    let instrument = Arc::new(Instrument::new(
        catalog,
        Arc::new(ModbusConnector),
        config.instrument.settings(),
    ));

    let app = create_routes(AppState::new(instrument.clone(), &config.service.name));

    let bind = config.api.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!("API listening on http://{}", bind);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(common::shutdown::wait_for_shutdown())
        .await
    {
        error!("API server error: {}", e);
    }

    info!("Shutting down, closing instrument session");
    instrument.disconnect().await?;
    info!("Service stopped");
    Ok(())
}
