//! Shared fixtures for vsdsrv integration tests

#![allow(dead_code)]

use std::sync::Arc;

use vsdsrv::api::{create_routes, AppState};
use vsdsrv::core::{ConnectionConfig, Instrument, InstrumentSettings, RegisterCatalog};
use vsdsrv::test_utils::MockDevice;

pub fn serial_config() -> ConnectionConfig {
    ConnectionConfig::serial("/dev/ttyMOCK0")
}

/// Device with plausible live values for the built-in map
pub fn field_device() -> MockDevice {
    MockDevice::new()
        .with_holding(855, 6000) // vsd_target_freq 60.00 Hz
        .with_holding(375, 3450) // vsd_motor_rpm
        .with_holding(2174, 425) // vsd_current 42.5 A
        .with_holding(2175, 410) // vsd_motor_current 41.0 A
        .with_holding(2102, 0xFFFD) // vsd_temperature -3 °C
        .with_holding(2136, 12345) // dht_intake_pressure 1234.5 psi
}

pub fn instrument(device: &MockDevice) -> Arc<Instrument> {
    Arc::new(Instrument::new(
        Arc::new(RegisterCatalog::builtin()),
        Arc::new(device.clone()),
        InstrumentSettings::default(),
    ))
}

pub fn router(device: &MockDevice) -> (axum::Router, Arc<Instrument>) {
    let inst = instrument(device);
    (create_routes(AppState::new(inst.clone(), "vsdsrv")), inst)
}
