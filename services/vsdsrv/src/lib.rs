//! VSD Register Access Service (`vsdsrv`)
//!
//! Typed, scaled and serialized access to the registers of a variable-speed
//! drive and its downhole sensor tool over Modbus RTU or TCP.
//!
//! Control flow: API layer → [`core::Instrument`] → [`core::Session`] →
//! `voltage_modbus` function-code primitives.

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod core;
pub mod error;
pub mod test_utils;

pub use error::{Result, VsdError};
