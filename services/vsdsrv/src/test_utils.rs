//! Test utilities for vsdsrv
//!
//! `MockDevice` is an in-memory Modbus device that plugs into the same
//! `Connector`/`RegisterLink` seams as the real transports. Every transaction
//! is appended to an operation log so tests can assert on exact I/O.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::connection::ConnectionConfig;
use crate::core::link::{AddressingConvention, Connector, DeviceAddress, RegisterLink};
use crate::error::{Result, VsdError};

/// One transaction seen by the mock device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Open,
    ReadHolding { address: u16, count: u16 },
    ReadCoil { address: u16 },
    WriteHolding { address: u16, values: Vec<u16> },
    WriteCoil { address: u16, value: bool },
    Close,
}

#[derive(Debug, Default)]
struct DeviceState {
    holding: HashMap<u16, u16>,
    coils: HashMap<u16, bool>,
    failing: HashSet<u16>,
    conventions: Option<Vec<AddressingConvention>>,
    silent: bool,
    unreachable: bool,
    delay: Option<Duration>,
    ops: Vec<Op>,
    last_device: Option<DeviceAddress>,
    last_config: Option<ConnectionConfig>,
}

/// Shared handle to an in-memory device; clones see the same registers and log
#[derive(Debug, Clone, Default)]
pub struct MockDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_holding(self, address: u16, value: u16) -> Self {
        self.set_holding(address, value);
        self
    }

    pub fn with_coil(self, address: u16, value: bool) -> Self {
        self.state.lock().coils.insert(address, value);
        self
    }

    /// Transactions touching this address fail
    pub fn failing_at(self, address: u16) -> Self {
        self.state.lock().failing.insert(address);
        self
    }

    /// Conventions reported by opened links; unreported by default
    pub fn with_conventions(self, conventions: Vec<AddressingConvention>) -> Self {
        self.state.lock().conventions = Some(conventions);
        self
    }

    /// Every transaction times out
    pub fn silent(self) -> Self {
        self.set_silent(true);
        self
    }

    /// Opening a link fails
    pub fn unreachable(self) -> Self {
        self.state.lock().unreachable = true;
        self
    }

    /// Each transaction takes this long
    pub fn with_delay(self, delay: Duration) -> Self {
        self.state.lock().delay = Some(delay);
        self
    }

    pub fn set_holding(&self, address: u16, value: u16) {
        self.state.lock().holding.insert(address, value);
    }

    pub fn set_silent(&self, silent: bool) {
        self.state.lock().silent = silent;
    }

    pub fn holding(&self, address: u16) -> Option<u16> {
        self.state.lock().holding.get(&address).copied()
    }

    pub fn coil(&self, address: u16) -> Option<bool> {
        self.state.lock().coils.get(&address).copied()
    }

    pub fn ops(&self) -> Vec<Op> {
        self.state.lock().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.state.lock().ops.clear();
    }

    /// Parameters handed to the most recent successful open
    pub fn last_config(&self) -> Option<ConnectionConfig> {
        self.state.lock().last_config.clone()
    }

    /// Addressing used by the most recent transaction
    pub fn last_device(&self) -> Option<DeviceAddress> {
        self.state.lock().last_device
    }

    async fn transact<T>(
        &self,
        device: DeviceAddress,
        addresses: std::ops::Range<u32>,
        op: Op,
        apply: impl FnOnce(&mut DeviceState) -> T,
    ) -> Result<T> {
        let delay = self.state.lock().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        state.ops.push(op);
        state.last_device = Some(device);

        if state.silent {
            return Err(VsdError::transaction("response timeout"));
        }
        if let Some(accepted) = &state.conventions {
            if !accepted.contains(&device.convention) {
                return Err(VsdError::transaction(format!(
                    "addressing {:?} not accepted",
                    device.convention
                )));
            }
        }
        if let Some(bad) = addresses
            .clone()
            .find(|a| u16::try_from(*a).is_ok_and(|a| state.failing.contains(&a)))
        {
            return Err(VsdError::transaction(format!(
                "exception response at address {}",
                bad
            )));
        }
        Ok(apply(&mut state))
    }
}

fn span(address: u16, count: usize) -> std::ops::Range<u32> {
    let start = u32::from(address);
    start..start + count as u32
}

#[async_trait]
impl Connector for MockDevice {
    async fn open(&self, config: &ConnectionConfig) -> Result<Box<dyn RegisterLink>> {
        config.validate()?;
        let mut state = self.state.lock();
        if state.unreachable {
            return Err(VsdError::connection(format!(
                "cannot open {}",
                config.endpoint()
            )));
        }
        state.ops.push(Op::Open);
        state.last_config = Some(config.clone());
        Ok(Box::new(MockLink {
            device: self.clone(),
        }))
    }
}

/// Link handed out by `MockDevice`
#[derive(Debug)]
pub struct MockLink {
    device: MockDevice,
}

#[async_trait]
impl RegisterLink for MockLink {
    fn addressing_conventions(&self) -> Option<Vec<AddressingConvention>> {
        self.device.state.lock().conventions.clone()
    }

    async fn read_holding(
        &mut self,
        device: DeviceAddress,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>> {
        self.device
            .transact(
                device,
                span(address, usize::from(count)),
                Op::ReadHolding { address, count },
                |state| {
                    (0..count)
                        .map(|i| {
                            let addr = address.wrapping_add(i);
                            state.holding.get(&addr).copied().unwrap_or(0)
                        })
                        .collect()
                },
            )
            .await
    }

    async fn read_coil(&mut self, device: DeviceAddress, address: u16) -> Result<bool> {
        self.device
            .transact(device, span(address, 1), Op::ReadCoil { address }, |state| {
                state.coils.get(&address).copied().unwrap_or(false)
            })
            .await
    }

    async fn write_holding(
        &mut self,
        device: DeviceAddress,
        address: u16,
        values: &[u16],
    ) -> Result<()> {
        let op = Op::WriteHolding {
            address,
            values: values.to_vec(),
        };
        self.device
            .transact(device, span(address, values.len()), op, |state| {
                for (i, value) in values.iter().enumerate() {
                    state
                        .holding
                        .insert(address.wrapping_add(i as u16), *value);
                }
            })
            .await
    }

    async fn write_coil(
        &mut self,
        device: DeviceAddress,
        address: u16,
        value: bool,
    ) -> Result<()> {
        self.device
            .transact(device, span(address, 1), Op::WriteCoil { address, value }, |state| {
                state.coils.insert(address, value);
            })
            .await
    }

    async fn close(&mut self) -> Result<()> {
        self.device.state.lock().ops.push(Op::Close);
        Ok(())
    }
}
