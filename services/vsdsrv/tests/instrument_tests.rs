//! Instrument behaviour against the in-memory device

mod common;

use std::time::Duration;

use vsdsrv::core::{PointValue, RawValue};
use vsdsrv::test_utils::{MockDevice, Op};
use vsdsrv::VsdError;

use common::{field_device, instrument, serial_config};

fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_concurrent_write_never_splits_a_batch() {
    let device = field_device().with_delay(Duration::from_millis(5));
    let inst = instrument(&device);
    inst.connect(&serial_config()).await.unwrap();
    device.clear_ops();

    let batch_ids = ids(&["vsd_current", "vsd_motor_current", "vsd_motor_rpm", "dht_intake_pressure"]);
    let batch_inst = inst.clone();
    let batch = tokio::spawn(async move { batch_inst.read_batch(&batch_ids).await });
    // Let the batch take the lock first
    tokio::time::sleep(Duration::from_millis(1)).await;
    let write = inst.write("vsd_target_freq", 55.5).await.unwrap();
    let batch = batch.await.unwrap().unwrap();

    assert_eq!(write.raw, RawValue::Word(5550));
    assert_eq!(batch.len(), 4);

    let ops = device.ops();
    let write_pos = ops
        .iter()
        .position(|op| matches!(op, Op::WriteHolding { .. }))
        .unwrap();
    let reads: Vec<usize> = ops
        .iter()
        .enumerate()
        .filter(|(_, op)| matches!(op, Op::ReadHolding { .. }))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(reads.len(), 4);
    let all_before = reads.iter().all(|&i| i < write_pos);
    let all_after = reads.iter().all(|&i| i > write_pos);
    assert!(all_before || all_after, "write interleaved with batch: {:?}", ops);
}

#[tokio::test]
async fn test_probe_failure_then_read_is_not_connected_without_io() {
    let device = MockDevice::new().silent();
    let inst = instrument(&device);

    let err = inst.connect(&serial_config()).await.unwrap_err();
    assert!(matches!(err, VsdError::ProbeFailed(_)));
    assert!(err.needs_reconnect());

    let before = device.ops().len();
    assert_eq!(
        inst.read("vsd_target_freq").await.unwrap_err(),
        VsdError::NotConnected
    );
    assert_eq!(device.ops().len(), before);
}

#[tokio::test]
async fn test_operator_session() {
    let device = field_device();
    let inst = instrument(&device);
    inst.connect(&serial_config()).await.unwrap();

    // Setpoint change and read-back
    inst.write("vsd_target_freq", 58.25).await.unwrap();
    assert_eq!(device.holding(855), Some(5825));
    assert_eq!(
        inst.read("vsd_target_freq").await.unwrap(),
        PointValue::Float(58.25)
    );

    // Live poll with one unmapped id
    let poll = inst
        .read_batch(&ids(&["vsd_temperature", "dht_intake_pressure", "not_mapped"]))
        .await
        .unwrap();
    assert_eq!(poll["vsd_temperature"], Some(PointValue::Int(-3)));
    assert_eq!(poll["dht_intake_pressure"], Some(PointValue::Float(1234.5)));
    assert_eq!(poll["not_mapped"], None);

    // Cable pulled: everything times out
    device.set_silent(true);
    assert_eq!(
        inst.read_batch(&ids(&["vsd_current"])).await.unwrap_err(),
        VsdError::DeviceUnresponsive
    );
    assert!(matches!(
        inst.read("vsd_current").await,
        Err(VsdError::Transaction(_))
    ));

    // Reconnect attempt fails the probe and leaves the slot empty
    assert!(matches!(
        inst.connect(&serial_config()).await,
        Err(VsdError::ProbeFailed(_))
    ));
    assert!(!inst.status().await.connected);

    // Cable back
    device.set_silent(false);
    inst.connect(&serial_config()).await.unwrap();
    assert_eq!(inst.read("vsd_motor_rpm").await.unwrap(), PointValue::Int(3450));
}

#[tokio::test]
async fn test_custom_probe_address() {
    let device = MockDevice::new().failing_at(855);
    let inst = std::sync::Arc::new(vsdsrv::core::Instrument::new(
        std::sync::Arc::new(vsdsrv::core::RegisterCatalog::builtin()),
        std::sync::Arc::new(device.clone()),
        vsdsrv::core::InstrumentSettings {
            probe_address: 2103,
            site_name_address: 0,
        },
    ));
    inst.connect(&serial_config()).await.unwrap();
    assert!(device.ops().contains(&Op::ReadHolding {
        address: 2103,
        count: 1
    }));
}
