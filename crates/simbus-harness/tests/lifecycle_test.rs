//! Device registration, lookup, and teardown through the public bus surface.

use simbus_core::{BusError, MAX_DEVICES};
use simbus_harness::Rig;
use simbus_motion::regs;

#[test]
fn duplicate_address_is_rejected() {
    let rig = Rig::new();
    rig.add_motion(0, 0x68).unwrap();

    let err = rig.sim.add_device(0, 0x68, simbus_motion::KIND).unwrap_err();
    assert_eq!(err, BusError::AlreadyExists { address: 0x68 });
}

#[test]
fn address_is_reusable_after_removal() {
    let rig = Rig::new();
    let first = rig.add_motion(0, 0x68).unwrap();
    rig.wake(0, 0x68).unwrap();
    rig.sim.write_byte(0, 0x68, regs::ACCEL_CONFIG, 0x18).unwrap();

    rig.sim.remove_device(0, 0x68).unwrap();
    rig.add_motion(0, 0x68).unwrap();

    // The replacement is a fresh device, not the configured one.
    assert_eq!(rig.sim.read_byte(0, 0x68, regs::ACCEL_CONFIG).unwrap(), 0x00);
    assert_eq!(rig.sim.read_byte(0, 0x68, regs::PWR_MGMT_1).unwrap(), regs::PWR_MGMT_1_RESET);
    drop(first);
}

#[test]
fn bus_capacity_is_enforced_and_slots_are_reclaimed() {
    let rig = Rig::new();
    for i in 0..MAX_DEVICES {
        rig.add_motion(0, 0x10 + i as u8).unwrap();
    }

    let err = rig.sim.add_device(0, 0x50, simbus_motion::KIND).unwrap_err();
    assert_eq!(err, BusError::OutOfCapacity { capacity: MAX_DEVICES });

    rig.sim.remove_device(0, 0x12).unwrap();
    rig.add_motion(0, 0x50).unwrap();
    assert_eq!(rig.sim.read_byte(0, 0x50, regs::WHO_AM_I).unwrap(), regs::WHO_AM_I_VALUE);
}

#[test]
fn unknown_device_kind_is_rejected() {
    let rig = Rig::new();
    let err = rig.sim.add_device(0, 0x68, "barometer").unwrap_err();
    assert_eq!(err, BusError::Unsupported { kind: "barometer".into() });
}

#[test]
fn buses_have_independent_address_spaces() {
    let rig = Rig::new();
    rig.add_motion(0, 0x68).unwrap();
    rig.add_motion(1, 0x68).unwrap();

    rig.wake(0, 0x68).unwrap();
    rig.sim.write_byte(0, 0x68, regs::GYRO_CONFIG, 0x10).unwrap();

    // The same address on the other bus is a different device.
    assert_eq!(rig.sim.read_byte(1, 0x68, regs::GYRO_CONFIG).unwrap(), 0x00);
    assert_eq!(rig.sim.read_byte(1, 0x68, regs::PWR_MGMT_1).unwrap(), regs::PWR_MGMT_1_RESET);
}

#[test]
fn bad_bus_index_is_rejected_before_accounting() {
    let rig = Rig::new();
    rig.add_motion(0, 0x68).unwrap();
    let before = rig.sim.metrics_snapshot();

    assert!(matches!(
        rig.sim.read_byte(99, 0x68, regs::WHO_AM_I),
        Err(BusError::InvalidArgument(_))
    ));
    assert!(matches!(rig.sim.bus_transaction_count(99), Err(BusError::InvalidArgument(_))));

    assert_eq!(rig.sim.metrics_snapshot(), before, "caller bugs must not skew statistics");
}

#[test]
fn wake_read_remove_scenario() {
    let rig = Rig::new();
    rig.add_motion(1, 0x68).unwrap();

    // Fresh device answers its identity but sits asleep.
    assert_eq!(rig.sim.read_byte(1, 0x68, regs::WHO_AM_I).unwrap(), regs::WHO_AM_I_VALUE);
    assert_eq!(
        rig.sim.read_byte(1, 0x68, regs::PWR_MGMT_1).unwrap() & regs::SLEEP_BIT,
        regs::SLEEP_BIT
    );

    rig.wake(1, 0x68).unwrap();
    let frame = rig.sim.read_burst(1, 0x68, regs::ACCEL_XOUT_H, 14).unwrap();
    assert_eq!(i16::from_be_bytes([frame[4], frame[5]]), 16384, "one g on Z at rest");

    rig.sim.remove_device(1, 0x68).unwrap();
    assert_eq!(
        rig.sim.read_byte(1, 0x68, regs::WHO_AM_I).unwrap_err(),
        BusError::NotFound { address: 0x68 }
    );
    assert_eq!(
        rig.sim.remove_device(1, 0x68).unwrap_err(),
        BusError::NotFound { address: 0x68 }
    );
}
