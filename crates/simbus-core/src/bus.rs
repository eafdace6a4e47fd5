//! Per-bus device table.
//!
//! Each bus owns one mutex guarding its slot list, occupied count, noise
//! level, and transaction counter. Lookup is a linear scan: the table is
//! bounded by [`MAX_DEVICES`], so a hash map would buy nothing.
//!
//! # Locking
//!
//! The bus lock is ordered before any device-internal lock: dispatch runs
//! the backend callback while the guard is held, and backends never reach
//! back into the table. Removal unlinks the slot under the lock but drops
//! the backend only after the guard is released, so teardown that blocks
//! (a backend waiting on its own lock) cannot extend the bus-lock hold time.
//! Slots are marked absent rather than removed, so a concurrent lookup
//! holding the lock never observes a torn slot; vacated slots are reused by
//! the next insertion.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::device::DeviceBackend;
use crate::error::BusError;

/// Number of independent buses owned by a simulator.
pub const BUS_COUNT: usize = 2;

/// Maximum devices registered per bus.
pub const MAX_DEVICES: usize = 8;

/// Bus index in `[0, BUS_COUNT)`.
pub type BusId = usize;

/// Default per-bus noise level (1% of transactions jittered).
const DEFAULT_NOISE_LEVEL: f64 = 0.01;

struct DeviceSlot {
    address: u8,
    present: bool,
    backend: Option<Arc<dyn DeviceBackend>>,
}

struct BusTable {
    slots: Vec<DeviceSlot>,
    device_count: usize,
    noise_level: f64,
    transactions: u64,
}

impl BusTable {
    fn find(&self, address: u8) -> Option<usize> {
        self.slots.iter().position(|slot| slot.present && slot.address == address)
    }
}

pub(crate) struct Bus {
    table: Mutex<BusTable>,
}

impl Bus {
    pub(crate) fn new() -> Self {
        Self {
            table: Mutex::new(BusTable {
                slots: Vec::new(),
                device_count: 0,
                noise_level: DEFAULT_NOISE_LEVEL,
                transactions: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BusTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Construct a backend via `make` and bind it to a slot, all under the
    /// bus lock. A constructor failure leaves the table untouched.
    pub(crate) fn add_device(
        &self,
        address: u8,
        make: impl FnOnce() -> Result<Arc<dyn DeviceBackend>, BusError>,
    ) -> Result<(), BusError> {
        let mut table = self.lock();
        if table.find(address).is_some() {
            return Err(BusError::AlreadyExists { address });
        }
        if table.device_count >= MAX_DEVICES {
            return Err(BusError::OutOfCapacity { capacity: MAX_DEVICES });
        }

        let backend = make()?;
        let slot = DeviceSlot { address, present: true, backend: Some(backend) };
        if let Some(vacant) = table.slots.iter().position(|s| !s.present) {
            table.slots[vacant] = slot;
        } else {
            table.slots.push(slot);
        }
        table.device_count += 1;
        Ok(())
    }

    /// Unlink the device at `address` and hand its backend to the caller,
    /// who drops it outside the bus lock.
    pub(crate) fn remove_device(&self, address: u8) -> Result<Arc<dyn DeviceBackend>, BusError> {
        let mut table = self.lock();
        let index = table.find(address).ok_or(BusError::NotFound { address })?;
        table.slots[index].present = false;
        table.device_count -= 1;
        let backend = table.slots[index].backend.take();
        drop(table);

        backend.ok_or(BusError::NotFound { address })
    }

    /// Bump the transaction counter and return the current noise level.
    ///
    /// Called once per transaction before any simulated sleep; the counter
    /// update is the only work done under the lock.
    pub(crate) fn begin_transaction(&self) -> f64 {
        let mut table = self.lock();
        table.transactions += 1;
        table.noise_level
    }

    /// Look up `address` and run `op` against its backend while the bus
    /// lock is held. Returns `None` when no present device matches.
    pub(crate) fn dispatch<T>(
        &self,
        address: u8,
        op: impl FnOnce(&dyn DeviceBackend) -> Result<T, BusError>,
    ) -> Option<Result<T, BusError>> {
        let table = self.lock();
        let index = table.find(address)?;
        let backend = table.slots[index].backend.as_deref()?;
        Some(op(backend))
    }

    /// Clone the `Arc`s of all present devices into `out`.
    ///
    /// The background updater uses this to advance device state without
    /// holding the bus lock across the device-internal locks.
    pub(crate) fn collect_backends(&self, out: &mut Vec<Arc<dyn DeviceBackend>>) {
        let table = self.lock();
        for slot in &table.slots {
            if slot.present {
                if let Some(backend) = &slot.backend {
                    out.push(Arc::clone(backend));
                }
            }
        }
    }

    pub(crate) fn set_noise_level(&self, level: f64) -> Result<(), BusError> {
        if !level.is_finite() || !(0.0..=1.0).contains(&level) {
            return Err(BusError::invalid_argument(format!(
                "noise level {level} outside [0.0, 1.0]"
            )));
        }
        self.lock().noise_level = level;
        Ok(())
    }

    pub(crate) fn noise_level(&self) -> f64 {
        self.lock().noise_level
    }

    pub(crate) fn transactions(&self) -> u64 {
        self.lock().transactions
    }

    #[cfg(test)]
    fn device_count(&self) -> usize {
        self.lock().device_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Nop;

    impl DeviceBackend for Nop {
        fn read_register(&self, _register: u8) -> Result<u8, BusError> {
            Ok(0)
        }

        fn write_register(&self, _register: u8, _value: u8) -> Result<(), BusError> {
            Ok(())
        }
    }

    fn nop() -> Result<Arc<dyn DeviceBackend>, BusError> {
        Ok(Arc::new(Nop))
    }

    #[test]
    fn duplicate_address_rejected_while_present() {
        let bus = Bus::new();
        bus.add_device(0x68, nop).unwrap();
        assert_eq!(bus.add_device(0x68, nop).unwrap_err(), BusError::AlreadyExists {
            address: 0x68
        });

        bus.remove_device(0x68).unwrap();
        bus.add_device(0x68, nop).unwrap();
    }

    #[test]
    fn capacity_is_enforced_and_slots_are_reused() {
        let bus = Bus::new();
        for address in 0..MAX_DEVICES as u8 {
            bus.add_device(address, nop).unwrap();
        }
        assert_eq!(bus.add_device(0x70, nop).unwrap_err(), BusError::OutOfCapacity {
            capacity: MAX_DEVICES
        });

        bus.remove_device(3).unwrap();
        bus.add_device(0x70, nop).unwrap();
        assert_eq!(bus.device_count(), MAX_DEVICES);
    }

    #[test]
    fn constructor_failure_rolls_back_the_reservation() {
        let bus = Bus::new();
        let err = bus.add_device(0x68, || Err(BusError::IoFault)).unwrap_err();
        assert_eq!(err, BusError::IoFault);
        assert_eq!(bus.device_count(), 0);
        bus.add_device(0x68, nop).unwrap();
    }

    #[test]
    fn dispatch_misses_absent_devices() {
        let bus = Bus::new();
        bus.add_device(0x68, nop).unwrap();
        assert!(bus.dispatch(0x68, |d| d.read_register(0)).is_some());
        assert!(bus.dispatch(0x69, |d| d.read_register(0)).is_none());

        bus.remove_device(0x68).unwrap();
        assert!(bus.dispatch(0x68, |d| d.read_register(0)).is_none());
    }

    #[test]
    fn noise_level_bounds_are_validated() {
        let bus = Bus::new();
        bus.set_noise_level(0.0).unwrap();
        bus.set_noise_level(1.0).unwrap();
        assert!(bus.set_noise_level(1.5).is_err());
        assert!(bus.set_noise_level(-0.1).is_err());
        assert!(bus.set_noise_level(f64::NAN).is_err());
        assert!((bus.noise_level() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn begin_transaction_counts_every_call() {
        let bus = Bus::new();
        for _ in 0..5 {
            bus.begin_transaction();
        }
        assert_eq!(bus.transactions(), 5);
    }
}
