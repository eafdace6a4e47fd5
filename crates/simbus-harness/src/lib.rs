//! Integration and stress harness for the simulated sensor bus.
//!
//! [`Rig`] wires a [`Simulator`] to the motion backend with deterministic
//! timing (zero latency, zero noise) and keeps a handle to every sensor it
//! creates, so tests can steer fault injection and waveform patterns while
//! driving the device through the public bus surface.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::sync::{Arc, Mutex, PoisonError};

use simbus_core::{BUS_COUNT, BackendRegistry, BusError, BusId, Simulator};
use simbus_motion::{self as motion, MotionSensor, regs};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

type SensorLog = Arc<Mutex<Vec<(u8, Arc<MotionSensor>)>>>;

/// Install a fmt subscriber honoring `RUST_LOG`. Safe to call from every
/// test; only the first call wins.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(filter)
        .try_init();
}

/// A simulator preconfigured for deterministic tests, plus direct handles to
/// the motion sensors it constructs.
pub struct Rig {
    /// The simulator under test.
    pub sim: Simulator,
    sensors: SensorLog,
}

impl Rig {
    /// Build a rig with zero global latency and zero noise on every bus.
    #[must_use]
    pub fn new() -> Self {
        let sensors: SensorLog = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&sensors);

        let mut registry = BackendRegistry::new();
        registry.register(motion::KIND, move |address| {
            let sensor = Arc::new(MotionSensor::new(address));
            log.lock().unwrap_or_else(PoisonError::into_inner).push((address, Arc::clone(&sensor)));
            Ok(sensor as Arc<dyn simbus_core::DeviceBackend>)
        });

        let sim = Simulator::new(registry);
        sim.set_global_latency_us(0);
        for bus in 0..BUS_COUNT {
            // The index is in range, so this cannot fail.
            let _ = sim.set_bus_noise_level(bus, 0.0);
        }
        Self { sim, sensors }
    }

    /// Add a motion sensor at `(bus, address)` and return its direct handle.
    pub fn add_motion(&self, bus: BusId, address: u8) -> Result<Arc<MotionSensor>, BusError> {
        self.sim.add_device(bus, address, motion::KIND)?;
        self.sensor(address).ok_or_else(|| {
            BusError::InvalidArgument(format!("no captured sensor for address 0x{address:02X}"))
        })
    }

    /// Most recently constructed sensor registered at `address`, if any.
    #[must_use]
    pub fn sensor(&self, address: u8) -> Option<Arc<MotionSensor>> {
        self.sensors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|(addr, _)| *addr == address)
            .map(|(_, sensor)| Arc::clone(sensor))
    }

    /// Clear the sleep bit of the sensor at `(bus, address)` over the bus.
    pub fn wake(&self, bus: BusId, address: u8) -> Result<(), BusError> {
        self.sim.write_byte(bus, address, regs::PWR_MGMT_1, 0x00)
    }
}

impl Default for Rig {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `threads` reader threads, each issuing `ops` identity reads against
/// `(bus, address)`. Returns the successful read count per thread.
#[must_use]
pub fn spawn_readers(
    sim: &Simulator,
    bus: BusId,
    address: u8,
    threads: usize,
    ops: usize,
) -> Vec<u64> {
    std::thread::scope(|scope| {
        let workers: Vec<_> = (0..threads)
            .map(|_| {
                scope.spawn(move || {
                    (0..ops)
                        .filter(|_| sim.read_byte(bus, address, regs::WHO_AM_I).is_ok())
                        .count() as u64
                })
            })
            .collect();
        workers.into_iter().filter_map(|w| w.join().ok()).collect()
    })
}

#[cfg(test)]
mod tests {
    use simbus_core::DeviceBackend;

    use super::*;

    #[test]
    fn rig_captures_sensor_handles() {
        let rig = Rig::new();
        let handle = rig.add_motion(0, 0x68).unwrap();
        assert_eq!(handle.read_register(regs::WHO_AM_I).unwrap(), regs::WHO_AM_I_VALUE);
        assert!(rig.sensor(0x69).is_none());
    }

    #[test]
    fn rig_buses_are_deterministic() {
        let rig = Rig::new();
        assert_eq!(rig.sim.global_latency_us(), 0);
        for bus in 0..BUS_COUNT {
            assert_eq!(rig.sim.bus_noise_level(bus).unwrap(), 0.0);
        }
    }
}
