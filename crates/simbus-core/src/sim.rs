//! Simulator context and transaction engine.
//!
//! [`Simulator`] is an explicit context object owned by the caller; there is
//! no process-global state, so independent simulators can coexist in one
//! test process. Construction starts the background updater and
//! [`Simulator::shutdown`] (also run on drop) stops and joins it before the
//! context is torn down.
//!
//! # Transaction path
//!
//! Every entry point follows the same sequence:
//!
//! 1. record a start timestamp
//! 2. sleep the global processing delay (bus turnaround), outside any lock
//! 3. bump the bus transaction counter, then with probability equal to the
//!    bus noise level sleep a 0-50 us jitter, again outside any lock
//! 4. acquire the bus lock and look up the device; absent devices count one
//!    error and return [`BusError::NotFound`]
//! 5. dispatch to the backend under the bus lock (bus lock always ordered
//!    before the backend's internal lock)
//! 6. release the lock, then fold elapsed time and outcome into the metrics
//!
//! Validation failures (bad bus index, zero-length burst) are caller bugs
//! and are rejected before step 1, so they never skew latency statistics.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use rand::Rng;

use crate::bus::{BUS_COUNT, Bus, BusId};
use crate::device::{BackendRegistry, DeviceBackend};
use crate::error::BusError;
use crate::metrics::{Metrics, MetricsSnapshot, OpKind};
use crate::noise::{JITTER_MAX_US, probability_gate};
use crate::updater::Updater;

/// Default unconditional per-transaction processing delay in microseconds.
const DEFAULT_LATENCY_US: u32 = 100;

/// State shared between caller threads and the background updater.
pub(crate) struct Shared {
    buses: [Bus; BUS_COUNT],
    metrics: Metrics,
    latency_us: AtomicU32,
    debug: AtomicBool,
    started: Instant,
}

impl Shared {
    pub(crate) fn buses(&self) -> &[Bus] {
        &self.buses
    }
}

/// A software-simulated multi-bus sensor bus.
///
/// Routes byte/burst transactions to registered virtual devices, injects
/// tunable latency/noise/fault behavior, and accumulates performance
/// statistics. All methods are safe to call from multiple threads.
pub struct Simulator {
    shared: Arc<Shared>,
    registry: BackendRegistry,
    updater: Option<Updater>,
}

impl Simulator {
    /// Create a simulator with the given backend registry and start the
    /// background updater.
    #[must_use]
    pub fn new(registry: BackendRegistry) -> Self {
        let shared = Arc::new(Shared {
            buses: std::array::from_fn(|_| Bus::new()),
            metrics: Metrics::new(),
            latency_us: AtomicU32::new(DEFAULT_LATENCY_US),
            debug: AtomicBool::new(false),
            started: Instant::now(),
        });
        let updater = Updater::spawn(Arc::clone(&shared));
        tracing::debug!(buses = BUS_COUNT, "simulator started");
        Self { shared, registry, updater: Some(updater) }
    }

    /// Stop the background updater and join its thread.
    ///
    /// Idempotent; also invoked by `Drop`. After shutdown the transaction
    /// surface keeps working, but device state no longer advances on its
    /// own.
    pub fn shutdown(&mut self) {
        if let Some(mut updater) = self.updater.take() {
            updater.shutdown();
            tracing::debug!("simulator shut down");
        }
    }

    fn bus(&self, bus: BusId) -> Result<&Bus, BusError> {
        self.shared
            .buses
            .get(bus)
            .ok_or_else(|| BusError::invalid_argument(format!("bus index {bus} out of range")))
    }

    fn debug_enabled(&self) -> bool {
        self.shared.debug.load(Ordering::Relaxed)
    }

    /// Construct and register a device of `kind` at `address` on `bus`.
    pub fn add_device(&self, bus: BusId, address: u8, kind: &str) -> Result<(), BusError> {
        let bus_ref = self.bus(bus)?;
        bus_ref.add_device(address, || self.registry.construct(kind, address))?;
        tracing::debug!(bus, address, kind, "device added");
        Ok(())
    }

    /// Unregister the device at `address` on `bus`.
    ///
    /// The slot is vacated under the bus lock; backend teardown happens
    /// after the lock is released.
    pub fn remove_device(&self, bus: BusId, address: u8) -> Result<(), BusError> {
        let bus_ref = self.bus(bus)?;
        let backend = bus_ref.remove_device(address)?;
        drop(backend);
        tracing::debug!(bus, address, "device removed");
        Ok(())
    }

    /// Read one register byte from the device at `(bus, address)`.
    pub fn read_byte(&self, bus: BusId, address: u8, register: u8) -> Result<u8, BusError> {
        let value =
            self.transact(bus, address, OpKind::Read, 1, |dev| dev.read_register(register))?;
        if self.debug_enabled() {
            tracing::debug!(bus, address, register, value, "read byte");
        }
        Ok(value)
    }

    /// Write one register byte to the device at `(bus, address)`.
    pub fn write_byte(
        &self,
        bus: BusId,
        address: u8,
        register: u8,
        value: u8,
    ) -> Result<(), BusError> {
        self.transact(bus, address, OpKind::Write, 1, |dev| dev.write_register(register, value))?;
        if self.debug_enabled() {
            tracing::debug!(bus, address, register, value, "write byte");
        }
        Ok(())
    }

    /// Read `len` consecutive registers starting at `register`.
    ///
    /// Prefers the backend's dedicated burst capability; the trait default
    /// falls back to sequential single-register reads.
    pub fn read_burst(
        &self,
        bus: BusId,
        address: u8,
        register: u8,
        len: usize,
    ) -> Result<Vec<u8>, BusError> {
        if len == 0 {
            return Err(BusError::invalid_argument("zero-length burst read"));
        }
        let data = self.transact(bus, address, OpKind::Read, len as u64, |dev| {
            let mut buf = vec![0u8; len];
            dev.read_burst(register, &mut buf)?;
            Ok(buf)
        })?;
        if self.debug_enabled() {
            tracing::debug!(bus, address, register, len, "burst read");
        }
        Ok(data)
    }

    /// Write `data` to consecutive registers starting at `register`.
    ///
    /// There is no distinct burst-write capability: the engine issues one
    /// single-register write per byte, stopping at the first failure.
    pub fn write_burst(
        &self,
        bus: BusId,
        address: u8,
        register: u8,
        data: &[u8],
    ) -> Result<(), BusError> {
        if data.is_empty() {
            return Err(BusError::invalid_argument("zero-length burst write"));
        }
        self.transact(bus, address, OpKind::Write, data.len() as u64, |dev| {
            let mut reg = register;
            for &value in data {
                dev.write_register(reg, value)?;
                reg = reg.wrapping_add(1);
            }
            Ok(())
        })?;
        if self.debug_enabled() {
            tracing::debug!(bus, address, register, len = data.len(), "burst write");
        }
        Ok(())
    }

    /// Common transaction skeleton shared by all four entry points.
    fn transact<T>(
        &self,
        bus: BusId,
        address: u8,
        kind: OpKind,
        registers: u64,
        op: impl FnOnce(&dyn DeviceBackend) -> Result<T, BusError>,
    ) -> Result<T, BusError> {
        let bus_ref = self.bus(bus)?;
        let start = Instant::now();

        // Bus turnaround time, strictly outside any lock.
        let latency = self.shared.latency_us.load(Ordering::Relaxed);
        if latency > 0 {
            thread::sleep(Duration::from_micros(u64::from(latency)));
        }

        // Noise jitter: the counter bump is the only work under the bus
        // lock; the sleep happens after the guard is released.
        let noise = bus_ref.begin_transaction();
        let mut rng = rand::thread_rng();
        if probability_gate(noise, &mut rng) {
            thread::sleep(Duration::from_micros(rng.gen_range(0..JITTER_MAX_US)));
        }

        let (result, registers) = match bus_ref.dispatch(address, op) {
            Some(result) => (result, registers),
            None => (Err(BusError::NotFound { address }), 0),
        };

        let elapsed = start.elapsed();
        self.shared.metrics.record(kind, registers, elapsed, result.as_ref().err());
        if let Err(err) = &result {
            tracing::debug!(bus, address, %err, "transaction failed");
        }
        result
    }

    /// Set the noise level of `bus`; probability in `[0.0, 1.0]` of adding
    /// a short random delay per transaction. Zero makes the bus timing
    /// deterministic (equal to the global latency).
    pub fn set_bus_noise_level(&self, bus: BusId, level: f64) -> Result<(), BusError> {
        self.bus(bus)?.set_noise_level(level)
    }

    /// Current noise level of `bus`.
    pub fn bus_noise_level(&self, bus: BusId) -> Result<f64, BusError> {
        Ok(self.bus(bus)?.noise_level())
    }

    /// Total transactions issued against `bus` since construction.
    pub fn bus_transaction_count(&self, bus: BusId) -> Result<u64, BusError> {
        Ok(self.bus(bus)?.transactions())
    }

    /// Set the unconditional per-transaction processing delay.
    pub fn set_global_latency_us(&self, micros: u32) {
        self.shared.latency_us.store(micros, Ordering::Relaxed);
    }

    /// Current unconditional per-transaction processing delay.
    #[must_use]
    pub fn global_latency_us(&self) -> u32 {
        self.shared.latency_us.load(Ordering::Relaxed)
    }

    /// Toggle per-transaction debug events.
    pub fn enable_debug_logging(&self, enable: bool) {
        self.shared.debug.store(enable, Ordering::Relaxed);
    }

    /// Value copy of the aggregate statistics; never partially updated.
    #[must_use]
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Zero all statistics counters.
    pub fn reset_metrics(&self) {
        self.shared.metrics.reset();
    }

    /// Wall-clock time since the simulator was constructed.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.shared.started.elapsed()
    }
}

impl Drop for Simulator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("buses", &BUS_COUNT)
            .field("latency_us", &self.global_latency_us())
            .field("updater_running", &self.updater.is_some())
            .finish()
    }
}
