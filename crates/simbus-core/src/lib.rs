//! Software-simulated multi-bus, multi-device sensor bus.
//!
//! Exercises a sensor driver's control and data paths without physical
//! hardware: callers issue byte/burst read and write transactions against
//! `(bus, address, register)` tuples, the engine routes them to a registered
//! virtual device backend, injects tunable timing/noise/fault behavior, and
//! accumulates aggregate performance statistics.
//!
//! ## Architecture
//!
//! ```text
//! simbus-core
//!   ├─ Simulator        (context object: transaction entry points, config)
//!   ├─ Bus              (per-bus device table + lock, noise level, counter)
//!   ├─ DeviceBackend    (capability trait a virtual device implements)
//!   ├─ BackendRegistry  (device-kind tag → constructor)
//!   ├─ Updater          (~100 Hz background state advancement)
//!   └─ Metrics          (counts, min/avg/max latency, errors, timeouts)
//! ```
//!
//! ## Locking discipline
//!
//! Two lock levels, ordered: a bus lock is always acquired before any
//! device-internal lock, and never the other way around. Simulated delays
//! sleep strictly outside critical sections. The background updater takes
//! device-internal locks only while holding no bus lock. Buses have
//! independent locks, so traffic on one bus never contends with another.

mod bus;
mod device;
mod error;
mod metrics;
mod noise;
mod sim;
mod updater;

pub use bus::{BUS_COUNT, BusId, MAX_DEVICES};
pub use device::{BackendRegistry, DeviceBackend};
pub use error::BusError;
pub use metrics::MetricsSnapshot;
pub use noise::probability_gate;
pub use sim::Simulator;
