//! Virtual 6-axis motion sensor backend.
//!
//! Implements the [`DeviceBackend`](simbus_core::DeviceBackend) contract with
//! the register map, power management, FIFO, and waveform generation of an
//! MPU-6050 class part, plus probability-driven fault injection for driver
//! testing.
//!
//! ```
//! use simbus_core::{BackendRegistry, Simulator};
//! use simbus_motion::{self as motion, regs};
//!
//! let mut registry = BackendRegistry::new();
//! motion::register_motion_backend(&mut registry);
//!
//! let sim = Simulator::new(registry);
//! sim.add_device(0, 0x68, motion::KIND).unwrap();
//! sim.write_byte(0, 0x68, regs::PWR_MGMT_1, 0x00).unwrap();
//! assert_eq!(sim.read_byte(0, 0x68, regs::WHO_AM_I).unwrap(), regs::WHO_AM_I_VALUE);
//! ```

mod fifo;
mod pattern;
pub mod regs;
mod sensor;

use std::sync::Arc;

use simbus_core::BackendRegistry;

pub use crate::pattern::{
    ACCEL_SCALE_2G, BASE_TEMP_C, DataPattern, GYRO_SCALE_250DPS, TEMP_OFFSET_C, TEMP_SENSITIVITY,
};
pub use crate::sensor::{FaultMode, MotionSensor, PowerState, SensorSample};

/// Backend kind string under which the motion sensor registers.
pub const KIND: &str = "motion";

/// Register the motion sensor constructor under [`KIND`].
pub fn register_motion_backend(registry: &mut BackendRegistry) {
    registry.register(KIND, |address| {
        Ok(Arc::new(MotionSensor::new(address)) as Arc<dyn simbus_core::DeviceBackend>)
    });
}
