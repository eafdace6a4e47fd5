//! Virtual 6-axis motion sensor.
//!
//! All internal state lives behind one device-internal mutex, independent of
//! any bus lock: transaction dispatch (which holds a bus lock) and the
//! background updater (which holds none) serialize only on this lock.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use rand::Rng;
use simbus_core::{BusError, DeviceBackend, probability_gate};

use crate::fifo::Fifo;
use crate::pattern::{self, DataPattern};
use crate::regs;

/// How long a simulated stall blocks before reporting [`BusError::Timeout`].
const TIMEOUT_STALL: Duration = Duration::from_millis(100);

/// Bytes per FIFO sample frame: accel XYZ, temperature, gyro XYZ.
const FIFO_FRAME_LEN: usize = 14;

/// Power state derived from the `PWR_MGMT_1` register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerState {
    /// Asleep; sample registers frozen, FIFO idle. Reset default.
    #[default]
    Sleep,
    /// Low-power duty cycling; samples still advance.
    Cycle,
    /// Fully on.
    On,
}

/// Fault behavior injected into register accesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultMode {
    /// No injected faults.
    #[default]
    None,
    /// Device stops acknowledging its address.
    NotFound,
    /// Device stalls, then the access times out.
    Timeout,
    /// Plain communication failure.
    BusError,
    /// Reads succeed but return a random byte.
    CorruptData,
    /// 30% of gated accesses fail with a communication error.
    Intermittent,
}

/// One latched sensor sample in raw register LSB units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorSample {
    /// Accelerometer X/Y/Z.
    pub accel: [i16; 3],
    /// Gyroscope X/Y/Z.
    pub gyro: [i16; 3],
    /// Die temperature.
    pub temperature: i16,
}

struct MotionState {
    registers: [u8; 256],
    sample: SensorSample,
    fifo: Fifo,
    power: PowerState,
    pattern: DataPattern,
    fault: FaultMode,
    fault_probability: f64,
    fault_once: bool,
    sample_count: u32,
}

impl MotionState {
    fn reset() -> Self {
        let mut registers = [0u8; 256];
        registers[usize::from(regs::WHO_AM_I)] = regs::WHO_AM_I_VALUE;
        registers[usize::from(regs::PWR_MGMT_1)] = regs::PWR_MGMT_1_RESET;

        Self {
            registers,
            sample: SensorSample {
                accel: [0, 0, pattern::ACCEL_SCALE_2G],
                gyro: [0, 0, 0],
                temperature: pattern::temperature(DataPattern::GravityOnly, 0),
            },
            fifo: Fifo::new(),
            power: PowerState::Sleep,
            pattern: DataPattern::GravityOnly,
            fault: FaultMode::None,
            fault_probability: 0.0,
            fault_once: false,
            sample_count: 0,
        }
    }

    /// Latch the next sample from the waveform generator.
    fn regenerate(&mut self) {
        self.sample_count += 1;

        let p = self.pattern;
        let n = self.sample_count;
        self.sample = SensorSample {
            accel: [pattern::accel(p, 0, n), pattern::accel(p, 1, n), pattern::accel(p, 2, n)],
            gyro: [pattern::gyro(p, 0, n), pattern::gyro(p, 1, n), pattern::gyro(p, 2, n)],
            temperature: pattern::temperature(p, n),
        };
    }

    /// Advance one background tick: regenerate the sample and feed the
    /// FIFO. Frozen while asleep. The FIFO fills only from here, at the
    /// updater cadence, never from read traffic.
    fn tick(&mut self) {
        if self.power == PowerState::Sleep {
            return;
        }
        self.regenerate();

        if self.fifo.enabled {
            self.push_fifo_frame();
        }
    }

    fn push_fifo_frame(&mut self) {
        let mut frame = [0u8; FIFO_FRAME_LEN];
        let words = [
            self.sample.accel[0],
            self.sample.accel[1],
            self.sample.accel[2],
            self.sample.temperature,
            self.sample.gyro[0],
            self.sample.gyro[1],
            self.sample.gyro[2],
        ];
        for (chunk, word) in frame.chunks_exact_mut(2).zip(words) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        self.fifo.push_frame(&frame);
    }

    #[allow(clippy::cast_possible_truncation)]
    fn fifo_count(&self) -> u16 {
        self.fifo.len().min(usize::from(u16::MAX)) as u16
    }

    fn read(&mut self, register: u8) -> u8 {
        match register {
            // Reading the first sample byte latches a fresh sample, so a
            // subsequent low-byte read pairs with the same conversion. The
            // latch never touches the FIFO.
            regs::ACCEL_XOUT_H => {
                if self.power != PowerState::Sleep {
                    self.regenerate();
                }
                high(self.sample.accel[0])
            }
            regs::ACCEL_XOUT_L => low(self.sample.accel[0]),
            regs::ACCEL_YOUT_H => high(self.sample.accel[1]),
            regs::ACCEL_YOUT_L => low(self.sample.accel[1]),
            regs::ACCEL_ZOUT_H => high(self.sample.accel[2]),
            regs::ACCEL_ZOUT_L => low(self.sample.accel[2]),
            regs::TEMP_OUT_H => high(self.sample.temperature),
            regs::TEMP_OUT_L => low(self.sample.temperature),
            regs::GYRO_XOUT_H => high(self.sample.gyro[0]),
            regs::GYRO_XOUT_L => low(self.sample.gyro[0]),
            regs::GYRO_YOUT_H => high(self.sample.gyro[1]),
            regs::GYRO_YOUT_L => low(self.sample.gyro[1]),
            regs::GYRO_ZOUT_H => high(self.sample.gyro[2]),
            regs::GYRO_ZOUT_L => low(self.sample.gyro[2]),
            regs::FIFO_COUNT_H => self.fifo_count().to_be_bytes()[0],
            regs::FIFO_COUNT_L => self.fifo_count().to_be_bytes()[1],
            regs::FIFO_DATA => self.fifo.pop().unwrap_or(0),
            _ => self.registers[usize::from(register)],
        }
    }

    fn write(&mut self, register: u8, value: u8) {
        match register {
            regs::PWR_MGMT_1 => self.write_power(value),
            regs::USER_CTRL => {
                self.registers[usize::from(register)] = value;
                self.fifo.enabled = value & regs::FIFO_EN_BIT != 0;
                if value & regs::FIFO_RESET_BIT != 0 {
                    self.fifo.clear();
                }
            }
            regs::FIFO_DATA => {
                self.fifo.push(value);
            }
            _ => self.registers[usize::from(register)] = value,
        }
    }

    fn write_power(&mut self, value: u8) {
        if value & regs::DEVICE_RESET_BIT != 0 {
            *self = Self::reset();
            return;
        }
        self.registers[usize::from(regs::PWR_MGMT_1)] = value;
        self.power = if value & regs::SLEEP_BIT != 0 {
            PowerState::Sleep
        } else if value & regs::CYCLE_BIT != 0 {
            PowerState::Cycle
        } else {
            PowerState::On
        };
    }
}

fn high(word: i16) -> u8 {
    word.to_be_bytes()[0]
}

fn low(word: i16) -> u8 {
    word.to_be_bytes()[1]
}

/// Virtual motion sensor backend.
///
/// Implements [`DeviceBackend`] with a register map, power management,
/// waveform patterns, probability-driven fault injection, and a sample FIFO.
pub struct MotionSensor {
    address: u8,
    state: Mutex<MotionState>,
}

impl MotionSensor {
    /// Create a sensor in its reset state (asleep, gravity on Z).
    #[must_use]
    pub fn new(address: u8) -> Self {
        tracing::debug!(address, "motion sensor created");
        Self { address, state: Mutex::new(MotionState::reset()) }
    }

    fn lock(&self) -> MutexGuard<'_, MotionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Select the waveform the sensor synthesizes.
    pub fn set_pattern(&self, pattern: DataPattern) {
        tracing::debug!(address = self.address, ?pattern, "pattern changed");
        self.lock().pattern = pattern;
    }

    /// Configure probability-driven fault injection.
    pub fn set_fault(&self, mode: FaultMode, probability: f64) -> Result<(), BusError> {
        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            return Err(BusError::InvalidArgument(format!(
                "fault probability {probability} outside [0.0, 1.0]"
            )));
        }
        tracing::debug!(address = self.address, ?mode, probability, "fault mode changed");
        let mut state = self.lock();
        state.fault = mode;
        state.fault_probability = probability;
        state.fault_once = false;
        Ok(())
    }

    /// Arm a one-shot guaranteed fault: the next gated access fails with a
    /// communication error, then injection disarms itself.
    pub fn inject_fault_once(&self) {
        let mut state = self.lock();
        state.fault = FaultMode::BusError;
        state.fault_probability = 1.0;
        state.fault_once = true;
    }

    /// Value copy of the latched sample.
    #[must_use]
    pub fn sample(&self) -> SensorSample {
        self.lock().sample
    }

    /// Current power state.
    #[must_use]
    pub fn power_state(&self) -> PowerState {
        self.lock().power
    }

    /// Currently selected waveform.
    #[must_use]
    pub fn pattern(&self) -> DataPattern {
        self.lock().pattern
    }

    /// Bytes currently buffered in the FIFO.
    #[must_use]
    pub fn fifo_len(&self) -> usize {
        self.lock().fifo.len()
    }

    /// Whether the FIFO has dropped data since it was last cleared.
    #[must_use]
    pub fn fifo_overflowed(&self) -> bool {
        self.lock().fifo.overflow
    }

    /// Roll the fault gate; `Ok(Some(byte))` substitutes a corrupt read.
    fn roll_fault(&self, state: &mut MotionState, is_read: bool) -> Result<Option<u8>, BusError> {
        let mut rng = rand::thread_rng();
        if !probability_gate(state.fault_probability, &mut rng) {
            return Ok(None);
        }
        let mode = state.fault;
        if state.fault_once {
            state.fault = FaultMode::None;
            state.fault_probability = 0.0;
            state.fault_once = false;
        }

        match mode {
            FaultMode::None => Ok(None),
            FaultMode::NotFound => Err(BusError::NotFound { address: self.address }),
            FaultMode::Timeout => {
                thread::sleep(TIMEOUT_STALL);
                Err(BusError::Timeout)
            }
            FaultMode::BusError => Err(BusError::IoFault),
            FaultMode::CorruptData if is_read => Ok(Some(rng.gen_range(0..=u8::MAX))),
            FaultMode::CorruptData => Ok(None),
            FaultMode::Intermittent => {
                if rng.gen_range(0..10) < 3 {
                    Err(BusError::IoFault)
                } else {
                    Ok(None)
                }
            }
        }
    }
}

impl DeviceBackend for MotionSensor {
    fn read_register(&self, register: u8) -> Result<u8, BusError> {
        let mut state = self.lock();
        if let Some(corrupt) = self.roll_fault(&mut state, true)? {
            return Ok(corrupt);
        }
        Ok(state.read(register))
    }

    fn write_register(&self, register: u8, value: u8) -> Result<(), BusError> {
        let mut state = self.lock();
        self.roll_fault(&mut state, false)?;
        if regs::is_read_only(register) {
            // A write to a read-only register is NAKed by the part.
            return Err(BusError::IoFault);
        }
        state.write(register, value);
        Ok(())
    }

    fn advance(&self) {
        self.lock().tick();
    }
}

impl std::fmt::Debug for MotionSensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotionSensor").field("address", &self.address).finish_non_exhaustive()
    }
}
