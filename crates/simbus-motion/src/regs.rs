//! Register map of the virtual motion sensor.
//!
//! Addresses and reset values follow the MPU-6050 class of 6-axis parts:
//! big-endian 16-bit sample registers, a WHO_AM_I identity byte, and a
//! FIFO exposed through a count pair and a single data port.

/// Identity register.
pub const WHO_AM_I: u8 = 0x75;
/// Fixed identity byte served from [`WHO_AM_I`].
pub const WHO_AM_I_VALUE: u8 = 0x68;

/// Primary power management register.
pub const PWR_MGMT_1: u8 = 0x6B;
/// Secondary power management register.
pub const PWR_MGMT_2: u8 = 0x6C;
/// Accelerometer range configuration.
pub const ACCEL_CONFIG: u8 = 0x1C;
/// Gyroscope range configuration.
pub const GYRO_CONFIG: u8 = 0x1B;

/// Accelerometer X high byte; reading it latches a fresh sample.
pub const ACCEL_XOUT_H: u8 = 0x3B;
/// Accelerometer X low byte.
pub const ACCEL_XOUT_L: u8 = 0x3C;
/// Accelerometer Y high byte.
pub const ACCEL_YOUT_H: u8 = 0x3D;
/// Accelerometer Y low byte.
pub const ACCEL_YOUT_L: u8 = 0x3E;
/// Accelerometer Z high byte.
pub const ACCEL_ZOUT_H: u8 = 0x3F;
/// Accelerometer Z low byte.
pub const ACCEL_ZOUT_L: u8 = 0x40;
/// Die temperature high byte.
pub const TEMP_OUT_H: u8 = 0x41;
/// Die temperature low byte.
pub const TEMP_OUT_L: u8 = 0x42;
/// Gyroscope X high byte.
pub const GYRO_XOUT_H: u8 = 0x43;
/// Gyroscope X low byte.
pub const GYRO_XOUT_L: u8 = 0x44;
/// Gyroscope Y high byte.
pub const GYRO_YOUT_H: u8 = 0x45;
/// Gyroscope Y low byte.
pub const GYRO_YOUT_L: u8 = 0x46;
/// Gyroscope Z high byte.
pub const GYRO_ZOUT_H: u8 = 0x47;
/// Gyroscope Z low byte.
pub const GYRO_ZOUT_L: u8 = 0x48;

/// FIFO source selection register.
pub const FIFO_EN: u8 = 0x23;
/// User control register (FIFO enable/reset bits).
pub const USER_CTRL: u8 = 0x6A;
/// FIFO byte count, high byte.
pub const FIFO_COUNT_H: u8 = 0x72;
/// FIFO byte count, low byte.
pub const FIFO_COUNT_L: u8 = 0x73;
/// FIFO read/write data port.
pub const FIFO_DATA: u8 = 0x74;

/// Interrupt pin configuration.
pub const INT_PIN_CFG: u8 = 0x37;
/// Interrupt enable register.
pub const INT_ENABLE: u8 = 0x38;
/// Interrupt status register.
pub const INT_STATUS: u8 = 0x3A;

/// `PWR_MGMT_1` sleep bit.
pub const SLEEP_BIT: u8 = 0x40;
/// `PWR_MGMT_1` low-power cycle bit.
pub const CYCLE_BIT: u8 = 0x20;
/// `PWR_MGMT_1` device reset bit; restores register defaults.
pub const DEVICE_RESET_BIT: u8 = 0x80;
/// `USER_CTRL` FIFO enable bit.
pub const FIFO_EN_BIT: u8 = 0x40;
/// `USER_CTRL` FIFO reset bit.
pub const FIFO_RESET_BIT: u8 = 0x04;

/// Reset value of `PWR_MGMT_1`: asleep on the internal oscillator.
pub const PWR_MGMT_1_RESET: u8 = SLEEP_BIT;

/// Registers a bus write must never change.
#[must_use]
pub fn is_read_only(register: u8) -> bool {
    matches!(register, WHO_AM_I | ACCEL_XOUT_H..=GYRO_ZOUT_L | FIFO_COUNT_H | FIFO_COUNT_L)
}
