//! Waveform generation for the virtual sensor.
//!
//! Samples are synthesized from the pattern and a monotonically increasing
//! sample counter (nominal 1 kHz time base). Scales follow the part's most
//! sensitive ranges: ±2 g accelerometer, ±250 °/s gyroscope.

use std::f64::consts::TAU;

use rand::Rng;

/// LSB per g at the ±2 g range.
pub const ACCEL_SCALE_2G: i16 = 16384;
/// LSB per °/s at the ±250 °/s range.
pub const GYRO_SCALE_250DPS: f64 = 131.0;
/// LSB per °C of the die temperature sensor.
pub const TEMP_SENSITIVITY: f64 = 340.0;
/// Die temperature offset in °C.
pub const TEMP_OFFSET_C: f64 = 36.53;
/// Resting die temperature in °C.
pub const BASE_TEMP_C: f64 = 21.0;

/// Shape of the synthesized motion data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataPattern {
    /// Constant values, gravity on Z.
    Static,
    /// Per-axis sine waves on top of gravity.
    SineWave,
    /// White noise, no gravity baseline.
    Noise,
    /// Gravity on Z, everything else zero.
    #[default]
    GravityOnly,
    /// Slow rotation of the gravity vector with constant gyro rates.
    Rotation,
    /// High-frequency, low-amplitude vibration.
    Vibration,
}

fn time_sec(sample: u32) -> f64 {
    f64::from(sample) / 1000.0
}

/// Accelerometer LSB value for `axis` (0 = X, 1 = Y, 2 = Z).
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn accel(pattern: DataPattern, axis: usize, sample: u32) -> i16 {
    let t = time_sec(sample);
    let scale = f64::from(ACCEL_SCALE_2G);
    // Gravity sits on Z in every pattern except pure noise.
    let base = if axis == 2 && pattern != DataPattern::Noise { ACCEL_SCALE_2G } else { 0 };

    match pattern {
        DataPattern::Static | DataPattern::GravityOnly => base,
        DataPattern::SineWave => {
            let freq_hz = 1.0 + axis as f64 * 0.5;
            let amplitude = scale * 0.1;
            base + (amplitude * (TAU * freq_hz * t).sin()) as i16
        }
        DataPattern::Noise => {
            let noise = rand::thread_rng().gen_range(-1.0..1.0);
            base + (noise * scale * 0.05) as i16
        }
        DataPattern::Rotation => {
            let angle = t * 0.5;
            match axis {
                0 => (scale * angle.sin()) as i16,
                1 => (scale * 0.1 * (angle * 2.0).cos()) as i16,
                _ => (scale * angle.cos()) as i16,
            }
        }
        DataPattern::Vibration => {
            let freq = 50.0 + axis as f64 * 10.0;
            let amplitude = scale * 0.02;
            base + (amplitude * (TAU * freq * t).sin()) as i16
        }
    }
}

/// Gyroscope LSB value for `axis` (0 = X, 1 = Y, 2 = Z).
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn gyro(pattern: DataPattern, axis: usize, sample: u32) -> i16 {
    let t = time_sec(sample);

    match pattern {
        DataPattern::Static | DataPattern::GravityOnly => 0,
        DataPattern::SineWave => {
            let freq_hz = 0.5 + axis as f64 * 0.2;
            let amplitude = GYRO_SCALE_250DPS * 10.0;
            (amplitude * (TAU * freq_hz * t).sin()) as i16
        }
        DataPattern::Noise => {
            let noise = rand::thread_rng().gen_range(-1.0..1.0);
            (noise * GYRO_SCALE_250DPS) as i16
        }
        DataPattern::Rotation => match axis {
            0 => (GYRO_SCALE_250DPS * 5.0) as i16,
            1 => (GYRO_SCALE_250DPS * -2.0) as i16,
            _ => (GYRO_SCALE_250DPS * 10.0 * t.sin()) as i16,
        },
        DataPattern::Vibration => {
            let freq = 30.0 + axis as f64 * 5.0;
            let amplitude = GYRO_SCALE_250DPS * 2.0;
            (amplitude * (TAU * freq * t).sin()) as i16
        }
    }
}

/// Die temperature LSB value.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn temperature(pattern: DataPattern, sample: u32) -> i16 {
    let t = time_sec(sample);
    let celsius = match pattern {
        DataPattern::Static | DataPattern::GravityOnly => BASE_TEMP_C,
        // Slow drift, ±2 °C at 0.01 Hz.
        DataPattern::SineWave => BASE_TEMP_C + 2.0 * (TAU * 0.01 * t).sin(),
        DataPattern::Noise => BASE_TEMP_C + rand::thread_rng().gen_range(-0.5..0.5),
        // Slight self-heating under activity.
        DataPattern::Rotation | DataPattern::Vibration => BASE_TEMP_C + 1.0,
    };

    ((celsius + TEMP_OFFSET_C) * TEMP_SENSITIVITY) as i16
}
