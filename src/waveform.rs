//! Sample generators used to turn solved phasors into displayable
//! time series. Nothing here is on the solve path.

use std::f64::consts::{PI, TAU};

use crate::error::{Result, SimError};

/// `amplitude·sin(2πf·t + phase) + offset` sampled at `t = n·step`.
pub fn sine(
    amplitude: f64,
    frequency: f64,
    phase: f64,
    offset: f64,
    count: usize,
    step: f64,
) -> Vec<f64> {
    let omega = 2.0 * PI * frequency;
    (0..count)
        .map(|n| amplitude * (omega * n as f64 * step + phase).sin() + offset)
        .collect()
}

/// Constant samples.
pub fn constant(value: f64, count: usize) -> Vec<f64> {
    vec![value; count]
}

pub fn zero(count: usize) -> Vec<f64> {
    constant(0.0, count)
}

/// Phase-shift a periodic sample sequence by re-splicing it.
///
/// The sequence is rotated left by the index nearest `phase / 2π` of one
/// period of `period_samples` samples, so the result starts `phase` radians
/// later in the cycle. `phase` must lie strictly between 0 and 2π.
pub fn phase_shift(samples: &[f64], phase: f64, period_samples: usize) -> Result<Vec<f64>> {
    if !(phase > 0.0 && phase < TAU) {
        return Err(SimError::InvalidPhase { phase });
    }
    if samples.is_empty() || period_samples == 0 {
        return Ok(samples.to_vec());
    }
    let split = ((phase / TAU) * period_samples as f64).round() as usize % samples.len();
    let mut shifted = Vec::with_capacity(samples.len());
    shifted.extend_from_slice(&samples[split..]);
    shifted.extend_from_slice(&samples[..split]);
    Ok(shifted)
}
