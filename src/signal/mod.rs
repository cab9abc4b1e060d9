//! Signal representations derived from a bias solve.
//!
//! - [`PhasorSignal`] - DC value plus one complex phasor per frequency
//! - [`TimeSignal`] - fixed-step samples with their DC/AC sub-waveforms
//! - [`SweepSignal`] - complex response per swept frequency
//! - [`PowerSignal`] - instantaneous bounds and average of a power product
//!
//! All of them answer the same four characteristic values. A value that is
//! undefined for a representation is NaN.

mod phasor;
mod power;
mod sweep;
mod time;

pub use phasor::{PhasorSignal, PhasorSignalBuilder};
pub use power::PowerSignal;
pub use sweep::SweepSignal;
pub use time::{TimeSignal, TimeSignalBuilder, WaveSource};

/// Relative tolerance for treating two frequencies as the same excitation.
pub const FREQUENCY_TOLERANCE: f64 = 1e-9;

/// Characteristic values shared by every signal representation.
pub trait CharacteristicValues {
    fn maximum(&self) -> f64;
    fn minimum(&self) -> f64;
    fn rms(&self) -> f64;
    fn average(&self) -> f64;
}

/// Check if two frequencies denote the same excitation.
pub fn same_frequency(a: f64, b: f64) -> bool {
    (a - b).abs() <= FREQUENCY_TOLERANCE * a.abs().max(b.abs())
}
