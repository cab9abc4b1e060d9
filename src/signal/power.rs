//! Power derived from a voltage and a current signal.

use std::ops::Add;

use super::{CharacteristicValues, PhasorSignal};

/// Instantaneous bounds and average of `p(t) = v(t)·i(t)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerSignal {
    maximum: f64,
    minimum: f64,
    average: f64,
}

impl PowerSignal {
    /// Power of a voltage/current pair.
    ///
    /// The average is `V_DC·I_DC + Σ ½·Re(V_f·conj(I_f))` when both signals
    /// cover the same frequencies and NaN otherwise. The bounds multiply the
    /// envelopes of both signals and stay finite either way.
    pub fn from_phasors(voltage: &PhasorSignal, current: &PhasorSignal) -> Self {
        let average = if voltage.has_same_frequencies(current) {
            let ac: f64 = voltage
                .terms()
                .iter()
                .zip(current.terms())
                .map(|((_, v), (_, i))| 0.5 * (v * i.conj()).re)
                .sum();
            voltage.dc_value() * current.dc_value() + ac
        } else {
            f64::NAN
        };

        let corners = [
            voltage.maximum() * current.maximum(),
            voltage.maximum() * current.minimum(),
            voltage.minimum() * current.maximum(),
            voltage.minimum() * current.minimum(),
        ];
        let (maximum, minimum) = if corners.iter().any(|c| c.is_nan()) {
            (f64::NAN, f64::NAN)
        } else {
            (
                corners.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                corners.iter().copied().fold(f64::INFINITY, f64::min),
            )
        };

        Self {
            maximum,
            minimum,
            average,
        }
    }
}

/// Total power of two ports. Bounds add, which overestimates the range.
impl Add for PowerSignal {
    type Output = PowerSignal;

    fn add(self, other: PowerSignal) -> PowerSignal {
        PowerSignal {
            maximum: self.maximum + other.maximum,
            minimum: self.minimum + other.minimum,
            average: self.average + other.average,
        }
    }
}

impl CharacteristicValues for PowerSignal {
    fn maximum(&self) -> f64 {
        self.maximum
    }

    fn minimum(&self) -> f64 {
        self.minimum
    }

    /// Undefined for a power product.
    fn rms(&self) -> f64 {
        f64::NAN
    }

    fn average(&self) -> f64 {
        self.average
    }
}
