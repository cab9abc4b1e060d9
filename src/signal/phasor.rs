//! Phasor-domain signals.
//!
//! A phasor signal is `x(t) = DC + Σ Re(P_f · e^{j2πft})`. Terms are kept
//! sorted by frequency with at most one term per frequency; the DC value is
//! never stored as a zero-frequency term.

use std::f64::consts::FRAC_PI_2;

use num_complex::Complex64;

use super::time::{TimeSignal, TimeSignalBuilder, WaveSource};
use super::{same_frequency, CharacteristicValues};
use crate::waveform;

/// Immutable phasor-domain signal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhasorSignal {
    dc: f64,
    terms: Vec<(f64, Complex64)>,
}

impl PhasorSignal {
    /// A pure DC signal.
    pub fn dc(value: f64) -> Self {
        Self {
            dc: value,
            terms: Vec::new(),
        }
    }

    /// A single sinusoid without DC.
    pub fn sinusoid(frequency: f64, phasor: Complex64) -> Self {
        let mut builder = PhasorSignalBuilder::new();
        builder.add_phasor(frequency, phasor);
        builder.build()
    }

    /// The DC component.
    pub fn dc_value(&self) -> f64 {
        self.dc
    }

    /// `(frequency, phasor)` terms, ascending by frequency.
    pub fn terms(&self) -> &[(f64, Complex64)] {
        &self.terms
    }

    /// Phasor at `frequency`, if the signal has a term there.
    pub fn phasor(&self, frequency: f64) -> Option<Complex64> {
        self.terms
            .iter()
            .find(|(f, _)| same_frequency(*f, frequency))
            .map(|(_, p)| *p)
    }

    pub fn frequencies(&self) -> impl Iterator<Item = f64> + '_ {
        self.terms.iter().map(|(f, _)| *f)
    }

    /// Check if both signals carry terms at exactly the same frequencies.
    pub fn has_same_frequencies(&self, other: &PhasorSignal) -> bool {
        self.terms.len() == other.terms.len()
            && self
                .frequencies()
                .zip(other.frequencies())
                .all(|(a, b)| same_frequency(a, b))
    }

    /// Sign-flipped copy.
    pub fn negate(&self) -> Self {
        Self {
            dc: -self.dc,
            terms: self.terms.iter().map(|&(f, p)| (f, -p)).collect(),
        }
    }

    /// `self - other`, combined per frequency.
    pub fn difference(&self, other: &PhasorSignal) -> Self {
        let mut builder = PhasorSignalBuilder::from(self);
        builder.add_signal(&other.negate());
        builder.build()
    }

    /// Multiply each term by a frequency-dependent factor (`factor(0.0)` for
    /// DC). Only the real part of the scaled DC value is kept.
    pub fn scale_by(&self, factor: impl Fn(f64) -> Complex64) -> Self {
        Self {
            dc: (factor(0.0) * self.dc).re,
            terms: self.terms.iter().map(|&(f, p)| (f, p * factor(f))).collect(),
        }
    }

    /// Materialize `count` samples at `step` seconds, keeping each term as a
    /// registered sub-waveform.
    pub fn to_time_signal(&self, count: usize, step: f64) -> TimeSignal {
        let mut builder = TimeSignalBuilder::new(step, count);
        builder.add_part(WaveSource::Dc, waveform::constant(self.dc, count));
        for &(frequency, p) in &self.terms {
            // Re(P·e^{jωt}) = |P|·sin(ωt + arg P + π/2)
            builder.add_part(
                WaveSource::Ac { frequency },
                waveform::sine(p.norm(), frequency, p.arg() + FRAC_PI_2, 0.0, count, step),
            );
        }
        builder.build()
    }

    fn envelope(&self) -> f64 {
        self.terms.iter().map(|(_, p)| p.norm()).sum()
    }
}

impl CharacteristicValues for PhasorSignal {
    /// Envelope bound `DC + Σ|P|`; an overestimate when phases differ.
    fn maximum(&self) -> f64 {
        self.dc + self.envelope()
    }

    fn minimum(&self) -> f64 {
        self.dc - self.envelope()
    }

    fn rms(&self) -> f64 {
        let ac_power: f64 = self.terms.iter().map(|(_, p)| p.norm_sqr() / 2.0).sum();
        (self.dc * self.dc + ac_power).sqrt()
    }

    fn average(&self) -> f64 {
        self.dc
    }
}

/// Accumulator for [`PhasorSignal`].
///
/// Phasors added at the same frequency are summed as vectors; a phasor at
/// frequency 0 is folded into the DC value.
#[derive(Debug, Clone, Default)]
pub struct PhasorSignalBuilder {
    dc: f64,
    terms: Vec<(f64, Complex64)>,
}

impl PhasorSignalBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dc(&mut self, value: f64) -> &mut Self {
        self.dc += value;
        self
    }

    pub fn add_phasor(&mut self, frequency: f64, phasor: Complex64) -> &mut Self {
        if frequency == 0.0 {
            self.dc += phasor.re;
            return self;
        }
        match self
            .terms
            .iter_mut()
            .find(|(f, _)| same_frequency(*f, frequency))
        {
            Some((_, p)) => *p += phasor,
            None => self.terms.push((frequency, phasor)),
        }
        self
    }

    pub fn add_signal(&mut self, signal: &PhasorSignal) -> &mut Self {
        self.add_dc(signal.dc);
        for &(f, p) in &signal.terms {
            self.add_phasor(f, p);
        }
        self
    }

    /// Freeze into an immutable signal.
    pub fn build(mut self) -> PhasorSignal {
        self.terms.sort_by(|a, b| a.0.total_cmp(&b.0));
        PhasorSignal {
            dc: self.dc,
            terms: self.terms,
        }
    }
}

impl From<&PhasorSignal> for PhasorSignalBuilder {
    fn from(signal: &PhasorSignal) -> Self {
        Self {
            dc: signal.dc,
            terms: signal.terms.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use std::f64::consts::{PI, SQRT_2};

    fn mixed() -> PhasorSignal {
        let mut b = PhasorSignalBuilder::new();
        b.add_dc(1.5)
            .add_phasor(1000.0, Complex64::from_polar(2.0, 0.3))
            .add_phasor(50.0, Complex64::from_polar(0.5, -1.0));
        b.build()
    }

    #[test]
    fn test_rms_of_pure_sinusoid() {
        let s = PhasorSignal::sinusoid(1000.0, Complex64::from_polar(3.0, 0.7));
        assert_relative_eq!(s.rms(), 3.0 / SQRT_2, max_relative = 1e-12);
        assert_eq!(s.average(), 0.0);
    }

    #[test]
    fn test_rms_of_dc() {
        assert_relative_eq!(PhasorSignal::dc(-4.0).rms(), 4.0);
    }

    #[test]
    fn test_same_frequency_terms_sum_as_vectors() {
        let mut b = PhasorSignalBuilder::new();
        b.add_phasor(60.0, Complex64::new(1.0, 0.0));
        b.add_phasor(60.0, Complex64::new(-1.0, 0.0));
        let s = b.build();
        assert_eq!(s.terms().len(), 1);
        // Opposite phases cancel instead of adding power
        assert_abs_diff_eq!(s.rms(), 0.0);
    }

    #[test]
    fn test_zero_frequency_phasor_goes_to_dc() {
        let mut b = PhasorSignalBuilder::new();
        b.add_phasor(0.0, Complex64::new(2.0, 0.0));
        let s = b.build();
        assert_eq!(s.dc_value(), 2.0);
        assert!(s.terms().is_empty());
    }

    #[test]
    fn test_envelope_bounds() {
        let s = mixed();
        assert_relative_eq!(s.maximum(), 4.0);
        assert_relative_eq!(s.minimum(), -1.0);
        assert_eq!(s.average(), 1.5);
        // Terms are sorted by frequency
        assert_eq!(s.frequencies().collect::<Vec<_>>(), vec![50.0, 1000.0]);
    }

    #[test]
    fn test_double_negate_is_identity() {
        let s = mixed();
        assert_eq!(s.negate().negate(), s);
        assert_eq!(s.negate().dc_value(), -1.5);
    }

    #[test]
    fn test_difference_per_frequency() {
        let a = mixed();
        let b = PhasorSignal::sinusoid(1000.0, Complex64::from_polar(2.0, 0.3));
        let d = a.difference(&b);
        assert_eq!(d.dc_value(), 1.5);
        assert_abs_diff_eq!(d.phasor(1000.0).unwrap().norm(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(d.phasor(50.0).unwrap().norm(), 0.5);
    }

    #[test]
    fn test_scale_by_admittance() {
        let v = mixed();
        let i = v.scale_by(|f| Complex64::new(0.0, 2.0 * PI * f * 1e-6));
        // Capacitor blocks DC
        assert_eq!(i.dc_value(), 0.0);
        let p = i.phasor(1000.0).unwrap();
        assert_relative_eq!(p.norm(), 2.0 * 2.0 * PI * 1e-3, max_relative = 1e-12);
    }

    #[test]
    fn test_time_signal_matches_phasor() {
        let s = PhasorSignal::sinusoid(1.0, Complex64::from_polar(1.0, 0.0));
        let t = s.to_time_signal(4, 0.25);
        // cos(0), cos(π/2), cos(π), cos(3π/2)
        let expected = [1.0, 0.0, -1.0, 0.0];
        for (x, e) in t.samples().iter().zip(expected) {
            assert_abs_diff_eq!(*x, e, epsilon = 1e-12);
        }
        assert_eq!(t.parts().len(), 2);
    }
}
