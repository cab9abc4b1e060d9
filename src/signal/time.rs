//! Time-domain signals.

use super::{same_frequency, CharacteristicValues};

/// Origin of a sub-waveform summed into a [`TimeSignal`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaveSource {
    /// DC offset
    Dc,
    /// Sinusoid of one AC excitation
    Ac { frequency: f64 },
}

impl WaveSource {
    pub fn is_dc(&self) -> bool {
        matches!(self, WaveSource::Dc)
    }

    /// Check if this sub-waveform belongs to the given AC frequency.
    pub fn is_frequency(&self, frequency: f64) -> bool {
        matches!(*self, WaveSource::Ac { frequency: f } if same_frequency(f, frequency))
    }
}

/// Fixed-step real samples plus the sub-waveforms they were summed from.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSignal {
    step: f64,
    samples: Vec<f64>,
    parts: Vec<(WaveSource, Vec<f64>)>,
}

impl TimeSignal {
    /// Raw samples without decomposition.
    pub fn from_samples(step: f64, samples: Vec<f64>) -> Self {
        Self {
            step,
            samples,
            parts: Vec::new(),
        }
    }

    /// Time between samples in seconds.
    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Registered sub-waveforms in registration order.
    pub fn parts(&self) -> &[(WaveSource, Vec<f64>)] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sign-flipped copy, sub-waveforms included.
    pub fn negate(&self) -> Self {
        Self {
            step: self.step,
            samples: self.samples.iter().map(|x| -x).collect(),
            parts: self
                .parts
                .iter()
                .map(|(source, s)| (*source, s.iter().map(|x| -x).collect()))
                .collect(),
        }
    }

    /// Re-sum only the sub-waveforms accepted by `include`.
    pub fn recompose(&self, include: impl Fn(&WaveSource) -> bool) -> Self {
        let mut builder = TimeSignalBuilder::new(self.step, self.samples.len());
        for (source, samples) in self.parts.iter().filter(|(s, _)| include(s)) {
            builder.add_part(*source, samples.clone());
        }
        builder.build()
    }

    fn scan(&self, init: f64, pick: fn(f64, f64) -> f64) -> f64 {
        if self.samples.is_empty() {
            return f64::NAN;
        }
        self.samples.iter().copied().fold(init, pick)
    }
}

impl CharacteristicValues for TimeSignal {
    fn maximum(&self) -> f64 {
        self.scan(f64::NEG_INFINITY, f64::max)
    }

    fn minimum(&self) -> f64 {
        self.scan(f64::INFINITY, f64::min)
    }

    fn rms(&self) -> f64 {
        if self.samples.is_empty() {
            return f64::NAN;
        }
        let sum_sq: f64 = self.samples.iter().map(|x| x * x).sum();
        (sum_sq / self.samples.len() as f64).sqrt()
    }

    fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return f64::NAN;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }
}

/// Accumulator for [`TimeSignal`]. Every part is resized to the signal
/// length, padding with zeros.
#[derive(Debug, Clone)]
pub struct TimeSignalBuilder {
    step: f64,
    len: usize,
    parts: Vec<(WaveSource, Vec<f64>)>,
}

impl TimeSignalBuilder {
    pub fn new(step: f64, len: usize) -> Self {
        Self {
            step,
            len,
            parts: Vec::new(),
        }
    }

    pub fn add_part(&mut self, source: WaveSource, mut samples: Vec<f64>) -> &mut Self {
        samples.resize(self.len, 0.0);
        self.parts.push((source, samples));
        self
    }

    /// Freeze into an immutable signal.
    pub fn build(self) -> TimeSignal {
        let mut samples = vec![0.0; self.len];
        for (_, part) in &self.parts {
            for (acc, x) in samples.iter_mut().zip(part) {
                *acc += x;
            }
        }
        TimeSignal {
            parts: self.parts,
            ..TimeSignal::from_samples(self.step, samples)
        }
    }
}
