//! Frequency-swept (transfer function style) signals.

use num_complex::Complex64;

use super::{same_frequency, CharacteristicValues};

/// Complex response sampled at a sequence of swept frequencies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepSignal {
    points: Vec<(f64, Complex64)>,
}

impl SweepSignal {
    /// Build from `(frequency, value)` points in sweep order.
    pub fn from_points(points: Vec<(f64, Complex64)>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[(f64, Complex64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn magnitudes(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|(_, v)| v.norm())
    }

    /// Phase of each point in radians.
    pub fn phases(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|(_, v)| v.arg())
    }

    /// Magnitude of each point in dB (20·log10).
    pub fn magnitudes_db(&self) -> impl Iterator<Item = f64> + '_ {
        self.magnitudes().map(|m| 20.0 * m.log10())
    }

    /// Sign-flipped copy.
    pub fn negate(&self) -> Self {
        Self {
            points: self.points.iter().map(|&(f, v)| (f, -v)).collect(),
        }
    }

    /// Point-wise `self - other`. `None` unless both signals share the
    /// sweep grid.
    pub fn difference(&self, other: &SweepSignal) -> Option<Self> {
        let same_grid = self.points.len() == other.points.len()
            && self
                .points
                .iter()
                .zip(&other.points)
                .all(|(&(fa, _), &(fb, _))| same_frequency(fa, fb));
        if !same_grid {
            return None;
        }
        Some(Self {
            points: self
                .points
                .iter()
                .zip(&other.points)
                .map(|(&(f, a), &(_, b))| (f, a - b))
                .collect(),
        })
    }

    /// Point-wise multiplication by a frequency-dependent factor.
    pub fn scale_by(&self, factor: impl Fn(f64) -> Complex64) -> Self {
        Self {
            points: self.points.iter().map(|&(f, v)| (f, v * factor(f))).collect(),
        }
    }
}

impl CharacteristicValues for SweepSignal {
    fn maximum(&self) -> f64 {
        if self.points.is_empty() {
            return f64::NAN;
        }
        self.magnitudes().fold(f64::NEG_INFINITY, f64::max)
    }

    fn minimum(&self) -> f64 {
        if self.points.is_empty() {
            return f64::NAN;
        }
        self.magnitudes().fold(f64::INFINITY, f64::min)
    }

    /// Not a time series: undefined.
    fn rms(&self) -> f64 {
        f64::NAN
    }

    /// Not a time series: undefined.
    fn average(&self) -> f64 {
        f64::NAN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response() -> SweepSignal {
        SweepSignal::from_points(vec![
            (10.0, Complex64::new(1.0, 0.0)),
            (100.0, Complex64::new(0.0, -0.5)),
            (1000.0, Complex64::new(-0.06, 0.08)),
        ])
    }

    #[test]
    fn test_extremes_use_magnitude() {
        let s = response();
        assert_eq!(s.maximum(), 1.0);
        assert!((s.minimum() - 0.1).abs() < 1e-12);
        assert!(s.rms().is_nan());
        assert!(s.average().is_nan());
    }

    #[test]
    fn test_negate_keeps_magnitudes() {
        let s = response();
        let n = s.negate();
        assert_eq!(n.maximum(), s.maximum());
        assert_eq!(n.points()[0].1, Complex64::new(-1.0, 0.0));
        assert_eq!(n.negate(), s);
    }

    #[test]
    fn test_difference_needs_shared_grid() {
        let s = response();
        let d = s.difference(&s.negate()).unwrap();
        assert_eq!(d.points()[1].1, Complex64::new(0.0, -1.0));

        let shorter = SweepSignal::from_points(s.points()[..2].to_vec());
        assert!(s.difference(&shorter).is_none());
        let moved = SweepSignal::from_points(s.points().iter().map(|&(f, v)| (f * 2.0, v)).collect());
        assert!(s.difference(&moved).is_none());
    }

    #[test]
    fn test_magnitudes_db() {
        let db: Vec<f64> = response().magnitudes_db().collect();
        assert!(db[0].abs() < 1e-12);
        assert!((db[2] - (-20.0)).abs() < 1e-9);
    }
}
