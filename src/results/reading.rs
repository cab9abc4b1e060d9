//! Displayable summaries of a measured signal.

use std::fmt;

use crate::signal::CharacteristicValues;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Volt,
    Ampere,
    Watt,
}

impl Unit {
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Volt => "V",
            Unit::Ampere => "A",
            Unit::Watt => "W",
        }
    }
}

/// A value with its unit. Non-finite values render as `unavailable`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantity {
    pub value: f64,
    pub unit: Unit,
}

impl Quantity {
    pub fn is_available(&self) -> bool {
        self.value.is_finite()
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_available() {
            return write!(f, "unavailable");
        }
        let precision = f.precision().unwrap_or(4);
        write!(f, "{:.*e} {}", precision, self.value, self.unit.symbol())
    }
}

/// Characteristic values of one measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub maximum: Quantity,
    pub minimum: Quantity,
    pub rms: Quantity,
    pub average: Quantity,
}

impl Reading {
    pub fn new(values: &impl CharacteristicValues, unit: Unit) -> Self {
        let q = |value| Quantity { value, unit };
        Self {
            maximum: q(values.maximum()),
            minimum: q(values.minimum()),
            rms: q(values.rms()),
            average: q(values.average()),
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "avg {}, rms {}, max {}, min {}",
            self.average, self.rms, self.maximum, self.minimum
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{PhasorSignal, PowerSignal};

    #[test]
    fn test_quantity_display() {
        let q = Quantity {
            value: 0.005,
            unit: Unit::Ampere,
        };
        assert_eq!(q.to_string(), "5.0000e-3 A");
        assert_eq!(format!("{:.1}", q), "5.0e-3 A");
    }

    #[test]
    fn test_unavailable_omits_unit() {
        let q = Quantity {
            value: f64::NAN,
            unit: Unit::Watt,
        };
        assert_eq!(q.to_string(), "unavailable");
        assert!(!q.is_available());
    }

    #[test]
    fn test_reading_of_power() {
        let p = PowerSignal::from_phasors(&PhasorSignal::dc(2.0), &PhasorSignal::dc(0.5));
        let r = Reading::new(&p, Unit::Watt);
        assert_eq!(r.average.value, 1.0);
        assert_eq!(
            r.to_string(),
            "avg 1.0000e0 W, rms unavailable, max 1.0000e0 W, min 1.0000e0 W"
        );
    }
}
