//! Linear passive components: Resistor, Capacitor, Inductor.
//!
//! In the frequency domain each of these is a pure admittance, except the
//! inductor at DC which is a short and therefore gets an active branch
//! (a 0 V source) in the MNA system.

use std::f64::consts::PI;

use num_complex::Complex64;

use crate::circuit::{ComponentId, Position};
use crate::error::{Result, SimError};

/// A resistor component.
#[derive(Debug, Clone)]
pub struct Resistor {
    pub id: ComponentId,
    pub name: String,
    pub terminals: [Position; 2],
    pub resistance: f64,
}

impl Resistor {
    /// Create a new resistor.
    pub fn new(id: ComponentId, name: String, terminals: [Position; 2], resistance: f64) -> Self {
        Self {
            id,
            name,
            terminals,
            resistance,
        }
    }

    /// Get the conductance (1/R).
    pub fn conductance(&self) -> f64 {
        1.0 / self.resistance
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.resistance.is_finite() && self.resistance > 0.0) {
            return Err(SimError::invalid_parameter(
                &self.name,
                "resistance",
                format!("must be positive and finite, got {}", self.resistance),
            ));
        }
        Ok(())
    }
}

/// A capacitor component.
///
/// Admittance is `j·2πf·C`: an open circuit at DC.
#[derive(Debug, Clone)]
pub struct Capacitor {
    pub id: ComponentId,
    pub name: String,
    pub terminals: [Position; 2],
    pub capacitance: f64,
}

impl Capacitor {
    /// Create a new capacitor.
    pub fn new(id: ComponentId, name: String, terminals: [Position; 2], capacitance: f64) -> Self {
        Self {
            id,
            name,
            terminals,
            capacitance,
        }
    }

    /// Admittance at the given frequency in Hz.
    pub fn admittance(&self, frequency: f64) -> Complex64 {
        Complex64::new(0.0, 2.0 * PI * frequency * self.capacitance)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.capacitance.is_finite() && self.capacitance > 0.0) {
            return Err(SimError::invalid_parameter(
                &self.name,
                "capacitance",
                format!("must be positive and finite, got {}", self.capacitance),
            ));
        }
        Ok(())
    }
}

/// An inductor component.
///
/// Admittance is `1 / (j·2πf·L)` for f > 0. At DC the inductor is a short,
/// which the solver models as a 0 V source on the inductor's branch.
#[derive(Debug, Clone)]
pub struct Inductor {
    pub id: ComponentId,
    pub name: String,
    pub terminals: [Position; 2],
    pub inductance: f64,
}

impl Inductor {
    /// Create a new inductor.
    pub fn new(id: ComponentId, name: String, terminals: [Position; 2], inductance: f64) -> Self {
        Self {
            id,
            name,
            terminals,
            inductance,
        }
    }

    /// Impedance `j·2πf·L` at the given frequency.
    pub fn impedance(&self, frequency: f64) -> Complex64 {
        Complex64::new(0.0, 2.0 * PI * frequency * self.inductance)
    }

    /// Admittance at the given frequency, `None` at DC.
    pub fn admittance(&self, frequency: f64) -> Option<Complex64> {
        if frequency > 0.0 {
            Some(self.impedance(frequency).inv())
        } else {
            None
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.inductance.is_finite() && self.inductance > 0.0) {
            return Err(SimError::invalid_parameter(
                &self.name,
                "inductance",
                format!("must be positive and finite, got {}", self.inductance),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn at(x: f64) -> Position {
        Position::new(x, 0.0)
    }

    #[test]
    fn test_resistor_conductance() {
        let r = Resistor::new(ComponentId(0), "R1".to_string(), [at(0.0), at(1.0)], 1000.0);
        assert_relative_eq!(r.conductance(), 0.001);
    }

    #[test]
    fn test_resistor_rejects_zero() {
        let r = Resistor::new(ComponentId(0), "R1".to_string(), [at(0.0), at(1.0)], 0.0);
        assert!(matches!(r.validate(), Err(SimError::InvalidParameter { .. })));
    }

    #[test]
    fn test_capacitor_open_at_dc() {
        let c = Capacitor::new(ComponentId(0), "C1".to_string(), [at(0.0), at(1.0)], 1e-6);
        assert_eq!(c.admittance(0.0), Complex64::new(0.0, 0.0));

        // 1µF at 1kHz: |Y| = 2π·1e3·1e-6
        let y = c.admittance(1000.0);
        assert_relative_eq!(y.im, 2.0 * PI * 1e-3, max_relative = 1e-12);
        assert_eq!(y.re, 0.0);
    }

    #[test]
    fn test_inductor_admittance_lags() {
        let l = Inductor::new(ComponentId(0), "L1".to_string(), [at(0.0), at(1.0)], 1e-3);
        assert!(l.admittance(0.0).is_none());

        let y = l.admittance(1000.0).unwrap();
        assert!(y.im < 0.0);
        assert_relative_eq!(y.norm(), 1.0 / (2.0 * PI), max_relative = 1e-12);
    }
}
