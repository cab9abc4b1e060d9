//! Component models for bias simulation.
//!
//! This module provides models for all supported schematic parts:
//! - Linear: Resistor, Capacitor, Inductor
//! - Sources: Voltage Source, Current Source (DC or AC)
//! - Nonlinear: Op-Amp, BJT
//! - Reference: Ground
//!
//! Components are a tagged variant dispatched by `match`; the solver stamps
//! each kind into the MNA matrix.

mod bjt;
mod linear;
mod opamp;
mod sources;

pub use bjt::{Bjt, BjtMode, BjtParams, BjtType, HybridParams};
pub use linear::{Capacitor, Inductor, Resistor};
pub use opamp::{OpAmp, OpAmpMode, OpAmpParams};
pub use sources::{CurrentSource, Ground, VoltageSource, Waveform};

use num_complex::Complex64;

use crate::circuit::{ComponentId, Position};
use crate::error::Result;

/// A schematic component.
#[derive(Debug, Clone)]
pub enum Component {
    Resistor(Resistor),
    Capacitor(Capacitor),
    Inductor(Inductor),
    VoltageSource(VoltageSource),
    CurrentSource(CurrentSource),
    OpAmp(OpAmp),
    Bjt(Bjt),
    Ground(Ground),
}

impl Component {
    /// Get the component ID.
    pub fn id(&self) -> ComponentId {
        match self {
            Component::Resistor(r) => r.id,
            Component::Capacitor(c) => c.id,
            Component::Inductor(l) => l.id,
            Component::VoltageSource(v) => v.id,
            Component::CurrentSource(i) => i.id,
            Component::OpAmp(o) => o.id,
            Component::Bjt(q) => q.id,
            Component::Ground(g) => g.id,
        }
    }

    /// Get the component name.
    pub fn name(&self) -> &str {
        match self {
            Component::Resistor(r) => &r.name,
            Component::Capacitor(c) => &c.name,
            Component::Inductor(l) => &l.name,
            Component::VoltageSource(v) => &v.name,
            Component::CurrentSource(i) => &i.name,
            Component::OpAmp(o) => &o.name,
            Component::Bjt(q) => &q.name,
            Component::Ground(g) => &g.name,
        }
    }

    /// Terminal positions, in the kind's terminal order.
    pub fn terminals(&self) -> &[Position] {
        match self {
            Component::Resistor(r) => &r.terminals,
            Component::Capacitor(c) => &c.terminals,
            Component::Inductor(l) => &l.terminals,
            Component::VoltageSource(v) => &v.terminals,
            Component::CurrentSource(i) => &i.terminals,
            Component::OpAmp(o) => &o.terminals,
            Component::Bjt(q) => &q.terminals,
            Component::Ground(g) => &g.terminals,
        }
    }

    /// Number of active branches (extra MNA current unknowns) this part needs.
    pub fn branch_count(&self) -> usize {
        match self {
            Component::Inductor(_) | Component::VoltageSource(_) | Component::OpAmp(_) => 1,
            // Base and collector currents
            Component::Bjt(_) => 2,
            _ => 0,
        }
    }

    /// Admittance of a pure-admittance two-terminal part at `frequency`.
    ///
    /// Returns `None` for parts whose terminal relation is not an admittance
    /// (sources, three-terminal parts, the inductor at DC).
    pub fn admittance(&self, frequency: f64) -> Option<Complex64> {
        match self {
            Component::Resistor(r) => Some(Complex64::new(r.conductance(), 0.0)),
            Component::Capacitor(c) => Some(c.admittance(frequency)),
            Component::Inductor(l) => l.admittance(frequency),
            _ => None,
        }
    }

    /// Source excitation, if this part is an independent source.
    pub fn waveform(&self) -> Option<&Waveform> {
        match self {
            Component::VoltageSource(v) => Some(&v.waveform),
            Component::CurrentSource(i) => Some(&i.waveform),
            _ => None,
        }
    }

    /// Check if this component needs operating-mode classification.
    pub fn is_nonlinear(&self) -> bool {
        match self {
            Component::OpAmp(_) => true,
            Component::Bjt(q) => q.params.small_signal.is_none(),
            _ => false,
        }
    }

    /// Validate the component's parameters.
    pub fn validate(&self) -> Result<()> {
        match self {
            Component::Resistor(r) => r.validate(),
            Component::Capacitor(c) => c.validate(),
            Component::Inductor(l) => l.validate(),
            Component::VoltageSource(v) => v.validate(),
            Component::CurrentSource(i) => i.validate(),
            Component::OpAmp(o) => o.validate(),
            Component::Bjt(q) => q.validate(),
            Component::Ground(_) => Ok(()),
        }
    }
}
