//! MNA (Modified Nodal Analysis) bias solver.
//!
//! This module provides the numerical engine for bias simulation.
//!
//! ## Modified Nodal Analysis
//!
//! MNA assembles a system of equations Ax = z where:
//! - x contains node potentials and branch currents
//! - A is the complex admittance/coefficient matrix
//! - z is the source vector
//!
//! The matrix structure is:
//! ```text
//! [ Y   B ] [ v ]   [ i ]
//! [ C   D ] [ j ] = [ e ]
//! ```
//!
//! where:
//! - Y is the admittance matrix (node equations)
//! - B, C couple branch currents to nodes
//! - D holds series impedances and mode-dependent branch terms
//! - v is the vector of node potentials
//! - j is the vector of branch currents
//! - i is the sum of current sources into each node
//! - e is the vector of branch constraint values
//!
//! One such system is solved per excitation frequency. Op-amps and
//! transistors are piecewise linear; their modes are resolved on the DC
//! system and reused at every AC frequency.

mod bias;
mod mna;
mod modes;
mod simulator;
mod worker;

pub use bias::{bias, BiasSolution, SweepResults};
pub use mna::{stamp_linear_components, Excitation, MnaMatrix};
pub use modes::{DeviceMode, ModeResolution, ModeResolver, OperatingPoint};
pub use simulator::{BiasSummary, Simulator, SimulatorConfig, SweepConfig, SweepSpacing};
pub use worker::{BiasOutcome, BiasWorker, CancelToken};

/// Default node-merging grid (schematic units).
pub const DEFAULT_GRID: f64 = 1e-3;

/// Minimum conductance to prevent singular matrix.
pub const MIN_CONDUCTANCE: f64 = 1e-12;

/// Pivot magnitude below which the system is treated as singular.
pub const PIVOT_THRESHOLD: f64 = 1e-15;

/// Maximum mode classification rounds per solve.
pub const MAX_MODE_ITERATIONS: usize = 32;

/// What a bias simulation reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimulationKind {
    /// DC operating point only
    Dc,
    /// AC phasors only; DC is still solved to resolve device modes
    Ac,
    /// DC operating point plus AC phasors
    AcDc,
    /// DC operating point plus the response at every sweep frequency
    FrequencySweep,
}

impl SimulationKind {
    pub fn reports_dc(self) -> bool {
        !matches!(self, SimulationKind::Ac)
    }

    pub fn reports_ac(self) -> bool {
        matches!(self, SimulationKind::Ac | SimulationKind::AcDc)
    }
}
