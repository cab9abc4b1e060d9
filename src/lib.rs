//! # Schemsim Core
//!
//! The bias-simulation engine of a schematic editor.
//!
//! This library provides:
//! - Node aggregation from placed components and wires
//! - Modified Nodal Analysis (MNA) on complex admittances, one system per
//!   excitation frequency
//! - Piecewise-linear op-amp and BJT models with operating-mode resolution
//! - Phasor, time, sweep and power signals with characteristic values
//! - A memoized results database and a persistent measurement registry
//!
//! ## Architecture
//!
//! - [`circuit`] - Schematic snapshot, node aggregation and topology
//! - [`components`] - Component models (resistors, sources, op-amps, BJTs)
//! - [`solver`] - MNA assembly, mode resolution and the bias solver
//! - [`signal`] - Signal algebra
//! - [`results`] - Voltage, current and power queries over the latest solve
//! - [`waveform`] - Sample generators for time-domain display
//!
//! ## Usage
//!
//! ```
//! use schemsim_core::{circuit::Schematic, solver::SimulationKind, Simulator};
//!
//! let mut s = Schematic::new();
//! s.dc_voltage_source("V1", (0.0, 1.0), (0.0, 0.0), 10.0);
//! let r1 = s.resistor("R1", (0.0, 1.0), (0.0, 0.0), 1e3);
//! s.ground("GND", (0.0, 0.0));
//!
//! let mut sim = Simulator::new();
//! sim.bias(&s, SimulationKind::Dc).unwrap();
//! let i = sim.results().current().component(r1, Default::default()).unwrap();
//! assert!((i.dc_value() - 0.01).abs() < 1e-9);
//! ```
//!
//! ## Bias Simulation Method
//!
//! 1. Aggregate terminals and wires into nodes; allocate branch unknowns
//! 2. Resolve device modes on the DC system
//! 3. Solve one complex system per AC frequency with the DC modes
//! 4. Publish node potentials and branch currents as phasor signals

pub mod circuit;
pub mod components;
pub mod error;
pub mod results;
pub mod signal;
pub mod solver;
pub mod waveform;

// Re-export main types for convenience
pub use circuit::Schematic;
pub use error::{Result, SimError};
pub use results::ResultsDatabase;
pub use solver::{BiasWorker, SimulationKind, Simulator, SimulatorConfig};

/// Thermal voltage at room temperature (approximately 26mV)
pub const THERMAL_VOLTAGE: f64 = 0.0258;
