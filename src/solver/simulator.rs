//! Main simulator interface.

use crate::circuit::Schematic;
use crate::error::{Result, SimError};
use crate::results::{MeasurementId, Measurements, Reading, ResultsDatabase};
use crate::THERMAL_VOLTAGE;

use super::bias::{bias, BiasSolution};
use super::worker::CancelToken;
use super::{SimulationKind, DEFAULT_GRID, MAX_MODE_ITERATIONS, MIN_CONDUCTANCE, PIVOT_THRESHOLD};

/// How sweep frequencies are spaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepSpacing {
    /// `points` frequencies evenly spaced from start to stop
    Linear,
    /// `points` frequencies per decade, starting at start
    Decade,
}

/// Frequency grid of a sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepConfig {
    pub start: f64,
    pub stop: f64,
    pub points: usize,
    pub spacing: SweepSpacing,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self::decade(10.0, 1e5, 10)
    }
}

impl SweepConfig {
    pub fn linear(start: f64, stop: f64, points: usize) -> Self {
        Self {
            start,
            stop,
            points,
            spacing: SweepSpacing::Linear,
        }
    }

    pub fn decade(start: f64, stop: f64, points_per_decade: usize) -> Self {
        Self {
            start,
            stop,
            points: points_per_decade,
            spacing: SweepSpacing::Decade,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.start.is_finite() && self.start > 0.0) {
            return Err(SimError::invalid_simulation_param(format!(
                "sweep start must be a positive frequency, got {}",
                self.start
            )));
        }
        if !(self.stop.is_finite() && self.stop >= self.start) {
            return Err(SimError::invalid_simulation_param(format!(
                "sweep stop {} lies below start {}",
                self.stop, self.start
            )));
        }
        if self.points == 0 {
            return Err(SimError::invalid_simulation_param("sweep needs at least one point"));
        }
        Ok(())
    }

    /// The swept frequencies in ascending order.
    pub fn frequencies(&self) -> Result<Vec<f64>> {
        self.validate()?;
        let frequencies = match self.spacing {
            SweepSpacing::Linear if self.points == 1 => vec![self.start],
            SweepSpacing::Linear => {
                let step = (self.stop - self.start) / (self.points - 1) as f64;
                (0..self.points).map(|k| self.start + step * k as f64).collect()
            }
            SweepSpacing::Decade => {
                let per_decade = self.points as f64;
                let decades = (self.stop / self.start).log10();
                let count = (decades * per_decade + 1e-9).floor() as usize;
                (0..=count)
                    .map(|k| self.start * 10f64.powf(k as f64 / per_decade))
                    .collect()
            }
        };
        Ok(frequencies)
    }
}

/// Configuration for the simulator.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Terminal positions closer than this merge into one node.
    pub grid: f64,
    /// Conductance from every node to ground (siemens).
    pub gmin: f64,
    /// Pivot magnitude below which a system counts as singular.
    pub pivot_threshold: f64,
    /// Bound on mode classification rounds.
    pub max_mode_iterations: usize,
    /// Thermal voltage used for r_π (volts).
    pub thermal_voltage: f64,
    /// Use the first node as reference when no ground symbol is placed.
    pub implicit_ground: bool,
    /// Grid for [`SimulationKind::FrequencySweep`].
    pub sweep: SweepConfig,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            grid: DEFAULT_GRID,
            gmin: MIN_CONDUCTANCE,
            pivot_threshold: PIVOT_THRESHOLD,
            max_mode_iterations: MAX_MODE_ITERATIONS,
            thermal_voltage: THERMAL_VOLTAGE,
            implicit_ground: false,
            sweep: SweepConfig::default(),
        }
    }
}

impl SimulatorConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grid(mut self, grid: f64) -> Self {
        self.grid = grid;
        self
    }

    /// Set the minimum node conductance.
    ///
    /// Zero disables it; capacitor-only nodes then make the DC system singular.
    pub fn with_gmin(mut self, gmin: f64) -> Self {
        self.gmin = gmin;
        self
    }

    pub fn with_pivot_threshold(mut self, pivot_threshold: f64) -> Self {
        self.pivot_threshold = pivot_threshold;
        self
    }

    /// Set the maximum mode classification rounds.
    pub fn with_max_mode_iterations(mut self, max_mode_iterations: usize) -> Self {
        self.max_mode_iterations = max_mode_iterations;
        self
    }

    pub fn with_thermal_voltage(mut self, thermal_voltage: f64) -> Self {
        self.thermal_voltage = thermal_voltage;
        self
    }

    pub fn with_implicit_ground(mut self, implicit_ground: bool) -> Self {
        self.implicit_ground = implicit_ground;
        self
    }

    pub fn with_sweep(mut self, sweep: SweepConfig) -> Self {
        self.sweep = sweep;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.grid.is_finite() && self.grid > 0.0) {
            return Err(SimError::invalid_simulation_param(format!(
                "grid must be positive, got {}",
                self.grid
            )));
        }
        if !(self.gmin.is_finite() && self.gmin >= 0.0) {
            return Err(SimError::invalid_simulation_param(format!(
                "gmin must be non-negative, got {}",
                self.gmin
            )));
        }
        if !(self.pivot_threshold.is_finite() && self.pivot_threshold > 0.0) {
            return Err(SimError::invalid_simulation_param(format!(
                "pivot threshold must be positive, got {}",
                self.pivot_threshold
            )));
        }
        if self.max_mode_iterations == 0 {
            return Err(SimError::invalid_simulation_param(
                "max_mode_iterations must be at least 1",
            ));
        }
        if !(self.thermal_voltage.is_finite() && self.thermal_voltage > 0.0) {
            return Err(SimError::invalid_simulation_param(format!(
                "thermal voltage must be positive, got {}",
                self.thermal_voltage
            )));
        }
        Ok(())
    }
}

/// Short description of a finished solve.
#[derive(Debug, Clone, PartialEq)]
pub struct BiasSummary {
    pub kind: SimulationKind,
    pub nodes: usize,
    pub branches: usize,
    pub frequencies: Vec<f64>,
    pub converged: bool,
    pub mode_iterations: usize,
}

impl From<&BiasSolution> for BiasSummary {
    fn from(solution: &BiasSolution) -> Self {
        Self {
            kind: solution.kind(),
            nodes: solution.topology().num_nodes,
            branches: solution.topology().num_branches,
            frequencies: solution.frequencies().to_vec(),
            converged: solution.converged(),
            mode_iterations: solution.mode_iterations(),
        }
    }
}

/// The bias simulator: configuration, latest results and the measurement
/// registry. Results are replaced wholesale by every solve.
#[derive(Debug, Default)]
pub struct Simulator {
    config: SimulatorConfig,
    results: ResultsDatabase,
    measurements: Measurements,
}

impl Simulator {
    /// Create a new simulator with default configuration.
    pub fn new() -> Self {
        Self::with_config(SimulatorConfig::default())
    }

    /// Create a new simulator with custom configuration.
    pub fn with_config(config: SimulatorConfig) -> Self {
        Self {
            config,
            results: ResultsDatabase::new(),
            measurements: Measurements::new(),
        }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Solve `schematic` on the calling thread and publish the results.
    ///
    /// A failed solve leaves no results behind.
    pub fn bias(&mut self, schematic: &Schematic, kind: SimulationKind) -> Result<BiasSummary> {
        match bias(schematic, kind, &self.config, &CancelToken::new()) {
            Ok(solution) => Ok(self.publish(solution)),
            Err(err) => {
                log::warn!("bias simulation failed: {}", err);
                self.results.clear();
                Err(err)
            }
        }
    }

    /// Publish a solution computed elsewhere, e.g. by a
    /// [`BiasWorker`](super::BiasWorker).
    pub fn publish(&mut self, solution: BiasSolution) -> BiasSummary {
        let summary = BiasSummary::from(&solution);
        if !summary.converged {
            log::warn!("publishing results with unsettled device modes");
        }
        self.results.update(solution);
        summary
    }

    /// Drop the current results.
    pub fn clear_results(&mut self) {
        self.results.clear();
    }

    pub fn results(&self) -> &ResultsDatabase {
        &self.results
    }

    pub fn measurements(&self) -> &Measurements {
        &self.measurements
    }

    /// The registry persists across solves.
    pub fn measurements_mut(&mut self) -> &mut Measurements {
        &mut self.measurements
    }

    /// Evaluate every registered measurement against the current results.
    pub fn readings(&self) -> Vec<(MeasurementId, Option<Reading>)> {
        self.measurements
            .iter()
            .map(|m| (m.id, self.results.measure(&m.probe)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::Probe;
    use approx::assert_relative_eq;

    fn divider() -> Schematic {
        let mut s = Schematic::new();
        s.dc_voltage_source("V1", (0.0, 1.0), (0.0, 0.0), 10.0);
        s.resistor("R1", (0.0, 1.0), (1.0, 1.0), 1e3);
        s.resistor("R2", (1.0, 1.0), (1.0, 0.0), 1e3);
        s.ground("GND", (0.0, 0.0));
        s.wire((1.0, 0.0), (0.0, 0.0));
        s
    }

    #[test]
    fn test_config_defaults() {
        let config = SimulatorConfig::new();
        assert_eq!(config.grid, 1e-3);
        assert_eq!(config.gmin, 1e-12);
        assert_eq!(config.max_mode_iterations, 32);
        assert!(!config.implicit_ground);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = SimulatorConfig::new().with_max_mode_iterations(0);
        assert!(matches!(
            config.validate(),
            Err(SimError::InvalidSimulationParam { .. })
        ));
        let config = SimulatorConfig::new().with_sweep(SweepConfig::linear(100.0, 10.0, 5));
        assert!(config.sweep.frequencies().is_err());
    }

    #[test]
    fn test_linear_sweep_grid() {
        let f = SweepConfig::linear(100.0, 500.0, 5).frequencies().unwrap();
        assert_eq!(f, vec![100.0, 200.0, 300.0, 400.0, 500.0]);
        assert_eq!(SweepConfig::linear(50.0, 50.0, 1).frequencies().unwrap(), vec![50.0]);
    }

    #[test]
    fn test_decade_sweep_grid() {
        let f = SweepConfig::default().frequencies().unwrap();
        assert_eq!(f.len(), 41);
        assert_eq!(f[0], 10.0);
        assert_relative_eq!(f[10], 100.0, max_relative = 1e-12);
        assert_relative_eq!(f[40], 1e5, max_relative = 1e-12);
    }

    #[test]
    fn test_failed_solve_clears_results() {
        let mut sim = Simulator::new();
        sim.bias(&divider(), SimulationKind::Dc).unwrap();
        assert!(sim.results().is_available());

        let mut floating = Schematic::new();
        floating.resistor("R1", (0.0, 0.0), (1.0, 0.0), 1e3);
        assert!(sim.bias(&floating, SimulationKind::Dc).is_err());
        assert!(!sim.results().is_available());
    }

    #[test]
    fn test_readings_follow_latest_solve() {
        let mut sim = Simulator::new();
        let r2 = crate::circuit::ComponentId(2);
        let id = sim.measurements_mut().add("I(R2)", Probe::current(r2));
        assert!(sim.readings()[0].1.is_none());

        let summary = sim.bias(&divider(), SimulationKind::Dc).unwrap();
        assert!(summary.converged);
        assert_eq!(summary.nodes, 3);
        let readings = sim.readings();
        assert_eq!(readings[0].0, id);
        let reading = readings[0].1.as_ref().unwrap();
        assert_relative_eq!(reading.average.value, 5e-3, max_relative = 1e-9);
    }
}
