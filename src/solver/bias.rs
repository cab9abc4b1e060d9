//! Bias simulation: DC operating point plus one phasor solve per
//! excitation frequency.

use num_complex::Complex64;

use crate::circuit::{
    check_connectivity, validate_schematic, BranchId, ComponentId, NodeId, Schematic, Topology,
    VarIndex,
};
use crate::components::Waveform;
use crate::error::Result;
use crate::signal::{PhasorSignal, PhasorSignalBuilder, SweepSignal};

use super::mna::{Excitation, MnaMatrix};
use super::modes::{assemble, DeviceMode, ModeResolver, OperatingPoint};
use super::worker::CancelToken;
use super::{SimulationKind, SimulatorConfig};

/// Per-node and per-branch responses of a frequency sweep.
#[derive(Debug, Clone, Default)]
pub struct SweepResults {
    pub frequencies: Vec<f64>,
    nodes: Vec<SweepSignal>,
    branches: Vec<SweepSignal>,
}

/// Everything one bias solve produced.
#[derive(Debug, Clone)]
pub struct BiasSolution {
    kind: SimulationKind,
    schematic: Schematic,
    topology: Topology,
    /// Indexed by node id, ground included
    node_potentials: Vec<PhasorSignal>,
    /// Indexed by branch id
    branch_currents: Vec<PhasorSignal>,
    /// Reported AC frequencies
    frequencies: Vec<f64>,
    sweep: Option<SweepResults>,
    operating_point: OperatingPoint,
    converged: bool,
    mode_iterations: usize,
}

impl BiasSolution {
    pub fn kind(&self) -> SimulationKind {
        self.kind
    }

    /// Snapshot of the schematic that was solved.
    pub fn schematic(&self) -> &Schematic {
        &self.schematic
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Potential of an indexed node relative to ground.
    pub fn node_potential(&self, node: NodeId) -> Option<&PhasorSignal> {
        self.node_potentials.get(node.0)
    }

    /// Raw branch unknown.
    pub fn branch_current(&self, branch: BranchId) -> Option<&PhasorSignal> {
        self.branch_currents.get(branch.0)
    }

    /// AC frequencies present in the reported phasor signals.
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    pub fn sweep(&self) -> Option<&SweepResults> {
        self.sweep.as_ref()
    }

    pub fn sweep_node(&self, node: NodeId) -> Option<&SweepSignal> {
        self.sweep.as_ref()?.nodes.get(node.0)
    }

    pub fn sweep_branch(&self, branch: BranchId) -> Option<&SweepSignal> {
        self.sweep.as_ref()?.branches.get(branch.0)
    }

    pub fn mode(&self, component: ComponentId) -> Option<DeviceMode> {
        self.operating_point.mode(component)
    }

    pub fn operating_point(&self) -> &OperatingPoint {
        &self.operating_point
    }

    /// False when the mode search hit its iteration bound.
    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn mode_iterations(&self) -> usize {
        self.mode_iterations
    }

    /// A source waveform restricted to what this solution reports, so it can
    /// be combined with solved signals term by term.
    pub fn source_signal(&self, waveform: &Waveform) -> PhasorSignal {
        let full = waveform.to_signal();
        let mut builder = PhasorSignalBuilder::new();
        if self.kind.reports_dc() {
            builder.add_dc(full.dc_value());
        }
        for &f in &self.frequencies {
            builder.add_phasor(f, full.phasor(f).unwrap_or_default());
        }
        builder.build()
    }

    /// Same as [`source_signal`](Self::source_signal) for the sweep grid.
    pub fn source_sweep(&self, waveform: &Waveform) -> Option<SweepSignal> {
        let sweep = self.sweep.as_ref()?;
        let phasor = waveform.ac_phasor();
        Some(SweepSignal::from_points(
            sweep.frequencies.iter().map(|&f| (f, phasor)).collect(),
        ))
    }
}

/// Run a bias simulation.
///
/// Structural problems and singular systems abort the whole solve; there is
/// no partial result. `cancel` is polled between mode rounds and between
/// frequencies.
pub fn bias(
    schematic: &Schematic,
    kind: SimulationKind,
    config: &SimulatorConfig,
    cancel: &CancelToken,
) -> Result<BiasSolution> {
    config.validate()?;
    validate_schematic(schematic)?;
    let topology = Topology::from_schematic(schematic, config)?;
    check_connectivity(schematic, &topology)?;

    let mut matrix = MnaMatrix::new(topology.matrix_size());
    let resolution = ModeResolver::new(config.max_mode_iterations).resolve(
        schematic,
        &topology,
        &mut matrix,
        config,
        cancel,
    )?;
    let op = resolution.operating_point;

    let mut nodes = vec![PhasorSignalBuilder::new(); topology.num_nodes];
    let mut branches = vec![PhasorSignalBuilder::new(); topology.num_branches];

    if kind.reports_dc() {
        collect(&topology, &matrix, 0.0, &mut nodes, &mut branches);
    }

    let frequencies = if kind.reports_ac() {
        schematic.excitation_frequencies()
    } else {
        Vec::new()
    };
    for &f in &frequencies {
        cancel.check()?;
        solve_at(schematic, &topology, &mut matrix, Excitation::Frequency(f), &op, config)?;
        collect(&topology, &matrix, f, &mut nodes, &mut branches);
    }

    let sweep = if kind == SimulationKind::FrequencySweep {
        Some(run_sweep(schematic, &topology, &mut matrix, &op, config, cancel)?)
    } else {
        None
    };

    log::info!(
        "{:?} bias solved: {} nodes, {} branches, {} AC frequencies, modes {} after {} round(s)",
        kind,
        topology.num_nodes,
        topology.num_branches,
        frequencies.len(),
        if resolution.converged { "settled" } else { "unsettled" },
        resolution.iterations
    );

    Ok(BiasSolution {
        kind,
        schematic: schematic.clone(),
        topology,
        node_potentials: nodes.into_iter().map(PhasorSignalBuilder::build).collect(),
        branch_currents: branches.into_iter().map(PhasorSignalBuilder::build).collect(),
        frequencies,
        sweep,
        operating_point: op,
        converged: resolution.converged,
        mode_iterations: resolution.iterations,
    })
}

fn solve_at(
    schematic: &Schematic,
    topology: &Topology,
    matrix: &mut MnaMatrix,
    excitation: Excitation,
    op: &OperatingPoint,
    config: &SimulatorConfig,
) -> Result<()> {
    assemble(schematic, topology, matrix, excitation, op, config);
    log::debug!(
        "solving {}x{} system at {} Hz",
        matrix.size,
        matrix.size,
        excitation.frequency()
    );
    matrix.factor(config.pivot_threshold, excitation.frequency())?;
    matrix.solve();
    Ok(())
}

/// Node potentials and branch currents of the solved system.
fn unknowns(topology: &Topology, matrix: &MnaMatrix) -> (Vec<Complex64>, Vec<Complex64>) {
    let nodes = (0..topology.num_nodes)
        .map(|n| matrix.value(topology.var_index(VarIndex::Voltage(NodeId(n)))))
        .collect();
    let branches = (0..topology.num_branches)
        .map(|b| matrix.value(topology.var_index(VarIndex::Current(BranchId(b)))))
        .collect();
    (nodes, branches)
}

fn collect(
    topology: &Topology,
    matrix: &MnaMatrix,
    frequency: f64,
    nodes: &mut [PhasorSignalBuilder],
    branches: &mut [PhasorSignalBuilder],
) {
    let (v, i) = unknowns(topology, matrix);
    for (builder, value) in nodes.iter_mut().zip(v) {
        builder.add_phasor(frequency, value);
    }
    for (builder, value) in branches.iter_mut().zip(i) {
        builder.add_phasor(frequency, value);
    }
}

fn run_sweep(
    schematic: &Schematic,
    topology: &Topology,
    matrix: &mut MnaMatrix,
    op: &OperatingPoint,
    config: &SimulatorConfig,
    cancel: &CancelToken,
) -> Result<SweepResults> {
    let frequencies = config.sweep.frequencies()?;
    let mut nodes = vec![Vec::with_capacity(frequencies.len()); topology.num_nodes];
    let mut branches = vec![Vec::with_capacity(frequencies.len()); topology.num_branches];

    for &f in &frequencies {
        cancel.check()?;
        solve_at(schematic, topology, matrix, Excitation::Sweep(f), op, config)?;
        let (v, i) = unknowns(topology, matrix);
        for (points, value) in nodes.iter_mut().zip(v) {
            points.push((f, value));
        }
        for (points, value) in branches.iter_mut().zip(i) {
            points.push((f, value));
        }
    }

    Ok(SweepResults {
        frequencies,
        nodes: nodes.into_iter().map(SweepSignal::from_points).collect(),
        branches: branches.into_iter().map(SweepSignal::from_points).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;
    use crate::solver::SweepConfig;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use std::f64::consts::PI;

    fn run(s: &Schematic, kind: SimulationKind) -> Result<BiasSolution> {
        bias(s, kind, &SimulatorConfig::default(), &CancelToken::new())
    }

    fn rc_lowpass() -> (Schematic, NodeId) {
        let mut s = Schematic::new();
        s.ac_voltage_source("V1", (0.0, 1.0), (0.0, 0.0), 1.0, 1000.0, 0.0);
        s.resistor("R1", (0.0, 1.0), (1.0, 1.0), 1e3);
        s.capacitor("C1", (1.0, 1.0), (1.0, 0.0), 1e-6);
        s.ground("GND", (0.0, 0.0));
        s.wire((1.0, 0.0), (0.0, 0.0));
        (s, NodeId(2))
    }

    #[test]
    fn test_dc_reports_no_ac_terms() {
        let (s, out) = rc_lowpass();
        let sol = run(&s, SimulationKind::Dc).unwrap();
        assert!(sol.frequencies().is_empty());
        assert!(sol.node_potential(out).unwrap().terms().is_empty());
    }

    #[test]
    fn test_rc_lowpass_phasor() {
        let (s, out) = rc_lowpass();
        let sol = run(&s, SimulationKind::Ac).unwrap();
        assert_eq!(sol.frequencies(), &[1000.0]);

        let omega_rc = 2.0 * PI * 1000.0 * 1e3 * 1e-6;
        let expected = Complex64::new(1.0, omega_rc).inv();
        let v = sol.node_potential(out).unwrap().phasor(1000.0).unwrap();
        assert_relative_eq!(v.re, expected.re, max_relative = 1e-6);
        assert_relative_eq!(v.im, expected.im, max_relative = 1e-6);
        assert_eq!(sol.node_potential(out).unwrap().dc_value(), 0.0);
        // Ground carries a zero term so frequency sets line up
        assert_eq!(sol.node_potential(NodeId::GROUND).unwrap().terms().len(), 1);
    }

    #[test]
    fn test_two_frequencies_solved_independently() {
        let mut s = Schematic::new();
        s.ac_voltage_source("V1", (0.0, 1.0), (0.0, 2.0), 1.0, 1000.0, 0.0);
        s.ac_voltage_source("V2", (0.0, 2.0), (0.0, 0.0), 2.0, 50.0, 0.0);
        s.resistor("R1", (0.0, 1.0), (0.0, 0.0), 1e3);
        s.ground("GND", (0.0, 0.0));
        let sol = run(&s, SimulationKind::AcDc).unwrap();
        assert_eq!(sol.frequencies(), &[50.0, 1000.0]);
        let top = sol.node_potential(NodeId(1)).unwrap();
        assert_relative_eq!(top.phasor(1000.0).unwrap().re, 1.0, max_relative = 1e-9);
        assert_relative_eq!(top.phasor(50.0).unwrap().re, 2.0, max_relative = 1e-9);
        assert_abs_diff_eq!(top.dc_value(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sweep_covers_configured_grid() {
        let (s, out) = rc_lowpass();
        let config = SimulatorConfig::default().with_sweep(SweepConfig::decade(10.0, 1e4, 5));
        let sol = bias(&s, SimulationKind::FrequencySweep, &config, &CancelToken::new()).unwrap();
        let response = sol.sweep_node(out).unwrap();
        assert_eq!(response.len(), 16);
        // Low-pass: magnitude falls with frequency
        let mags: Vec<f64> = response.magnitudes().collect();
        assert!(mags.windows(2).all(|w| w[1] < w[0]));
        assert_relative_eq!(mags[0], 1.0, max_relative = 1e-2);
    }

    #[test]
    fn test_source_signal_follows_reported_terms() {
        let waveform = Waveform::Ac {
            amplitude: 1e-3,
            frequency: 50.0,
            phase: 0.0,
            offset: 2e-3,
        };
        let (mut s, _) = rc_lowpass();
        s.current_source("I1", (0.0, 0.0), (1.0, 1.0), waveform);

        let sol = run(&s, SimulationKind::AcDc).unwrap();
        let i = sol.source_signal(&waveform);
        assert_eq!(i.dc_value(), 2e-3);
        assert_eq!(i.phasor(50.0), Some(Complex64::new(1e-3, 0.0)));
        // Padded with a zero term at the other source's frequency
        assert_eq!(i.phasor(1000.0), Some(Complex64::new(0.0, 0.0)));

        let sol = run(&s, SimulationKind::Ac).unwrap();
        assert_eq!(sol.source_signal(&waveform).dc_value(), 0.0);
    }

    #[test]
    fn test_parallel_voltage_sources_are_singular() {
        let mut s = Schematic::new();
        s.dc_voltage_source("V1", (0.0, 1.0), (0.0, 0.0), 5.0);
        s.dc_voltage_source("V2", (0.0, 1.0), (0.0, 0.0), 3.0);
        s.ground("GND", (0.0, 0.0));
        assert_eq!(
            run(&s, SimulationKind::Dc).unwrap_err(),
            SimError::SingularMatrix { frequency: 0.0 }
        );
    }

    #[test]
    fn test_cancelled_solve_has_no_result() {
        let (s, _) = rc_lowpass();
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = bias(&s, SimulationKind::AcDc, &SimulatorConfig::default(), &cancel).unwrap_err();
        assert_eq!(err, SimError::Cancelled);
    }
}
