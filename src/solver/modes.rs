//! Operating-mode resolution for op-amps and transistors.
//!
//! Both devices are piecewise linear: each mode is a different set of linear
//! branch equations. The resolver assumes a mode per device, solves the DC
//! system, checks every device against the inequalities of its mode and
//! re-assumes until nothing changes.

use std::collections::{BTreeMap, HashSet};

use num_complex::Complex64;

use crate::circuit::{ComponentId, Schematic, Topology};
use crate::components::{Bjt, BjtMode, Component, OpAmp, OpAmpMode};
use crate::error::Result;

use super::mna::{branch_row, stamp_linear_components, terminal_row, Excitation, MnaMatrix};
use super::worker::CancelToken;
use super::SimulatorConfig;

const ONE: Complex64 = Complex64::new(1.0, 0.0);

/// Resolved mode of one nonlinear part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceMode {
    OpAmp(OpAmpMode),
    Bjt(BjtMode),
}

/// Device modes plus the DC quantities the AC models depend on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperatingPoint {
    modes: BTreeMap<ComponentId, DeviceMode>,
    collector_currents: BTreeMap<ComponentId, f64>,
}

impl OperatingPoint {
    /// Initial assumption: op-amps active, transistors active (or
    /// small-signal when they carry y-parameters).
    pub fn initial(schematic: &Schematic) -> Self {
        let modes = schematic
            .components
            .iter()
            .filter_map(|c| match c {
                Component::OpAmp(o) => Some((o.id, DeviceMode::OpAmp(OpAmpMode::Active))),
                Component::Bjt(q) => Some((q.id, DeviceMode::Bjt(q.initial_mode()))),
                _ => None,
            })
            .collect();
        Self {
            modes,
            collector_currents: BTreeMap::new(),
        }
    }

    pub fn mode(&self, component: ComponentId) -> Option<DeviceMode> {
        self.modes.get(&component).copied()
    }

    /// All resolved modes, ordered by component id.
    pub fn modes(&self) -> impl Iterator<Item = (ComponentId, DeviceMode)> + '_ {
        self.modes.iter().map(|(id, mode)| (*id, *mode))
    }

    fn op_amp_mode(&self, component: ComponentId) -> OpAmpMode {
        match self.modes.get(&component) {
            Some(DeviceMode::OpAmp(mode)) => *mode,
            _ => OpAmpMode::Active,
        }
    }

    fn bjt_mode(&self, component: ComponentId) -> BjtMode {
        match self.modes.get(&component) {
            Some(DeviceMode::Bjt(mode)) => *mode,
            _ => BjtMode::Active,
        }
    }

    /// DC collector current, used for r_π.
    pub fn collector_current(&self, component: ComponentId) -> f64 {
        self.collector_currents.get(&component).copied().unwrap_or(0.0)
    }
}

/// Outcome of the DC mode search.
#[derive(Debug, Clone)]
pub struct ModeResolution {
    pub operating_point: OperatingPoint,
    pub iterations: usize,
    pub converged: bool,
}

/// Clear the matrix and stamp every component for one excitation.
pub fn assemble(
    schematic: &Schematic,
    topology: &Topology,
    matrix: &mut MnaMatrix,
    excitation: Excitation,
    op: &OperatingPoint,
    config: &SimulatorConfig,
) {
    matrix.clear();
    stamp_linear_components(schematic, topology, matrix, excitation);
    stamp_nonlinear_components(schematic, topology, matrix, excitation, op, config.thermal_voltage);
    matrix.stamp_gmin(topology.num_nodes.saturating_sub(1), config.gmin);
}

/// Stamp op-amps and transistors according to their modes.
pub fn stamp_nonlinear_components(
    schematic: &Schematic,
    topology: &Topology,
    matrix: &mut MnaMatrix,
    excitation: Excitation,
    op: &OperatingPoint,
    thermal_voltage: f64,
) {
    for component in &schematic.components {
        match component {
            Component::OpAmp(o) => {
                if let Some(br) = branch_row(topology, o.id) {
                    stamp_op_amp(topology, matrix, excitation, o, op.op_amp_mode(o.id), br);
                }
            }
            Component::Bjt(q) => {
                if let Some(br) = branch_row(topology, q.id) {
                    let i_c = op.collector_current(q.id);
                    let r_pi = q.r_pi(i_c, thermal_voltage);
                    stamp_bjt(topology, matrix, excitation, q, op.bjt_mode(q.id), br, r_pi);
                }
            }
            _ => {}
        }
    }
}

fn stamp_op_amp(
    topology: &Topology,
    matrix: &mut MnaMatrix,
    excitation: Excitation,
    o: &OpAmp,
    mode: OpAmpMode,
    br: usize,
) {
    let n_out = terminal_row(topology, o.id, OpAmp::OUTPUT);
    let n_pos = terminal_row(topology, o.id, OpAmp::NON_INVERTING);
    let n_neg = terminal_row(topology, o.id, OpAmp::INVERTING);

    // Output current is drawn from the supply and delivered into the output node
    matrix.stamp_branch_current(None, n_out, br);

    match o.rail_voltage(mode) {
        // Virtual short: V+ - V- = 0
        None => matrix.stamp_branch_voltage(br, n_pos, n_neg, ONE),
        Some(rail) => {
            matrix.stamp_branch_voltage(br, n_out, None, ONE);
            if excitation.is_dc() {
                matrix.add_source(br, Complex64::new(rail, 0.0));
            }
        }
    }
}

fn stamp_bjt(
    topology: &Topology,
    matrix: &mut MnaMatrix,
    excitation: Excitation,
    q: &Bjt,
    mode: BjtMode,
    br_b: usize,
    r_pi: f64,
) {
    let br_c = br_b + 1;
    let n_c = terminal_row(topology, q.id, Bjt::COLLECTOR);
    let n_b = terminal_row(topology, q.id, Bjt::BASE);
    let n_e = terminal_row(topology, q.id, Bjt::EMITTER);
    let s = Complex64::new(q.bjt_type.polarity(), 0.0);
    let p = &q.params;

    // I_B enters at the base, I_C at the collector; both leave at the emitter
    matrix.stamp_branch_current(n_b, n_e, br_b);
    matrix.stamp_branch_current(n_c, n_e, br_c);

    match mode {
        BjtMode::Cutoff => {
            matrix.stamp_open_branch(br_b);
            matrix.stamp_open_branch(br_c);
        }

        BjtMode::Active | BjtMode::Saturation => {
            if excitation.is_dc() {
                matrix.stamp_branch_voltage(br_b, n_b, n_e, s);
                matrix.add_source(br_b, Complex64::new(p.v_be_on, 0.0));
            } else {
                matrix.stamp_branch_voltage(br_b, n_b, n_e, ONE);
                matrix.add(br_b, br_b, Complex64::new(-r_pi, 0.0));
            }

            if mode == BjtMode::Active {
                // I_C = β·I_B
                matrix.add(br_c, br_c, ONE);
                matrix.add(br_c, br_b, Complex64::new(-p.beta, 0.0));
            } else if excitation.is_dc() {
                matrix.stamp_branch_voltage(br_c, n_c, n_e, s);
                matrix.add_source(br_c, Complex64::new(p.v_ce_sat, 0.0));
            } else {
                matrix.stamp_branch_voltage(br_c, n_c, n_e, ONE);
            }
        }

        BjtMode::SmallSignal => {
            let Some(y) = p.small_signal else {
                matrix.stamp_open_branch(br_b);
                matrix.stamp_open_branch(br_c);
                return;
            };
            // I_B - y11·V_BE - y12·V_CE = 0
            matrix.add(br_b, br_b, ONE);
            matrix.stamp_branch_voltage(br_b, n_b, n_e, -y.y11);
            matrix.stamp_branch_voltage(br_b, n_c, n_e, -y.y12);
            // I_C - y21·V_BE - y22·V_CE = 0
            matrix.add(br_c, br_c, ONE);
            matrix.stamp_branch_voltage(br_c, n_b, n_e, -y.y21);
            matrix.stamp_branch_voltage(br_c, n_c, n_e, -y.y22);
        }
    }
}

/// Piecewise-linear mode search at DC.
pub struct ModeResolver {
    /// Maximum solve/classify rounds
    pub max_iterations: usize,
    /// Op-amps whose active assumption left the system singular
    open_loop: HashSet<ComponentId>,
}

impl ModeResolver {
    pub fn new(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            open_loop: HashSet::new(),
        }
    }

    /// Find consistent modes. On return the matrix holds the DC solution of
    /// the returned operating point.
    ///
    /// Exceeding the iteration bound is not an error: the last attempted
    /// modes are returned with `converged == false`.
    pub fn resolve(
        &mut self,
        schematic: &Schematic,
        topology: &Topology,
        matrix: &mut MnaMatrix,
        config: &SimulatorConfig,
        cancel: &CancelToken,
    ) -> Result<ModeResolution> {
        let has_nonlinear = schematic.components.iter().any(|c| c.is_nonlinear());
        let mut op = OperatingPoint::initial(schematic);
        let mut iterations = 0;

        loop {
            cancel.check()?;
            iterations += 1;

            assemble(schematic, topology, matrix, Excitation::Dc, &op, config);
            if let Err(err) = matrix.factor(config.pivot_threshold, 0.0) {
                // An active op-amp without feedback pins its inputs together
                if iterations < self.max_iterations
                    && self.open_op_amps(schematic, topology, matrix, config, &mut op)
                {
                    log::debug!("mode round {}: singular, opened op-amps without feedback", iterations);
                    continue;
                }
                return Err(err);
            }
            matrix.solve();
            record_collector_currents(schematic, topology, matrix, &mut op);

            if !has_nonlinear {
                return Ok(ModeResolution {
                    operating_point: op,
                    iterations,
                    converged: true,
                });
            }

            let (next, changed) = self.reclassify(schematic, topology, matrix, &op);
            log::debug!("mode round {}: {} device(s) changed mode", iterations, changed);

            if changed == 0 {
                return Ok(ModeResolution {
                    operating_point: op,
                    iterations,
                    converged: true,
                });
            }

            if iterations >= self.max_iterations {
                log::warn!(
                    "device modes did not settle after {} rounds, keeping the last attempt",
                    iterations
                );
                return Ok(ModeResolution {
                    operating_point: op,
                    iterations,
                    converged: false,
                });
            }

            op.modes = next.modes;
        }
    }

    /// Move the smallest set of active op-amps that makes the DC system
    /// solvable into positive saturation and remember them as open-loop.
    /// Returns whether any op-amp was opened.
    ///
    /// All candidates are opened first, then each one is closed again if the
    /// system still factors without it, so op-amps with feedback stay active.
    fn open_op_amps(
        &mut self,
        schematic: &Schematic,
        topology: &Topology,
        matrix: &mut MnaMatrix,
        config: &SimulatorConfig,
        op: &mut OperatingPoint,
    ) -> bool {
        let candidates: Vec<ComponentId> = op
            .modes
            .iter()
            .filter(|(id, mode)| {
                **mode == DeviceMode::OpAmp(OpAmpMode::Active) && !self.open_loop.contains(*id)
            })
            .map(|(id, _)| *id)
            .collect();

        let mut factors = |opened: &[ComponentId]| {
            let mut trial = op.clone();
            for id in opened {
                trial
                    .modes
                    .insert(*id, DeviceMode::OpAmp(OpAmpMode::PositiveSaturation));
            }
            assemble(schematic, topology, matrix, Excitation::Dc, &trial, config);
            matrix.factor(config.pivot_threshold, 0.0).is_ok()
        };

        if candidates.is_empty() || !factors(&candidates) {
            return false;
        }
        let mut opened = candidates.clone();
        for id in &candidates {
            let without: Vec<ComponentId> = opened.iter().copied().filter(|o| o != id).collect();
            if factors(&without) {
                opened = without;
            }
        }

        if opened.is_empty() {
            return false;
        }
        for id in opened {
            log::trace!("{}: no feedback, treated as open-loop", id);
            self.open_loop.insert(id);
            op.modes
                .insert(id, DeviceMode::OpAmp(OpAmpMode::PositiveSaturation));
        }
        true
    }

    fn reclassify(
        &self,
        schematic: &Schematic,
        topology: &Topology,
        matrix: &MnaMatrix,
        op: &OperatingPoint,
    ) -> (OperatingPoint, usize) {
        let v = |id: ComponentId, terminal: usize| matrix.value(terminal_row(topology, id, terminal)).re;
        let mut next = op.clone();
        let mut changed = 0;

        for component in &schematic.components {
            let new_mode = match component {
                Component::OpAmp(o) => {
                    let assumed = op.op_amp_mode(o.id);
                    let mut mode = o.classify(
                        assumed,
                        v(o.id, OpAmp::OUTPUT),
                        v(o.id, OpAmp::NON_INVERTING),
                        v(o.id, OpAmp::INVERTING),
                    );
                    if mode == OpAmpMode::Active && self.open_loop.contains(&o.id) {
                        mode = match assumed {
                            OpAmpMode::PositiveSaturation => OpAmpMode::NegativeSaturation,
                            _ => OpAmpMode::PositiveSaturation,
                        };
                    }
                    DeviceMode::OpAmp(mode)
                }
                Component::Bjt(q) => {
                    let Some(br_b) = branch_row(topology, q.id) else {
                        continue;
                    };
                    DeviceMode::Bjt(q.classify(
                        op.bjt_mode(q.id),
                        v(q.id, Bjt::COLLECTOR),
                        v(q.id, Bjt::BASE),
                        v(q.id, Bjt::EMITTER),
                        matrix.x[br_b].re,
                        matrix.x[br_b + 1].re,
                    ))
                }
                _ => continue,
            };

            if op.mode(component.id()) != Some(new_mode) {
                log::trace!("{}: {:?} -> {:?}", component.name(), op.mode(component.id()), new_mode);
                next.modes.insert(component.id(), new_mode);
                changed += 1;
            }
        }

        (next, changed)
    }
}

fn record_collector_currents(
    schematic: &Schematic,
    topology: &Topology,
    matrix: &MnaMatrix,
    op: &mut OperatingPoint,
) {
    for component in &schematic.components {
        if let Component::Bjt(q) = component {
            if let Some(br_b) = branch_row(topology, q.id) {
                op.collector_currents.insert(q.id, matrix.x[br_b + 1].re);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{BjtParams, BjtType, OpAmpParams};
    use approx::assert_relative_eq;

    fn resolve(s: &Schematic) -> (Topology, MnaMatrix, ModeResolution) {
        let config = SimulatorConfig::default();
        let topo = Topology::from_schematic(s, &config).unwrap();
        let mut m = MnaMatrix::new(topo.matrix_size());
        let r = ModeResolver::new(config.max_mode_iterations)
            .resolve(s, &topo, &mut m, &config, &CancelToken::new())
            .unwrap();
        (topo, m, r)
    }

    #[test]
    fn test_linear_circuit_takes_one_round() {
        let mut s = Schematic::new();
        s.dc_voltage_source("V1", (0.0, 1.0), (0.0, 0.0), 5.0);
        s.resistor("R1", (0.0, 1.0), (0.0, 0.0), 1e3);
        s.ground("GND", (0.0, 0.0));
        let (_, _, r) = resolve(&s);
        assert!(r.converged);
        assert_eq!(r.iterations, 1);
    }

    #[test]
    fn test_voltage_follower_stays_active() {
        let mut s = Schematic::new();
        s.dc_voltage_source("V1", (0.0, 1.0), (0.0, 0.0), 2.0);
        let u = s.op_amp("U1", (2.0, 1.0), (0.0, 1.0), (2.0, 1.0), OpAmpParams::default());
        s.resistor("RL", (2.0, 1.0), (2.0, 0.0), 1e3);
        s.ground("GND", (0.0, 0.0));
        s.wire((2.0, 0.0), (0.0, 0.0));
        let (topo, m, r) = resolve(&s);
        assert!(r.converged);
        assert_eq!(r.operating_point.mode(u), Some(DeviceMode::OpAmp(OpAmpMode::Active)));
        assert_relative_eq!(m.value(terminal_row(&topo, u, OpAmp::OUTPUT)).re, 2.0, max_relative = 1e-9);
    }

    #[test]
    fn test_open_loop_comparator_saturates() {
        let mut s = Schematic::new();
        // + at 1 V, - at 2 V, no feedback
        s.dc_voltage_source("V1", (0.0, 1.0), (0.0, 0.0), 1.0);
        s.dc_voltage_source("V2", (1.0, 1.0), (1.0, 0.0), 2.0);
        let u = s.op_amp("U1", (2.0, 1.0), (0.0, 1.0), (1.0, 1.0), OpAmpParams::default());
        s.resistor("RL", (2.0, 1.0), (2.0, 0.0), 1e4);
        s.ground("GND", (0.0, 0.0));
        s.wire((1.0, 0.0), (0.0, 0.0));
        s.wire((2.0, 0.0), (1.0, 0.0));
        let (topo, m, r) = resolve(&s);
        assert!(r.converged);
        assert_eq!(
            r.operating_point.mode(u),
            Some(DeviceMode::OpAmp(OpAmpMode::NegativeSaturation))
        );
        assert_relative_eq!(m.value(terminal_row(&topo, u, OpAmp::OUTPUT)).re, -15.0, max_relative = 1e-9);
    }

    #[test]
    fn test_only_op_amp_without_feedback_is_opened() {
        let mut s = Schematic::new();
        // Follower driven from 2 V
        s.dc_voltage_source("V1", (0.0, 1.0), (0.0, 0.0), 2.0);
        let follower = s.op_amp("U1", (2.0, 1.0), (0.0, 1.0), (2.0, 1.0), OpAmpParams::default());
        s.resistor("RL1", (2.0, 1.0), (2.0, 0.0), 1e3);
        // Comparator: + at 3 V, - at 1 V, no feedback
        s.dc_voltage_source("V2", (4.0, 1.0), (4.0, 0.0), 3.0);
        s.dc_voltage_source("V3", (5.0, 1.0), (5.0, 0.0), 1.0);
        let comparator = s.op_amp("U2", (6.0, 1.0), (4.0, 1.0), (5.0, 1.0), OpAmpParams::default());
        s.resistor("RL2", (6.0, 1.0), (6.0, 0.0), 1e4);
        s.ground("GND", (0.0, 0.0));
        for x in [2.0, 4.0, 5.0, 6.0] {
            s.wire((x, 0.0), (0.0, 0.0));
        }

        let (topo, m, r) = resolve(&s);
        assert!(r.converged);
        assert_eq!(
            r.operating_point.mode(follower),
            Some(DeviceMode::OpAmp(OpAmpMode::Active))
        );
        assert_eq!(
            r.operating_point.mode(comparator),
            Some(DeviceMode::OpAmp(OpAmpMode::PositiveSaturation))
        );
        assert_relative_eq!(m.value(terminal_row(&topo, follower, OpAmp::OUTPUT)).re, 2.0, max_relative = 1e-9);
        assert_relative_eq!(m.value(terminal_row(&topo, comparator, OpAmp::OUTPUT)).re, 15.0, max_relative = 1e-9);
    }

    #[test]
    fn test_unbiased_transistor_goes_to_cutoff() {
        let mut s = Schematic::new();
        s.dc_voltage_source("VCC", (0.0, 2.0), (0.0, 0.0), 10.0);
        s.resistor("RC", (0.0, 2.0), (1.0, 2.0), 1e3);
        // Base tied to ground through a resistor
        s.resistor("RB", (1.0, 1.0), (1.0, 0.0), 1e4);
        let q = s.bjt(
            "Q1",
            (1.0, 2.0),
            (1.0, 1.0),
            (0.0, 0.0),
            BjtType::Npn,
            BjtParams::default(),
        );
        s.ground("GND", (0.0, 0.0));
        s.wire((1.0, 0.0), (0.0, 0.0));
        let (topo, m, r) = resolve(&s);
        assert!(r.converged);
        assert_eq!(r.operating_point.mode(q), Some(DeviceMode::Bjt(BjtMode::Cutoff)));
        // No collector current, so the collector sits at the supply
        assert_relative_eq!(m.value(terminal_row(&topo, q, Bjt::COLLECTOR)).re, 10.0, max_relative = 1e-6);
    }

    #[test]
    fn test_overdriven_transistor_saturates() {
        let mut s = Schematic::new();
        s.dc_voltage_source("VCC", (0.0, 2.0), (0.0, 0.0), 10.0);
        s.resistor("RC", (0.0, 2.0), (1.0, 2.0), 1e3);
        s.resistor("RB", (0.0, 2.0), (1.0, 1.0), 1e4);
        let q = s.bjt(
            "Q1",
            (1.0, 2.0),
            (1.0, 1.0),
            (0.0, 0.0),
            BjtType::Npn,
            BjtParams::default(),
        );
        s.ground("GND", (0.0, 0.0));
        let (topo, m, r) = resolve(&s);
        assert!(r.converged);
        assert_eq!(r.operating_point.mode(q), Some(DeviceMode::Bjt(BjtMode::Saturation)));
        assert_relative_eq!(m.value(terminal_row(&topo, q, Bjt::COLLECTOR)).re, 0.2, max_relative = 1e-6);
        assert_relative_eq!(r.operating_point.collector_current(q), 9.8e-3, max_relative = 1e-6);
    }

    #[test]
    fn test_iteration_bound_is_not_an_error() {
        let mut s = Schematic::new();
        s.dc_voltage_source("VCC", (0.0, 2.0), (0.0, 0.0), 10.0);
        s.resistor("RC", (0.0, 2.0), (1.0, 2.0), 1e3);
        s.resistor("RB", (0.0, 2.0), (1.0, 1.0), 1e4);
        s.bjt(
            "Q1",
            (1.0, 2.0),
            (1.0, 1.0),
            (0.0, 0.0),
            BjtType::Npn,
            BjtParams::default(),
        );
        s.ground("GND", (0.0, 0.0));
        let config = SimulatorConfig::default().with_max_mode_iterations(1);
        let topo = Topology::from_schematic(&s, &config).unwrap();
        let mut m = MnaMatrix::new(topo.matrix_size());
        let r = ModeResolver::new(1)
            .resolve(&s, &topo, &mut m, &config, &CancelToken::new())
            .unwrap();
        assert!(!r.converged);
        assert_eq!(r.iterations, 1);
    }

    #[test]
    fn test_cancelled_before_first_round() {
        let mut s = Schematic::new();
        s.resistor("R1", (0.0, 1.0), (0.0, 0.0), 1e3);
        s.ground("GND", (0.0, 0.0));
        let config = SimulatorConfig::default();
        let topo = Topology::from_schematic(&s, &config).unwrap();
        let mut m = MnaMatrix::new(topo.matrix_size());
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = ModeResolver::new(4)
            .resolve(&s, &topo, &mut m, &config, &cancel)
            .unwrap_err();
        assert_eq!(err, crate::error::SimError::Cancelled);
    }
}
