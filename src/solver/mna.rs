//! MNA matrix assembly and solving.
//!
//! One dense complex system per excitation frequency. Branch current
//! convention: a source branch carries the current it delivers out of its
//! positive (or output) terminal into the circuit; a passive or transistor
//! branch carries the current flowing through the element from its first
//! node to its second.

use num_complex::Complex64;

use crate::circuit::{ComponentId, Schematic, Topology};
use crate::components::{Component, Waveform};
use crate::error::{Result, SimError};

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);

/// MNA matrix system Ax = z.
#[derive(Debug, Clone)]
pub struct MnaMatrix {
    /// System matrix A (row-major)
    pub a: Vec<Complex64>,
    /// Source vector z
    pub z: Vec<Complex64>,
    /// Solution vector x
    pub x: Vec<Complex64>,
    /// Matrix dimension
    pub size: usize,
    /// LU decomposition of A
    lu: Vec<Complex64>,
    /// Pivot indices for LU decomposition
    pivots: Vec<usize>,
}

impl MnaMatrix {
    /// Create a zeroed system of the given dimension.
    pub fn new(size: usize) -> Self {
        Self {
            a: vec![ZERO; size * size],
            z: vec![ZERO; size],
            x: vec![ZERO; size],
            size,
            lu: vec![ZERO; size * size],
            pivots: vec![0; size],
        }
    }

    /// Clear the matrix and vectors to zero.
    pub fn clear(&mut self) {
        self.a.fill(ZERO);
        self.z.fill(ZERO);
    }

    /// Get matrix element at (row, col).
    pub fn get(&self, row: usize, col: usize) -> Complex64 {
        self.a[row * self.size + col]
    }

    /// Add to matrix element at (row, col).
    pub fn add(&mut self, row: usize, col: usize, value: Complex64) {
        self.a[row * self.size + col] += value;
    }

    /// Add to source vector element.
    pub fn add_source(&mut self, row: usize, value: Complex64) {
        self.z[row] += value;
    }

    /// Stamp an admittance between two nodes.
    /// For an admittance Y between nodes n1 and n2:
    ///   A[n1,n1] += Y
    ///   A[n2,n2] += Y
    ///   A[n1,n2] -= Y
    ///   A[n2,n1] -= Y
    pub fn stamp_admittance(&mut self, n1: Option<usize>, n2: Option<usize>, y: Complex64) {
        if let Some(i) = n1 {
            self.add(i, i, y);
        }
        if let Some(j) = n2 {
            self.add(j, j, y);
        }
        if let (Some(i), Some(j)) = (n1, n2) {
            self.add(i, j, -y);
            self.add(j, i, -y);
        }
    }

    /// Stamp a current source. Current flows through the source from
    /// `n_from` to `n_to`, leaving `n_from` and entering `n_to`.
    pub fn stamp_current_source(&mut self, n_from: Option<usize>, n_to: Option<usize>, current: Complex64) {
        if let Some(i) = n_from {
            self.add_source(i, -current);
        }
        if let Some(j) = n_to {
            self.add_source(j, current);
        }
    }

    /// Couple branch `br` into KCL: its current leaves `n_from` and enters
    /// `n_to` through the element.
    pub fn stamp_branch_current(&mut self, n_from: Option<usize>, n_to: Option<usize>, br: usize) {
        if let Some(i) = n_from {
            self.add(i, br, ONE);
        }
        if let Some(j) = n_to {
            self.add(j, br, -ONE);
        }
    }

    /// Add `coeff·(V[n_pos] - V[n_neg])` to the branch equation `br`.
    pub fn stamp_branch_voltage(
        &mut self,
        br: usize,
        n_pos: Option<usize>,
        n_neg: Option<usize>,
        coeff: Complex64,
    ) {
        if let Some(i) = n_pos {
            self.add(br, i, coeff);
        }
        if let Some(j) = n_neg {
            self.add(br, j, -coeff);
        }
    }

    /// Stamp a voltage source between two nodes with branch current at index br.
    /// V[n+] - V[n-] = E, branch current delivered out of n+.
    pub fn stamp_voltage_source(
        &mut self,
        n_pos: Option<usize>,
        n_neg: Option<usize>,
        br: usize,
        voltage: Complex64,
    ) {
        // Delivered current flows through the source from n- to n+
        self.stamp_branch_current(n_neg, n_pos, br);
        self.stamp_branch_voltage(br, n_pos, n_neg, ONE);
        self.z[br] = voltage;
    }

    /// Stamp a series impedance Z carried by branch `br` (passive sign
    /// convention): V[n1] - V[n2] - Z·I = 0. Z = 0 is a short.
    pub fn stamp_series_impedance(
        &mut self,
        n1: Option<usize>,
        n2: Option<usize>,
        br: usize,
        z: Complex64,
    ) {
        self.stamp_branch_current(n1, n2, br);
        self.stamp_branch_voltage(br, n1, n2, ONE);
        self.add(br, br, -z);
    }

    /// Pin a branch current to zero (unused branch of the current mode).
    pub fn stamp_open_branch(&mut self, br: usize) {
        self.add(br, br, ONE);
    }

    /// Stamp a minimum conductance from every node row to ground.
    pub fn stamp_gmin(&mut self, num_node_rows: usize, gmin: f64) {
        if gmin > 0.0 {
            for i in 0..num_node_rows {
                self.add(i, i, Complex64::new(gmin, 0.0));
            }
        }
    }

    /// Perform LU decomposition with partial pivoting.
    pub fn factor(&mut self, pivot_threshold: f64, frequency: f64) -> Result<()> {
        let n = self.size;
        self.lu.copy_from_slice(&self.a);

        for i in 0..n {
            self.pivots[i] = i;
        }

        for k in 0..n {
            // Find pivot
            let mut max_val = self.lu[k * n + k].norm();
            let mut max_row = k;

            for i in (k + 1)..n {
                let val = self.lu[i * n + k].norm();
                if val > max_val {
                    max_val = val;
                    max_row = i;
                }
            }

            if !(max_val >= pivot_threshold) {
                return Err(SimError::SingularMatrix { frequency });
            }

            // Swap rows if needed
            if max_row != k {
                self.pivots.swap(k, max_row);
                for j in 0..n {
                    self.lu.swap(k * n + j, max_row * n + j);
                }
            }

            // Eliminate
            let pivot = self.lu[k * n + k];
            for i in (k + 1)..n {
                let factor = self.lu[i * n + k] / pivot;
                self.lu[i * n + k] = factor;
                for j in (k + 1)..n {
                    let upper = self.lu[k * n + j];
                    self.lu[i * n + j] -= factor * upper;
                }
            }
        }

        Ok(())
    }

    /// Solve the system using the pre-computed LU decomposition.
    pub fn solve(&mut self) {
        let n = self.size;

        // Apply pivot permutation to z
        for i in 0..n {
            self.x[i] = self.z[self.pivots[i]];
        }

        // Forward substitution (L * y = Pb)
        for i in 0..n {
            for j in 0..i {
                let xj = self.x[j];
                self.x[i] -= self.lu[i * n + j] * xj;
            }
        }

        // Back substitution (U * x = y)
        for i in (0..n).rev() {
            for j in (i + 1)..n {
                let xj = self.x[j];
                self.x[i] -= self.lu[i * n + j] * xj;
            }
            self.x[i] /= self.lu[i * n + i];
        }
    }

    /// Factor and solve in one go.
    pub fn factor_and_solve(&mut self, pivot_threshold: f64, frequency: f64) -> Result<&[Complex64]> {
        self.factor(pivot_threshold, frequency)?;
        self.solve();
        Ok(&self.x)
    }

    /// Get the solved value at a row, 0 for ground.
    pub fn value(&self, row: Option<usize>) -> Complex64 {
        match row {
            Some(i) => self.x[i],
            None => ZERO, // Ground
        }
    }
}

/// Which sources drive one system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Excitation {
    /// DC values and AC offsets
    Dc,
    /// Only sources at this frequency; the rest are zeroed
    Frequency(f64),
    /// Every AC source driven at this frequency
    Sweep(f64),
}

impl Excitation {
    pub fn frequency(self) -> f64 {
        match self {
            Excitation::Dc => 0.0,
            Excitation::Frequency(f) | Excitation::Sweep(f) => f,
        }
    }

    pub fn is_dc(self) -> bool {
        matches!(self, Excitation::Dc)
    }

    /// Value a source injects into this system.
    pub fn source_value(self, waveform: &Waveform) -> Complex64 {
        match self {
            Excitation::Dc => Complex64::new(waveform.dc_value(), 0.0),
            Excitation::Frequency(f) => waveform.value_at(f),
            Excitation::Sweep(_) => waveform.ac_phasor(),
        }
    }
}

/// Matrix row of terminal `index` of `component`, `None` for ground.
pub(crate) fn terminal_row(topology: &Topology, component: ComponentId, index: usize) -> Option<usize> {
    topology
        .terminal_node(component, index)
        .and_then(|node| topology.node_index(node))
}

/// Matrix row of the first branch owned by `component`.
pub(crate) fn branch_row(topology: &Topology, component: ComponentId) -> Option<usize> {
    topology
        .branch_of(component)
        .map(|branch| topology.branch_index(branch))
}

/// Stamp all mode-independent components into the MNA matrix.
pub fn stamp_linear_components(
    schematic: &Schematic,
    topology: &Topology,
    matrix: &mut MnaMatrix,
    excitation: Excitation,
) {
    let frequency = excitation.frequency();
    for component in &schematic.components {
        let id = component.id();
        let n1 = terminal_row(topology, id, 0);
        let n2 = terminal_row(topology, id, 1);
        match component {
            Component::Resistor(_) | Component::Capacitor(_) => {
                if let Some(y) = component.admittance(frequency) {
                    matrix.stamp_admittance(n1, n2, y);
                }
            }

            Component::Inductor(l) => {
                if let Some(br) = branch_row(topology, id) {
                    // Short at DC, jωL at AC
                    matrix.stamp_series_impedance(n1, n2, br, l.impedance(frequency));
                }
            }

            Component::VoltageSource(v) => {
                if let Some(br) = branch_row(topology, id) {
                    matrix.stamp_voltage_source(n1, n2, br, excitation.source_value(&v.waveform));
                }
            }

            Component::CurrentSource(i) => {
                matrix.stamp_current_source(n1, n2, excitation.source_value(&i.waveform));
            }

            // Mode-dependent parts are stamped by the mode resolver
            Component::OpAmp(_) | Component::Bjt(_) | Component::Ground(_) => {}
        }
    }
}
