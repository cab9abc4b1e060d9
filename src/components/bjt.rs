//! BJT (Bipolar Junction Transistor) model.
//!
//! Large-signal behaviour uses the piecewise-linear textbook model: a fixed
//! base-emitter drop when conducting, a current gain β in the active region
//! and a fixed collector-emitter drop in saturation. The solver assumes an
//! operating mode, solves, and re-assumes until every transistor's solution
//! satisfies the inequalities of its mode.
//!
//! Transistors with hybrid (y-parameter) data skip classification and are
//! stamped as a linear two-port at every frequency.

use num_complex::Complex64;

use crate::circuit::{ComponentId, Position};
use crate::error::{Result, SimError};

/// BJT type (NPN or PNP).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BjtType {
    Npn,
    Pnp,
}

impl BjtType {
    /// +1 for NPN, -1 for PNP.
    pub fn polarity(self) -> f64 {
        match self {
            BjtType::Npn => 1.0,
            BjtType::Pnp => -1.0,
        }
    }
}

/// Common-emitter y-parameters.
///
/// `I_B = y11·V_BE + y12·V_CE`, `I_C = y21·V_BE + y22·V_CE`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridParams {
    pub y11: Complex64,
    pub y12: Complex64,
    pub y21: Complex64,
    pub y22: Complex64,
}

impl HybridParams {
    /// Build from the usual h-parameters of a common-emitter stage.
    pub fn from_h(h_ie: f64, h_re: f64, h_fe: f64, h_oe: f64) -> Self {
        let y11 = 1.0 / h_ie;
        Self {
            y11: Complex64::new(y11, 0.0),
            y12: Complex64::new(-h_re * y11, 0.0),
            y21: Complex64::new(h_fe * y11, 0.0),
            y22: Complex64::new(h_oe - h_fe * h_re * y11, 0.0),
        }
    }

    pub fn is_finite(&self) -> bool {
        [self.y11, self.y12, self.y21, self.y22]
            .iter()
            .all(|y| y.is_finite())
    }
}

/// Parameters for a BJT model.
#[derive(Debug, Clone)]
pub struct BjtParams {
    /// Forward current gain (β_F)
    pub beta: f64,
    /// Base-emitter drop when conducting
    pub v_be_on: f64,
    /// Collector-emitter drop in saturation
    pub v_ce_sat: f64,
    /// When set, the part is stamped as a linear two-port
    pub small_signal: Option<HybridParams>,
}

impl Default for BjtParams {
    fn default() -> Self {
        Self {
            beta: 100.0,
            v_be_on: 0.7,
            v_ce_sat: 0.2,
            small_signal: None,
        }
    }
}

/// Operating region of a transistor during one solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BjtMode {
    Active,
    Cutoff,
    Saturation,
    /// Linear two-port from y-parameters, no classification
    SmallSignal,
}

/// A BJT component.
#[derive(Debug, Clone)]
pub struct Bjt {
    pub id: ComponentId,
    pub name: String,
    pub terminals: [Position; 3], // [collector, base, emitter]
    pub bjt_type: BjtType,
    pub params: BjtParams,
}

impl Bjt {
    pub const COLLECTOR: usize = 0;
    pub const BASE: usize = 1;
    pub const EMITTER: usize = 2;

    /// Create a new BJT.
    pub fn new(
        id: ComponentId,
        name: String,
        terminals: [Position; 3],
        bjt_type: BjtType,
        params: BjtParams,
    ) -> Self {
        Self {
            id,
            name,
            terminals,
            bjt_type,
            params,
        }
    }

    /// Mode assumed before the first solve.
    pub fn initial_mode(&self) -> BjtMode {
        if self.params.small_signal.is_some() {
            BjtMode::SmallSignal
        } else {
            BjtMode::Active
        }
    }

    /// Small-signal base-emitter resistance r_π = β·V_T / |I_C|.
    pub fn r_pi(&self, i_c: f64, thermal_voltage: f64) -> f64 {
        self.params.beta * thermal_voltage / i_c.abs().max(1e-12)
    }

    /// Check the assumed mode against a DC solution and return the mode the
    /// solution is consistent with.
    ///
    /// Voltages are terminal potentials, currents flow into the base and the
    /// collector.
    pub fn classify(
        &self,
        assumed: BjtMode,
        v_c: f64,
        v_b: f64,
        v_e: f64,
        i_b: f64,
        i_c: f64,
    ) -> BjtMode {
        let s = self.bjt_type.polarity();
        let p = &self.params;
        match assumed {
            BjtMode::SmallSignal => BjtMode::SmallSignal,
            BjtMode::Cutoff => {
                if s * (v_b - v_e) > p.v_be_on {
                    BjtMode::Active
                } else {
                    BjtMode::Cutoff
                }
            }
            BjtMode::Active => {
                if s * i_b <= 0.0 {
                    BjtMode::Cutoff
                } else if s * (v_c - v_e) < p.v_ce_sat {
                    BjtMode::Saturation
                } else {
                    BjtMode::Active
                }
            }
            BjtMode::Saturation => {
                if s * i_b <= 0.0 {
                    BjtMode::Cutoff
                } else if s * i_c >= p.beta * s * i_b {
                    BjtMode::Active
                } else {
                    BjtMode::Saturation
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let p = &self.params;
        if !(p.beta.is_finite() && p.beta > 0.0) {
            return Err(SimError::invalid_parameter(
                &self.name,
                "beta",
                format!("must be positive, got {}", p.beta),
            ));
        }
        if !(p.v_be_on.is_finite() && p.v_ce_sat.is_finite()) {
            return Err(SimError::invalid_parameter(
                &self.name,
                "v_be_on",
                "junction drops must be finite",
            ));
        }
        if p.small_signal.is_some_and(|y| !y.is_finite()) {
            return Err(SimError::invalid_parameter(
                &self.name,
                "small_signal",
                "y-parameters must be finite",
            ));
        }
        Ok(())
    }
}
