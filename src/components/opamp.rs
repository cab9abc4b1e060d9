//! Operational Amplifier model.
//!
//! The op-amp is ideal between its supply rails. In the active region it
//! enforces V+ = V- (virtual short) and sources whatever output current the
//! circuit demands. Outside the rails the output is clamped to the rail and
//! the virtual short no longer holds.

use crate::circuit::{ComponentId, Position};
use crate::error::{Result, SimError};

/// Parameters for an op-amp model.
#[derive(Debug, Clone)]
pub struct OpAmpParams {
    /// Positive rail voltage
    pub v_rail_pos: f64,
    /// Negative rail voltage
    pub v_rail_neg: f64,
}

impl Default for OpAmpParams {
    fn default() -> Self {
        Self::with_rails(15.0, -15.0)
    }
}

impl OpAmpParams {
    /// Create parameters for the given supply rails.
    pub fn with_rails(v_rail_pos: f64, v_rail_neg: f64) -> Self {
        Self {
            v_rail_pos,
            v_rail_neg,
        }
    }

    /// Single-supply part running from `v_supply` to ground.
    pub fn single_supply(v_supply: f64) -> Self {
        Self::with_rails(v_supply, 0.0)
    }
}

/// Operating region of an op-amp during one solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpAmpMode {
    /// Linear region, virtual short between the inputs
    Active,
    /// Output clamped to the positive rail
    PositiveSaturation,
    /// Output clamped to the negative rail
    NegativeSaturation,
}

/// An operational amplifier component.
#[derive(Debug, Clone)]
pub struct OpAmp {
    pub id: ComponentId,
    pub name: String,
    pub terminals: [Position; 3], // [output, non-inverting (+), inverting (-)]
    pub params: OpAmpParams,
}

impl OpAmp {
    /// Terminal index of the output.
    pub const OUTPUT: usize = 0;
    /// Terminal index of the non-inverting input.
    pub const NON_INVERTING: usize = 1;
    /// Terminal index of the inverting input.
    pub const INVERTING: usize = 2;

    /// Create a new op-amp.
    pub fn new(id: ComponentId, name: String, terminals: [Position; 3], params: OpAmpParams) -> Self {
        Self {
            id,
            name,
            terminals,
            params,
        }
    }

    /// Output voltage enforced by a saturated mode at DC.
    pub fn rail_voltage(&self, mode: OpAmpMode) -> Option<f64> {
        match mode {
            OpAmpMode::Active => None,
            OpAmpMode::PositiveSaturation => Some(self.params.v_rail_pos),
            OpAmpMode::NegativeSaturation => Some(self.params.v_rail_neg),
        }
    }

    /// Check the assumed mode against a DC solution and return the mode the
    /// solution is consistent with.
    pub fn classify(&self, assumed: OpAmpMode, v_out: f64, v_pos: f64, v_neg: f64) -> OpAmpMode {
        let v_diff = v_pos - v_neg;
        match assumed {
            OpAmpMode::Active if v_out > self.params.v_rail_pos => OpAmpMode::PositiveSaturation,
            OpAmpMode::Active if v_out < self.params.v_rail_neg => OpAmpMode::NegativeSaturation,
            OpAmpMode::PositiveSaturation if v_diff < 0.0 => OpAmpMode::Active,
            OpAmpMode::NegativeSaturation if v_diff > 0.0 => OpAmpMode::Active,
            _ => assumed,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let p = &self.params;
        if !(p.v_rail_pos.is_finite() && p.v_rail_neg.is_finite()) || p.v_rail_neg >= p.v_rail_pos {
            return Err(SimError::invalid_parameter(
                &self.name,
                "rails",
                format!(
                    "negative rail {} must lie below positive rail {}",
                    p.v_rail_neg, p.v_rail_pos
                ),
            ));
        }
        Ok(())
    }
}
