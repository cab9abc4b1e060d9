//! Error types for the schematic bias engine.
//!
//! This module provides a unified error type [`SimError`] that covers
//! every condition that aborts a bias simulation: invalid component
//! parameters, structural problems in the schematic and singular systems.
//!
//! Query-time problems are never errors. The results database answers them
//! with `None` or NaN instead.

use thiserror::Error;

use crate::circuit::{ComponentId, NodeId};

/// Result type alias using [`SimError`].
pub type Result<T> = std::result::Result<T, SimError>;

/// Unified error type for all engine operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    // ============ Schematic Errors ============
    /// Invalid parameter value on a component
    #[error("Invalid parameter '{param}' for component '{component}': {message}")]
    InvalidParameter {
        component: String,
        param: String,
        message: String,
    },

    /// Component reference that does not exist in the schematic
    #[error("Component {id} not found in schematic")]
    ComponentNotFound { id: ComponentId },

    // ============ Topology Errors ============
    /// Missing ground node
    #[error("Schematic has no ground component")]
    MissingGround,

    /// Floating node (not connected to ground path)
    #[error("Floating node {node} detected - no path to ground")]
    FloatingNode { node: NodeId },

    // ============ Simulation Errors ============
    /// Matrix is singular and cannot be solved
    #[error("Singular matrix at {frequency} Hz - circuit may have a floating node or contradictory sources")]
    SingularMatrix { frequency: f64 },

    /// Invalid simulation parameter
    #[error("Invalid simulation parameter: {message}")]
    InvalidSimulationParam { message: String },

    /// Phase shift outside the open interval (0, 2π)
    #[error("Phase shift {phase} rad is outside (0, 2π)")]
    InvalidPhase { phase: f64 },

    /// The solve was superseded by a newer request
    #[error("Bias simulation cancelled")]
    Cancelled,

    /// The background worker thread has gone away
    #[error("Bias worker disconnected")]
    WorkerDisconnected,
}

impl SimError {
    /// Create an invalid parameter error
    pub fn invalid_parameter(
        component: impl Into<String>,
        param: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            component: component.into(),
            param: param.into(),
            message: message.into(),
        }
    }

    /// Create an invalid simulation parameter error
    pub fn invalid_simulation_param(message: impl Into<String>) -> Self {
        Self::InvalidSimulationParam {
            message: message.into(),
        }
    }
}
