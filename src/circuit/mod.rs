//! Schematic snapshot, node aggregation and topology.
//!
//! This module turns the editor's view of a circuit (components with
//! terminal positions, wires between plane points) into the indexed
//! [`Topology`] the solver stamps into the MNA matrix.

mod nodes;
mod schematic;
mod topology;
mod types;
mod validate;

pub use nodes::{aggregate, Node};
pub use schematic::Schematic;
pub use topology::Topology;
pub use types::*;
pub use validate::{check_connectivity, validate_schematic};
