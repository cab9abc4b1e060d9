//! Core types for schematic and topology representation.

use std::fmt;

/// Index of a topological node.
/// Node 0 is always ground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    /// The ground node (always index 0).
    pub const GROUND: NodeId = NodeId(0);

    /// Check if this is the ground node.
    pub fn is_ground(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ground() {
            write!(f, "GND")
        } else {
            write!(f, "N{}", self.0)
        }
    }
}

/// A unique identifier for a component in the schematic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub usize);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

/// Index of an active branch (extra current unknown in the MNA system).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BranchId(pub usize);

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I{}", self.0)
    }
}

/// Variable index in the MNA solution vector.
/// Can be either a node voltage or a branch current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarIndex {
    /// Node voltage variable
    Voltage(NodeId),
    /// Branch current variable
    Current(BranchId),
}

impl VarIndex {
    /// Get the raw index into the solution vector.
    /// Node voltages come first (excluding ground), then branch currents.
    pub fn to_index(&self, num_nodes: usize) -> Option<usize> {
        match self {
            VarIndex::Voltage(node) if node.is_ground() => None,
            VarIndex::Voltage(NodeId(n)) => Some(n - 1),
            VarIndex::Current(BranchId(b)) => Some((num_nodes - 1) + b),
        }
    }
}

/// A point on the schematic plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Snap to the rounding grid used for "same node" detection.
    pub fn snap(&self, grid: f64) -> GridPoint {
        GridPoint((self.x / grid).round() as i64, (self.y / grid).round() as i64)
    }
}

impl From<(f64, f64)> for Position {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// A position after rounding to the grid. Two terminals share a node
/// whenever their grid points are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridPoint(pub i64, pub i64);

/// Reference to one terminal of one component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TerminalRef {
    pub component: ComponentId,
    pub index: usize,
}

impl TerminalRef {
    pub const fn new(component: ComponentId, index: usize) -> Self {
        Self { component, index }
    }
}

impl fmt::Display for TerminalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.component, self.index)
    }
}

/// A wire segment between two plane positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wire {
    pub start: Position,
    pub end: Position,
}

impl Wire {
    pub fn new(start: impl Into<Position>, end: impl Into<Position>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}
