//! Topology extracted from a schematic: nodes, terminal lookup and the
//! layout of the MNA unknowns.

use std::collections::HashMap;

use crate::error::{Result, SimError};
use crate::solver::SimulatorConfig;

use super::nodes::{aggregate, Node};
use super::schematic::Schematic;
use super::types::{BranchId, ComponentId, NodeId, TerminalRef, VarIndex};

/// Nodes and branches of one schematic, ready for matrix assembly.
#[derive(Debug, Clone)]
pub struct Topology {
    /// Aggregated nodes, ordered by index (unindexed nodes last)
    pub nodes: Vec<Node>,

    /// Terminal → node lookup used while stamping
    terminal_nodes: HashMap<TerminalRef, NodeId>,

    /// Number of indexed nodes (including ground)
    pub num_nodes: usize,

    /// Number of branch current variables
    pub num_branches: usize,

    /// First branch of each component that owns branches
    branches: HashMap<ComponentId, BranchId>,

    /// Owning component of each branch
    branch_owners: Vec<ComponentId>,
}

impl Topology {
    /// Aggregate nodes and allocate branch unknowns.
    pub fn from_schematic(schematic: &Schematic, config: &SimulatorConfig) -> Result<Self> {
        let nodes = aggregate(schematic, config.grid, config.implicit_ground);

        if !nodes.iter().any(|n| n.index == Some(NodeId::GROUND)) {
            return Err(SimError::MissingGround);
        }

        let mut terminal_nodes = HashMap::new();
        let mut num_nodes = 0;
        for node in &nodes {
            if let Some(index) = node.index {
                num_nodes += 1;
                for terminal in &node.terminals {
                    terminal_nodes.insert(*terminal, index);
                }
            }
        }

        let mut branches = HashMap::new();
        let mut branch_owners = Vec::new();
        for component in &schematic.components {
            let count = component.branch_count();
            if count > 0 {
                branches.insert(component.id(), BranchId(branch_owners.len()));
                branch_owners.extend(std::iter::repeat(component.id()).take(count));
            }
        }

        log::debug!(
            "topology: {} nodes ({} stray), {} branches",
            num_nodes,
            nodes.len() - num_nodes,
            branch_owners.len()
        );

        Ok(Topology {
            nodes,
            terminal_nodes,
            num_nodes,
            num_branches: branch_owners.len(),
            branches,
            branch_owners,
        })
    }

    /// Get the total size of the MNA solution vector.
    pub fn matrix_size(&self) -> usize {
        // Nodes (excluding ground) + branch currents
        (self.num_nodes - 1) + self.num_branches
    }

    /// Get the matrix index for a node voltage.
    /// Returns None for ground (node 0).
    pub fn node_index(&self, node: NodeId) -> Option<usize> {
        VarIndex::Voltage(node).to_index(self.num_nodes)
    }

    /// Get the matrix index for a branch current.
    pub fn branch_index(&self, branch: BranchId) -> usize {
        (self.num_nodes - 1) + branch.0
    }

    /// Matrix index of any unknown.
    pub fn var_index(&self, var: VarIndex) -> Option<usize> {
        var.to_index(self.num_nodes)
    }

    /// Node a terminal sits on.
    pub fn node_of(&self, terminal: TerminalRef) -> Option<NodeId> {
        self.terminal_nodes.get(&terminal).copied()
    }

    /// Node of terminal `index` of `component`.
    pub fn terminal_node(&self, component: ComponentId, index: usize) -> Option<NodeId> {
        self.node_of(TerminalRef::new(component, index))
    }

    /// First branch owned by a component.
    pub fn branch_of(&self, component: ComponentId) -> Option<BranchId> {
        self.branches.get(&component).copied()
    }

    /// Component owning a branch.
    pub fn branch_owner(&self, branch: BranchId) -> Option<ComponentId> {
        self.branch_owners.get(branch.0).copied()
    }

    /// Indexed node with the given id.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.index == Some(id))
    }
}
