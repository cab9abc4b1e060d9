//! Node aggregation: terminals → topological nodes.
//!
//! Terminals at the same rounded grid point form one node. Wires then join
//! position-nodes into larger nodes. Merges are recorded in a union-find over
//! arena indices; the arena is only read back through the representatives,
//! so an absorbed slot is never consulted again.

use std::collections::HashMap;

use crate::components::Component;

use super::schematic::Schematic;
use super::types::{ComponentId, GridPoint, NodeId, TerminalRef};

/// A topological node: every terminal at one electrical potential.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    /// Matrix node index, `None` for nodes without terminals
    pub index: Option<NodeId>,
    /// Grid position of the first position-group merged into this node
    pub position: Option<GridPoint>,
    /// Components with at least one terminal on this node
    pub components: Vec<ComponentId>,
    /// Terminals on this node
    pub terminals: Vec<TerminalRef>,
}

impl Node {
    fn at(position: GridPoint) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    /// A node with no terminals: a stray wire endpoint.
    pub fn is_empty(&self) -> bool {
        self.terminals.is_empty()
    }

    fn push_terminal(&mut self, terminal: TerminalRef) {
        self.terminals.push(terminal);
        if !self.components.contains(&terminal.component) {
            self.components.push(terminal.component);
        }
    }
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            // Keep the lower arena index as representative
            let (keep, drop) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[drop] = keep;
        }
    }
}

/// Group terminals into nodes.
///
/// The returned list is ordered by node index: the ground node first (index
/// 0), then the other nodes with terminals, then empty nodes (stray wire
/// endpoints) which carry no index. Without a ground component the first
/// node becomes the reference when `implicit_ground` is set; otherwise no
/// node gets index 0.
pub fn aggregate(schematic: &Schematic, grid: f64, implicit_ground: bool) -> Vec<Node> {
    let mut arena: Vec<Node> = Vec::new();
    let mut by_point: HashMap<GridPoint, usize> = HashMap::new();

    let mut slot = |arena: &mut Vec<Node>, point: GridPoint| -> usize {
        *by_point.entry(point).or_insert_with(|| {
            arena.push(Node::at(point));
            arena.len() - 1
        })
    };

    // Phase 1: position grouping
    let mut ground_slots = Vec::new();
    for component in &schematic.components {
        for (index, position) in component.terminals().iter().enumerate() {
            let s = slot(&mut arena, position.snap(grid));
            arena[s].push_terminal(TerminalRef::new(component.id(), index));
            if matches!(component, Component::Ground(_)) {
                ground_slots.push(s);
            }
        }
    }

    // Stray wire endpoints still need a slot so wire chains pass through them
    let wire_slots: Vec<(usize, usize)> = schematic
        .wires
        .iter()
        .map(|w| (slot(&mut arena, w.start.snap(grid)), slot(&mut arena, w.end.snap(grid))))
        .collect();

    // Phase 2: wire-network merging. Every ground symbol is the same reference.
    let mut sets = UnionFind::new(arena.len());
    for (a, b) in wire_slots {
        sets.union(a, b);
    }
    if let Some((&first, rest)) = ground_slots.split_first() {
        for &g in rest {
            sets.union(first, g);
        }
    }

    let mut merged: Vec<Node> = Vec::new();
    let mut slot_of_root: HashMap<usize, usize> = HashMap::new();
    for (i, node) in arena.into_iter().enumerate() {
        let root = sets.find(i);
        let target = *slot_of_root.entry(root).or_insert_with(|| {
            merged.push(Node {
                position: node.position,
                ..Node::default()
            });
            merged.len() - 1
        });
        for terminal in node.terminals {
            merged[target].push_terminal(terminal);
        }
    }

    // Index assignment
    let ground = ground_slots
        .first()
        .map(|&g| slot_of_root[&sets.find(g)])
        .or_else(|| {
            if implicit_ground {
                merged.iter().position(|n| !n.is_empty())
            } else {
                None
            }
        });

    let mut next = 1;
    for (i, node) in merged.iter_mut().enumerate() {
        if Some(i) == ground {
            node.index = Some(NodeId::GROUND);
        } else if !node.is_empty() {
            node.index = Some(NodeId(next));
            next += 1;
        }
    }

    merged.sort_by_key(|n| n.index.map_or(usize::MAX, |id| id.0));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRID: f64 = 0.01;

    fn node_of(nodes: &[Node], terminal: TerminalRef) -> Option<NodeId> {
        nodes
            .iter()
            .find(|n| n.terminals.contains(&terminal))
            .and_then(|n| n.index)
    }

    #[test]
    fn test_shared_position_shares_node() {
        let mut s = Schematic::new();
        let r1 = s.resistor("R1", (0.0, 0.0), (1.0, 0.0), 1e3);
        // Within rounding of R1's second terminal
        let r2 = s.resistor("R2", (1.001, 0.0), (2.0, 0.0), 1e3);
        s.ground("GND", (0.0, 0.0));

        let nodes = aggregate(&s, GRID, false);
        let a = node_of(&nodes, TerminalRef::new(r1, 1));
        let b = node_of(&nodes, TerminalRef::new(r2, 0));
        assert!(a.is_some());
        assert_eq!(a, b);
        assert_eq!(node_of(&nodes, TerminalRef::new(r1, 0)), Some(NodeId::GROUND));
    }

    #[test]
    fn test_wire_chain_merges_nodes() {
        let mut s = Schematic::new();
        let r1 = s.resistor("R1", (0.0, 0.0), (1.0, 0.0), 1e3);
        let r2 = s.resistor("R2", (5.0, 5.0), (6.0, 5.0), 1e3);
        s.ground("GND", (0.0, 0.0));
        // Chain through a junction that no terminal sits on
        s.wire((1.0, 0.0), (3.0, 3.0));
        s.wire((3.0, 3.0), (5.0, 5.0));

        let nodes = aggregate(&s, GRID, false);
        assert_eq!(
            node_of(&nodes, TerminalRef::new(r1, 1)),
            node_of(&nodes, TerminalRef::new(r2, 0))
        );
        // The junction itself holds no terminals and adds no indexed node
        assert_eq!(nodes.iter().filter(|n| n.index.is_some()).count(), 3);
    }

    #[test]
    fn test_unconnected_terminals_stay_apart() {
        let mut s = Schematic::new();
        let r1 = s.resistor("R1", (0.0, 0.0), (1.0, 0.0), 1e3);
        let r2 = s.resistor("R2", (1.5, 0.0), (2.0, 0.0), 1e3);
        s.ground("GND", (0.0, 0.0));

        let nodes = aggregate(&s, GRID, false);
        assert_ne!(
            node_of(&nodes, TerminalRef::new(r1, 1)),
            node_of(&nodes, TerminalRef::new(r2, 0))
        );
    }

    #[test]
    fn test_stray_wire_makes_empty_unindexed_node() {
        let mut s = Schematic::new();
        s.resistor("R1", (0.0, 0.0), (1.0, 0.0), 1e3);
        s.ground("GND", (0.0, 0.0));
        s.wire((10.0, 10.0), (11.0, 10.0));

        let nodes = aggregate(&s, GRID, false);
        let empty: Vec<_> = nodes.iter().filter(|n| n.is_empty()).collect();
        assert_eq!(empty.len(), 1);
        assert!(empty[0].index.is_none());
        assert!(empty[0].components.is_empty());
        // Unindexed nodes sort last
        assert!(nodes.last().map_or(false, |n| n.index.is_none()));
    }

    #[test]
    fn test_multiple_grounds_are_one_node() {
        let mut s = Schematic::new();
        let r1 = s.resistor("R1", (0.0, 0.0), (1.0, 0.0), 1e3);
        s.ground("GND1", (0.0, 0.0));
        s.ground("GND2", (1.0, 0.0));

        let nodes = aggregate(&s, GRID, false);
        assert_eq!(node_of(&nodes, TerminalRef::new(r1, 0)), Some(NodeId::GROUND));
        assert_eq!(node_of(&nodes, TerminalRef::new(r1, 1)), Some(NodeId::GROUND));
    }

    #[test]
    fn test_ground_index_without_ground_component() {
        let mut s = Schematic::new();
        let r1 = s.resistor("R1", (0.0, 0.0), (1.0, 0.0), 1e3);

        let nodes = aggregate(&s, GRID, false);
        assert!(nodes.iter().all(|n| n.index != Some(NodeId::GROUND)));

        let nodes = aggregate(&s, GRID, true);
        assert_eq!(node_of(&nodes, TerminalRef::new(r1, 0)), Some(NodeId::GROUND));
        assert_eq!(node_of(&nodes, TerminalRef::new(r1, 1)), Some(NodeId(1)));
    }

    #[test]
    fn test_every_terminal_in_exactly_one_node() {
        let mut s = Schematic::new();
        s.resistor("R1", (0.0, 0.0), (1.0, 0.0), 1e3);
        s.resistor("R2", (1.0, 0.0), (2.0, 0.0), 1e3);
        s.capacitor("C1", (2.0, 0.0), (0.0, 0.0), 1e-6);
        s.ground("GND", (0.0, 0.0));
        s.wire((2.0, 0.0), (2.0, 1.0));

        let nodes = aggregate(&s, GRID, false);
        let total: usize = nodes.iter().map(|n| n.terminals.len()).sum();
        assert_eq!(total, 7);
        for component in &s.components {
            for i in 0..component.terminals().len() {
                let t = TerminalRef::new(component.id(), i);
                assert_eq!(nodes.iter().filter(|n| n.terminals.contains(&t)).count(), 1);
            }
        }
    }
}
