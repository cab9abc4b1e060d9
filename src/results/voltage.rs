//! Node potentials and voltage differences.

use crate::circuit::{ComponentId, NodeId};
use crate::components::{Bjt, Component, OpAmp};
use crate::signal::{PhasorSignal, SweepSignal};
use crate::solver::BiasSolution;

use super::{memoized, Direction, ResultsDatabase, VoltageKey};

/// Voltage view of a [`ResultsDatabase`].
#[derive(Debug, Clone, Copy)]
pub struct VoltageDb<'a> {
    db: &'a ResultsDatabase,
}

impl<'a> VoltageDb<'a> {
    pub(super) fn new(db: &'a ResultsDatabase) -> Self {
        Self { db }
    }

    fn solution(&self) -> Option<&'a BiasSolution> {
        self.db.solution.as_ref()
    }

    /// Potential of a node relative to ground.
    pub fn node(&self, node: NodeId) -> Option<PhasorSignal> {
        self.solution()?.node_potential(node).cloned()
    }

    /// `potential(b) − potential(a)`, combined per shared frequency.
    pub fn between(&self, a: NodeId, b: NodeId) -> Option<PhasorSignal> {
        memoized(&self.db.voltages, VoltageKey::Between(a, b), || {
            let solution = self.solution()?;
            let va = solution.node_potential(a)?;
            let vb = solution.node_potential(b)?;
            Some(vb.difference(va))
        })
    }

    /// Potential at one terminal of a component.
    pub fn terminal(&self, component: ComponentId, index: usize) -> Option<PhasorSignal> {
        let node = self.solution()?.topology().terminal_node(component, index)?;
        self.node(node)
    }

    /// Voltage across a component: terminal 0 relative to terminal 1 for
    /// two-terminal parts, V_CE for transistors and the output potential
    /// for op-amps.
    pub fn component(&self, component: ComponentId, direction: Direction) -> Option<PhasorSignal> {
        memoized(
            &self.db.voltages,
            VoltageKey::Component(component, direction),
            || {
                let (pos, neg) = self.component_nodes(component)?;
                let forward = self.between(neg, pos)?;
                Some(match direction {
                    Direction::Forward => forward,
                    Direction::Reverse => forward.negate(),
                })
            },
        )
    }

    /// Swept potential of a node.
    pub fn sweep_node(&self, node: NodeId) -> Option<SweepSignal> {
        self.solution()?.sweep_node(node).cloned()
    }

    /// Swept `potential(b) − potential(a)`.
    pub fn sweep_between(&self, a: NodeId, b: NodeId) -> Option<SweepSignal> {
        let solution = self.solution()?;
        solution.sweep_node(b)?.difference(solution.sweep_node(a)?)
    }

    /// Swept voltage across a component, oriented as in [`component`](Self::component).
    pub fn sweep_component(&self, component: ComponentId, direction: Direction) -> Option<SweepSignal> {
        let (pos, neg) = self.component_nodes(component)?;
        let forward = self.sweep_between(neg, pos)?;
        Some(match direction {
            Direction::Forward => forward,
            Direction::Reverse => forward.negate(),
        })
    }

    /// `(positive, negative)` nodes that define a component's voltage.
    fn component_nodes(&self, component: ComponentId) -> Option<(NodeId, NodeId)> {
        let solution = self.solution()?;
        let topology = solution.topology();
        let (pos, neg) = match solution.schematic().component(component)? {
            Component::Ground(_) => return None,
            Component::OpAmp(_) => {
                return Some((topology.terminal_node(component, OpAmp::OUTPUT)?, NodeId::GROUND))
            }
            Component::Bjt(_) => (Bjt::COLLECTOR, Bjt::EMITTER),
            _ => (0, 1),
        };
        Some((
            topology.terminal_node(component, pos)?,
            topology.terminal_node(component, neg)?,
        ))
    }
}
