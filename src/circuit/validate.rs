//! Schematic validation.

use std::collections::VecDeque;

use crate::components::Component;
use crate::error::{Result, SimError};

use super::schematic::Schematic;
use super::topology::Topology;
use super::types::NodeId;

/// Validate a schematic for simulation.
///
/// Checks:
/// - Component parameters are valid
/// - Component ids match their position in the schematic
pub fn validate_schematic(schematic: &Schematic) -> Result<()> {
    for (i, component) in schematic.components.iter().enumerate() {
        if component.id().0 != i {
            return Err(SimError::ComponentNotFound { id: component.id() });
        }
        component.validate()?;
    }
    Ok(())
}

/// Check that every indexed node has a structural path to ground.
///
/// A component connects all of its terminals' nodes; capacitors count as
/// connections here, DC isolation behind them is handled by `gmin`.
pub fn check_connectivity(schematic: &Schematic, topology: &Topology) -> Result<()> {
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); topology.num_nodes];
    for component in &schematic.components {
        if matches!(component, Component::Ground(_)) {
            continue;
        }
        let nodes: Vec<usize> = (0..component.terminals().len())
            .filter_map(|i| topology.terminal_node(component.id(), i))
            .map(|n| n.0)
            .collect();
        for pair in nodes.windows(2) {
            adjacency[pair[0]].push(pair[1]);
            adjacency[pair[1]].push(pair[0]);
        }
    }

    let mut reached = vec![false; topology.num_nodes];
    let mut queue = VecDeque::from([NodeId::GROUND.0]);
    reached[NodeId::GROUND.0] = true;
    while let Some(n) = queue.pop_front() {
        for &m in &adjacency[n] {
            if !reached[m] {
                reached[m] = true;
                queue.push_back(m);
            }
        }
    }

    match reached.iter().position(|r| !r) {
        Some(n) => Err(SimError::FloatingNode { node: NodeId(n) }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::SimulatorConfig;

    #[test]
    fn test_floating_island_detected() {
        let mut s = Schematic::new();
        s.dc_voltage_source("V1", (0.0, 1.0), (0.0, 0.0), 5.0);
        s.resistor("R1", (0.0, 1.0), (0.0, 0.0), 1e3);
        s.ground("GND", (0.0, 0.0));
        // Isolated loop
        s.resistor("R2", (5.0, 0.0), (6.0, 0.0), 1e3);
        s.resistor("R3", (6.0, 0.0), (5.0, 0.0), 1e3);

        let topo = Topology::from_schematic(&s, &SimulatorConfig::default()).unwrap();
        assert!(matches!(
            check_connectivity(&s, &topo),
            Err(SimError::FloatingNode { .. })
        ));
    }

    #[test]
    fn test_connected_schematic_passes() {
        let mut s = Schematic::new();
        s.dc_voltage_source("V1", (0.0, 1.0), (0.0, 0.0), 5.0);
        s.resistor("R1", (0.0, 1.0), (1.0, 1.0), 1e3);
        s.capacitor("C1", (1.0, 1.0), (1.0, 0.0), 1e-6);
        s.ground("GND", (0.0, 0.0));
        s.wire((1.0, 0.0), (0.0, 0.0));

        validate_schematic(&s).unwrap();
        let topo = Topology::from_schematic(&s, &SimulatorConfig::default()).unwrap();
        check_connectivity(&s, &topo).unwrap();
    }

    #[test]
    fn test_invalid_parameter_rejected() {
        let mut s = Schematic::new();
        s.resistor("R1", (0.0, 0.0), (1.0, 0.0), -10.0);
        assert!(matches!(
            validate_schematic(&s),
            Err(SimError::InvalidParameter { .. })
        ));
    }
}
