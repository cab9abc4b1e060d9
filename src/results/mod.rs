//! Query layer over the latest bias solution.
//!
//! Derived quantities are memoized per key and the memo tables are thrown
//! away whenever a new solution is published. Queries never fail: anything
//! that cannot be answered is `None`.

mod current;
mod measurement;
mod power;
mod reading;
mod voltage;

pub use current::CurrentDb;
pub use measurement::{Measurement, MeasurementId, Measurements, Probe};
pub use power::PowerDb;
pub use reading::{Quantity, Reading, Unit};
pub use voltage::VoltageDb;

use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hash;

use crate::circuit::{ComponentId, NodeId};
use crate::signal::{PhasorSignal, PowerSignal};
use crate::solver::BiasSolution;

/// Orientation of a component quantity relative to its terminal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    /// Terminal 0 → terminal 1 (voltage: V(t0) − V(t1))
    #[default]
    Forward,
    /// Sign-flipped
    Reverse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum VoltageKey {
    Between(NodeId, NodeId),
    Component(ComponentId, Direction),
}

/// Latest results plus memoized derived signals.
#[derive(Debug, Default)]
pub struct ResultsDatabase {
    solution: Option<BiasSolution>,
    voltages: RefCell<HashMap<VoltageKey, PhasorSignal>>,
    currents: RefCell<HashMap<(ComponentId, Direction), PhasorSignal>>,
    powers: RefCell<HashMap<ComponentId, PowerSignal>>,
}

impl ResultsDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the solution and invalidate every memoized value.
    pub fn update(&mut self, solution: BiasSolution) {
        self.invalidate();
        self.solution = Some(solution);
    }

    /// Drop the solution; every query becomes unavailable.
    pub fn clear(&mut self) {
        self.invalidate();
        self.solution = None;
    }

    fn invalidate(&mut self) {
        self.voltages.get_mut().clear();
        self.currents.get_mut().clear();
        self.powers.get_mut().clear();
    }

    pub fn is_available(&self) -> bool {
        self.solution.is_some()
    }

    pub fn solution(&self) -> Option<&BiasSolution> {
        self.solution.as_ref()
    }

    pub fn voltage(&self) -> VoltageDb<'_> {
        VoltageDb::new(self)
    }

    pub fn current(&self) -> CurrentDb<'_> {
        CurrentDb::new(self)
    }

    pub fn power(&self) -> PowerDb<'_> {
        PowerDb::new(self)
    }

    /// Evaluate a probe against the current solution.
    pub fn measure(&self, probe: &Probe) -> Option<Reading> {
        match *probe {
            Probe::Voltage {
                positive,
                reference,
            } => {
                let topology = self.solution()?.topology();
                let pos = topology.node_of(positive)?;
                let reference = topology.node_of(reference)?;
                let v = self.voltage().between(reference, pos)?;
                Some(Reading::new(&v, Unit::Volt))
            }
            Probe::Current {
                component,
                direction,
            } => {
                let i = self.current().component(component, direction)?;
                Some(Reading::new(&i, Unit::Ampere))
            }
            Probe::Power { component } => {
                let p = self.power().component(component)?;
                Some(Reading::new(&p, Unit::Watt))
            }
        }
    }
}

/// Look up `key`, computing and storing it on a miss. No borrow is held
/// while `compute` runs, so it may query other memo tables.
fn memoized<K, V>(
    cache: &RefCell<HashMap<K, V>>,
    key: K,
    compute: impl FnOnce() -> Option<V>,
) -> Option<V>
where
    K: Hash + Eq,
    V: Clone,
{
    if let Some(value) = cache.borrow().get(&key) {
        return Some(value.clone());
    }
    let value = compute()?;
    cache.borrow_mut().insert(key, value.clone());
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{Schematic, TerminalRef};
    use crate::signal::CharacteristicValues;
    use crate::solver::{bias, CancelToken, SimulationKind, SimulatorConfig};
    use approx::assert_relative_eq;

    fn solve(s: &Schematic) -> BiasSolution {
        bias(s, SimulationKind::AcDc, &SimulatorConfig::default(), &CancelToken::new()).unwrap()
    }

    fn divider(volts: f64) -> Schematic {
        let mut s = Schematic::new();
        s.dc_voltage_source("V1", (0.0, 1.0), (0.0, 0.0), volts);
        s.resistor("R1", (0.0, 1.0), (1.0, 1.0), 1e3);
        s.resistor("R2", (1.0, 1.0), (1.0, 0.0), 1e3);
        s.ground("GND", (0.0, 0.0));
        s.wire((1.0, 0.0), (0.0, 0.0));
        s
    }

    #[test]
    fn test_nothing_before_first_solve() {
        let db = ResultsDatabase::new();
        assert!(!db.is_available());
        assert!(db.voltage().node(NodeId(1)).is_none());
        assert!(db.current().component(ComponentId(0), Direction::Forward).is_none());
        assert!(db.power().component(ComponentId(0)).is_none());
        assert!(db.measure(&Probe::power(ComponentId(0))).is_none());
    }

    #[test]
    fn test_update_invalidates_memoized_values() {
        let mut db = ResultsDatabase::new();
        db.update(solve(&divider(10.0)));
        let r1 = ComponentId(1);
        let first = db.current().component(r1, Direction::Forward).unwrap();
        assert_relative_eq!(first.dc_value(), 5e-3, max_relative = 1e-9);

        db.update(solve(&divider(20.0)));
        let second = db.current().component(r1, Direction::Forward).unwrap();
        assert_relative_eq!(second.dc_value(), 10e-3, max_relative = 1e-9);

        db.clear();
        assert!(db.current().component(r1, Direction::Forward).is_none());
    }

    #[test]
    fn test_voltage_probe_between_terminals() {
        let mut db = ResultsDatabase::new();
        db.update(solve(&divider(10.0)));
        let probe = Probe::voltage(
            TerminalRef::new(ComponentId(1), 0),
            TerminalRef::new(ComponentId(2), 1),
        );
        let reading = db.measure(&probe).unwrap();
        assert_relative_eq!(reading.average.value, 10.0, max_relative = 1e-9);
        assert_eq!(reading.average.unit, Unit::Volt);

        let missing = Probe::voltage(
            TerminalRef::new(ComponentId(9), 0),
            TerminalRef::new(ComponentId(2), 1),
        );
        assert!(db.measure(&missing).is_none());
    }

    #[test]
    fn test_power_reading_has_no_rms() {
        let mut db = ResultsDatabase::new();
        db.update(solve(&divider(10.0)));
        let reading = db.measure(&Probe::power(ComponentId(2))).unwrap();
        assert_relative_eq!(reading.average.value, 0.025, max_relative = 1e-9);
        assert!(reading.rms.value.is_nan());
        assert_eq!(reading.rms.to_string(), "unavailable");
        let p = db.power().component(ComponentId(2)).unwrap();
        assert_relative_eq!(p.maximum(), 0.025, max_relative = 1e-9);
    }
}
