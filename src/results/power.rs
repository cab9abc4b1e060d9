//! Absorbed power per component.

use crate::circuit::ComponentId;
use crate::components::{Bjt, Component, OpAmp};
use crate::signal::PowerSignal;

use super::{memoized, Direction, ResultsDatabase};

/// Power view of a [`ResultsDatabase`]. Positive power is absorbed by the
/// part; sources delivering energy report negative power.
#[derive(Debug, Clone, Copy)]
pub struct PowerDb<'a> {
    db: &'a ResultsDatabase,
}

impl<'a> PowerDb<'a> {
    pub(super) fn new(db: &'a ResultsDatabase) -> Self {
        Self { db }
    }

    pub fn component(&self, component: ComponentId) -> Option<PowerSignal> {
        memoized(&self.db.powers, component, || self.absorbed(component))
    }

    fn absorbed(&self, component: ComponentId) -> Option<PowerSignal> {
        let solution = self.db.solution()?;
        let voltage = self.db.voltage();
        let current = self.db.current();
        match solution.schematic().component(component)? {
            Component::Ground(_) => None,
            Component::OpAmp(_) => {
                let v = voltage.component(component, Direction::Forward)?;
                let i = current.terminal(component, OpAmp::OUTPUT)?;
                Some(PowerSignal::from_phasors(&v, &i))
            }
            Component::Bjt(_) => {
                let topology = solution.topology();
                let e = topology.terminal_node(component, Bjt::EMITTER)?;
                let b = topology.terminal_node(component, Bjt::BASE)?;
                let v_be = voltage.between(e, b)?;
                let v_ce = voltage.component(component, Direction::Forward)?;
                let i_b = current.terminal(component, Bjt::BASE)?;
                let i_c = current.terminal(component, Bjt::COLLECTOR)?;
                Some(PowerSignal::from_phasors(&v_be, &i_b) + PowerSignal::from_phasors(&v_ce, &i_c))
            }
            _ => {
                let v = voltage.component(component, Direction::Forward)?;
                let i = current.component(component, Direction::Forward)?;
                Some(PowerSignal::from_phasors(&v, &i))
            }
        }
    }
}
