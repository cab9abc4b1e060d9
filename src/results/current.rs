//! Component, terminal and branch currents.

use num_complex::Complex64;

use crate::circuit::{BranchId, ComponentId};
use crate::components::{Bjt, Component, OpAmp};
use crate::signal::{PhasorSignal, PhasorSignalBuilder, SweepSignal};
use crate::solver::BiasSolution;

use super::{memoized, Direction, ResultsDatabase};

/// Current view of a [`ResultsDatabase`].
///
/// A component current in [`Direction::Forward`] flows through the part from
/// terminal 0 to terminal 1. Op-amps report the current delivered out of
/// their output, transistors their collector current.
#[derive(Debug, Clone, Copy)]
pub struct CurrentDb<'a> {
    db: &'a ResultsDatabase,
}

impl<'a> CurrentDb<'a> {
    pub(super) fn new(db: &'a ResultsDatabase) -> Self {
        Self { db }
    }

    fn solution(&self) -> Option<&'a BiasSolution> {
        self.db.solution.as_ref()
    }

    /// Raw branch unknown. Source and op-amp branches carry the current
    /// delivered out of their positive/output terminal.
    pub fn branch(&self, branch: BranchId) -> Option<PhasorSignal> {
        self.solution()?.branch_current(branch).cloned()
    }

    /// The `offset`-th branch of a component.
    fn owned_branch(&self, component: ComponentId, offset: usize) -> Option<PhasorSignal> {
        let first = self.solution()?.topology().branch_of(component)?;
        self.branch(BranchId(first.0 + offset))
    }

    pub fn component(&self, component: ComponentId, direction: Direction) -> Option<PhasorSignal> {
        memoized(&self.db.currents, (component, direction), || {
            let forward = self.forward(component)?;
            Some(match direction {
                Direction::Forward => forward,
                Direction::Reverse => forward.negate(),
            })
        })
    }

    fn forward(&self, component: ComponentId) -> Option<PhasorSignal> {
        let solution = self.solution()?;
        match solution.schematic().component(component)? {
            part @ (Component::Resistor(_) | Component::Capacitor(_)) => {
                let v = self.db.voltage().component(component, Direction::Forward)?;
                Some(v.scale_by(|f| part.admittance(f).unwrap_or_default()))
            }
            Component::Inductor(_) | Component::OpAmp(_) => self.owned_branch(component, 0),
            Component::VoltageSource(_) => Some(self.owned_branch(component, 0)?.negate()),
            Component::CurrentSource(i) => Some(solution.source_signal(&i.waveform)),
            Component::Bjt(_) => self.owned_branch(component, 1),
            Component::Ground(_) => None,
        }
    }

    /// Current flowing into a component at one of its terminals.
    pub fn terminal(&self, component: ComponentId, index: usize) -> Option<PhasorSignal> {
        let part = self.solution()?.schematic().component(component)?;
        match part {
            Component::Ground(_) => None,
            Component::OpAmp(_) => {
                let delivered = self.owned_branch(component, 0)?;
                match index {
                    OpAmp::OUTPUT => Some(delivered.negate()),
                    // Ideal inputs draw nothing
                    OpAmp::NON_INVERTING | OpAmp::INVERTING => {
                        Some(delivered.scale_by(|_| Complex64::default()))
                    }
                    _ => None,
                }
            }
            Component::Bjt(_) => {
                let i_b = self.owned_branch(component, 0)?;
                let i_c = self.owned_branch(component, 1)?;
                match index {
                    Bjt::BASE => Some(i_b),
                    Bjt::COLLECTOR => Some(i_c),
                    Bjt::EMITTER => {
                        let mut sum = PhasorSignalBuilder::from(&i_b);
                        sum.add_signal(&i_c);
                        Some(sum.build().negate())
                    }
                    _ => None,
                }
            }
            _ => {
                let forward = self.component(component, Direction::Forward)?;
                match index {
                    0 => Some(forward),
                    1 => Some(forward.negate()),
                    _ => None,
                }
            }
        }
    }

    /// Swept raw branch unknown.
    pub fn sweep_branch(&self, branch: BranchId) -> Option<SweepSignal> {
        self.solution()?.sweep_branch(branch).cloned()
    }

    /// Swept component current, oriented as in [`component`](Self::component).
    pub fn sweep_component(&self, component: ComponentId, direction: Direction) -> Option<SweepSignal> {
        let solution = self.solution()?;
        let first = || solution.topology().branch_of(component);
        let forward = match solution.schematic().component(component)? {
            part @ (Component::Resistor(_) | Component::Capacitor(_)) => {
                let v = self.db.voltage().sweep_component(component, Direction::Forward)?;
                v.scale_by(|f| part.admittance(f).unwrap_or_default())
            }
            Component::Inductor(_) | Component::OpAmp(_) => self.sweep_branch(first()?)?,
            Component::VoltageSource(_) => self.sweep_branch(first()?)?.negate(),
            Component::CurrentSource(i) => solution.source_sweep(&i.waveform)?,
            Component::Bjt(_) => self.sweep_branch(BranchId(first()?.0 + 1))?,
            Component::Ground(_) => return None,
        };
        Some(match direction {
            Direction::Forward => forward,
            Direction::Reverse => forward.negate(),
        })
    }
}
