//! Named probes that outlive individual solves.

use crate::circuit::{ComponentId, TerminalRef};

use super::Direction;

/// Stable handle of a registered measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeasurementId(pub usize);

/// What a measurement looks at.
///
/// Voltage probes hold terminals rather than node ids, so they keep
/// pointing at the same place when nodes are renumbered by the next solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Probe {
    /// `V(positive) − V(reference)`
    Voltage {
        positive: TerminalRef,
        reference: TerminalRef,
    },
    Current {
        component: ComponentId,
        direction: Direction,
    },
    /// Power absorbed by a component
    Power { component: ComponentId },
}

impl Probe {
    pub fn voltage(positive: TerminalRef, reference: TerminalRef) -> Self {
        Probe::Voltage {
            positive,
            reference,
        }
    }

    /// Forward current through a component.
    pub fn current(component: ComponentId) -> Self {
        Probe::Current {
            component,
            direction: Direction::Forward,
        }
    }

    pub fn power(component: ComponentId) -> Self {
        Probe::Power { component }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub id: MeasurementId,
    pub name: String,
    pub probe: Probe,
}

/// Registry of measurements, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Measurements {
    entries: Vec<Measurement>,
    next_id: usize,
}

impl Measurements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a probe. Ids are never reused.
    pub fn add(&mut self, name: impl Into<String>, probe: Probe) -> MeasurementId {
        let id = MeasurementId(self.next_id);
        self.next_id += 1;
        self.entries.push(Measurement {
            id,
            name: name.into(),
            probe,
        });
        id
    }

    pub fn remove(&mut self, id: MeasurementId) -> Option<Measurement> {
        let index = self.entries.iter().position(|m| m.id == id)?;
        Some(self.entries.remove(index))
    }

    pub fn get(&self, id: MeasurementId) -> Option<&Measurement> {
        self.entries.iter().find(|m| m.id == id)
    }

    /// Returns false if `id` is not registered.
    pub fn rename(&mut self, id: MeasurementId, name: impl Into<String>) -> bool {
        match self.entries.iter_mut().find(|m| m.id == id) {
            Some(m) => {
                m.name = name.into();
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Measurement> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
