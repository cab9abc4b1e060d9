//! Schematic snapshot handed to the engine by the editor.

use crate::components::{
    Bjt, BjtParams, BjtType, Capacitor, Component, CurrentSource, Ground, Inductor, OpAmp,
    OpAmpParams, Resistor, VoltageSource, Waveform,
};
use crate::signal::same_frequency;

use super::types::{ComponentId, Position, Wire};

/// Components and wires of one schematic.
///
/// `ComponentId`s are indices into `components`; the builder methods keep
/// that invariant.
#[derive(Debug, Clone, Default)]
pub struct Schematic {
    pub components: Vec<Component>,
    pub wires: Vec<Wire>,
}

impl Schematic {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component built from its freshly assigned id.
    pub fn add(&mut self, build: impl FnOnce(ComponentId) -> Component) -> ComponentId {
        let id = ComponentId(self.components.len());
        self.components.push(build(id));
        id
    }

    pub fn resistor(
        &mut self,
        name: &str,
        a: impl Into<Position>,
        b: impl Into<Position>,
        resistance: f64,
    ) -> ComponentId {
        let terminals = [a.into(), b.into()];
        self.add(|id| Component::Resistor(Resistor::new(id, name.to_string(), terminals, resistance)))
    }

    pub fn capacitor(
        &mut self,
        name: &str,
        a: impl Into<Position>,
        b: impl Into<Position>,
        capacitance: f64,
    ) -> ComponentId {
        let terminals = [a.into(), b.into()];
        self.add(|id| {
            Component::Capacitor(Capacitor::new(id, name.to_string(), terminals, capacitance))
        })
    }

    pub fn inductor(
        &mut self,
        name: &str,
        a: impl Into<Position>,
        b: impl Into<Position>,
        inductance: f64,
    ) -> ComponentId {
        let terminals = [a.into(), b.into()];
        self.add(|id| Component::Inductor(Inductor::new(id, name.to_string(), terminals, inductance)))
    }

    /// Voltage source with terminal `pos` held `waveform` above `neg`.
    pub fn voltage_source(
        &mut self,
        name: &str,
        pos: impl Into<Position>,
        neg: impl Into<Position>,
        waveform: Waveform,
    ) -> ComponentId {
        let terminals = [pos.into(), neg.into()];
        self.add(|id| {
            Component::VoltageSource(VoltageSource::new(id, name.to_string(), terminals, waveform))
        })
    }

    pub fn dc_voltage_source(
        &mut self,
        name: &str,
        pos: impl Into<Position>,
        neg: impl Into<Position>,
        value: f64,
    ) -> ComponentId {
        self.voltage_source(name, pos, neg, Waveform::Dc { value })
    }

    pub fn ac_voltage_source(
        &mut self,
        name: &str,
        pos: impl Into<Position>,
        neg: impl Into<Position>,
        amplitude: f64,
        frequency: f64,
        phase: f64,
    ) -> ComponentId {
        self.voltage_source(name, pos, neg, Waveform::ac(amplitude, frequency, phase))
    }

    /// Current source pushing `waveform` through itself from `from` to `to`.
    pub fn current_source(
        &mut self,
        name: &str,
        from: impl Into<Position>,
        to: impl Into<Position>,
        waveform: Waveform,
    ) -> ComponentId {
        let terminals = [from.into(), to.into()];
        self.add(|id| {
            Component::CurrentSource(CurrentSource::new(id, name.to_string(), terminals, waveform))
        })
    }

    pub fn op_amp(
        &mut self,
        name: &str,
        output: impl Into<Position>,
        non_inverting: impl Into<Position>,
        inverting: impl Into<Position>,
        params: OpAmpParams,
    ) -> ComponentId {
        let terminals = [output.into(), non_inverting.into(), inverting.into()];
        self.add(|id| Component::OpAmp(OpAmp::new(id, name.to_string(), terminals, params)))
    }

    pub fn bjt(
        &mut self,
        name: &str,
        collector: impl Into<Position>,
        base: impl Into<Position>,
        emitter: impl Into<Position>,
        bjt_type: BjtType,
        params: BjtParams,
    ) -> ComponentId {
        let terminals = [collector.into(), base.into(), emitter.into()];
        self.add(|id| Component::Bjt(Bjt::new(id, name.to_string(), terminals, bjt_type, params)))
    }

    pub fn ground(&mut self, name: &str, at: impl Into<Position>) -> ComponentId {
        let terminal = at.into();
        self.add(|id| Component::Ground(Ground::new(id, name.to_string(), terminal)))
    }

    pub fn wire(&mut self, start: impl Into<Position>, end: impl Into<Position>) {
        self.wires.push(Wire::new(start, end));
    }

    /// Look up a component by id.
    pub fn component(&self, id: ComponentId) -> Option<&Component> {
        self.components.get(id.0).filter(|c| c.id() == id)
    }

    /// Distinct AC excitation frequencies, ascending.
    pub fn excitation_frequencies(&self) -> Vec<f64> {
        let mut frequencies: Vec<f64> = self
            .components
            .iter()
            .filter_map(|c| c.waveform().and_then(Waveform::frequency))
            .collect();
        frequencies.sort_by(f64::total_cmp);
        frequencies.dedup_by(|a, b| same_frequency(*a, *b));
        frequencies
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_assigns_sequential_ids() {
        let mut s = Schematic::new();
        let r = s.resistor("R1", (0.0, 0.0), (1.0, 0.0), 1e3);
        let g = s.ground("GND", (0.0, 0.0));
        assert_eq!(r, ComponentId(0));
        assert_eq!(g, ComponentId(1));
        assert_eq!(s.component(g).map(|c| c.name()), Some("GND"));
        assert!(s.component(ComponentId(7)).is_none());
    }

    #[test]
    fn test_excitation_frequencies_are_distinct() {
        let mut s = Schematic::new();
        s.ac_voltage_source("V1", (0.0, 1.0), (0.0, 0.0), 1.0, 1000.0, 0.0);
        s.ac_voltage_source("V2", (1.0, 1.0), (1.0, 0.0), 2.0, 50.0, 0.0);
        s.ac_voltage_source("V3", (2.0, 1.0), (2.0, 0.0), 0.5, 1000.0, 1.0);
        s.dc_voltage_source("V4", (3.0, 1.0), (3.0, 0.0), 9.0);
        assert_eq!(s.excitation_frequencies(), vec![50.0, 1000.0]);
    }
}
