//! Schemsim - bias simulation of built-in demo schematics.
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=debug schemsim common-emitter --kind ac-dc
//! schemsim rc-lowpass --kind sweep --sweep-start 10 --sweep-stop 100000
//! ```

use clap::{Parser, ValueEnum};
use schemsim_core::{
    circuit::{NodeId, Schematic},
    components::{BjtParams, BjtType, Component, OpAmpParams, Waveform},
    error::Result,
    results::{Direction, Reading, Unit},
    signal::CharacteristicValues,
    solver::{SimulationKind, SweepConfig},
    Simulator, SimulatorConfig,
};

/// Demo schematics shipped with the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Demo {
    /// 10 V across two 1 kΩ resistors in series
    Divider,
    /// 1 V peak, 1 kHz across 1 kΩ
    AcResistor,
    /// Op-amp inverting amplifier with a gain of -10
    InvertingAmp,
    /// Base-biased NPN common-emitter stage
    CommonEmitter,
    /// First-order RC low-pass at 159 Hz
    RcLowpass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Kind {
    Dc,
    Ac,
    AcDc,
    Sweep,
}

impl From<Kind> for SimulationKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Dc => SimulationKind::Dc,
            Kind::Ac => SimulationKind::Ac,
            Kind::AcDc => SimulationKind::AcDc,
            Kind::Sweep => SimulationKind::FrequencySweep,
        }
    }
}

/// Schematic bias simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Demo schematic to simulate
    #[arg(value_enum)]
    demo: Demo,

    /// Simulation kind
    #[arg(short, long, value_enum, default_value_t = Kind::AcDc)]
    kind: Kind,

    /// Maximum device mode classification rounds
    #[arg(long, default_value_t = schemsim_core::solver::MAX_MODE_ITERATIONS)]
    max_mode_iterations: usize,

    /// Sweep start frequency in Hz
    #[arg(long, default_value_t = 10.0)]
    sweep_start: f64,

    /// Sweep stop frequency in Hz
    #[arg(long, default_value_t = 1e5)]
    sweep_stop: f64,

    /// Sweep points per decade
    #[arg(long, default_value_t = 10)]
    sweep_points: usize,
}

fn divider() -> Schematic {
    let mut s = Schematic::new();
    s.dc_voltage_source("V1", (0.0, 10.0), (0.0, 0.0), 10.0);
    s.resistor("R1", (0.0, 10.0), (10.0, 10.0), 1e3);
    s.resistor("R2", (10.0, 10.0), (10.0, 0.0), 1e3);
    s.wire((10.0, 0.0), (0.0, 0.0));
    s.ground("GND", (0.0, 0.0));
    s
}

fn ac_resistor() -> Schematic {
    let mut s = Schematic::new();
    s.ac_voltage_source("V1", (0.0, 10.0), (0.0, 0.0), 1.0, 1000.0, 0.0);
    s.resistor("R1", (0.0, 10.0), (0.0, 0.0), 1e3);
    s.ground("GND", (0.0, 0.0));
    s
}

fn inverting_amp() -> Schematic {
    let mut s = Schematic::new();
    s.voltage_source(
        "VIN",
        (0.0, 10.0),
        (0.0, 0.0),
        Waveform::Ac {
            amplitude: 0.1,
            frequency: 1000.0,
            phase: 0.0,
            offset: 0.2,
        },
    );
    s.resistor("RIN", (0.0, 10.0), (10.0, 10.0), 1e3);
    s.resistor("RF", (10.0, 10.0), (30.0, 10.0), 10e3);
    s.op_amp("U1", (30.0, 10.0), (10.0, 0.0), (10.0, 10.0), OpAmpParams::default());
    s.resistor("RL", (30.0, 10.0), (30.0, 0.0), 10e3);
    s.wire((10.0, 0.0), (0.0, 0.0));
    s.wire((30.0, 0.0), (10.0, 0.0));
    s.ground("GND", (0.0, 0.0));
    s
}

fn common_emitter() -> Schematic {
    let mut s = Schematic::new();
    s.dc_voltage_source("VCC", (40.0, 30.0), (40.0, 0.0), 12.0);
    s.resistor("RC", (40.0, 30.0), (20.0, 20.0), 2.2e3);
    s.resistor("RB", (40.0, 30.0), (10.0, 10.0), 470e3);
    s.bjt(
        "Q1",
        (20.0, 20.0),
        (10.0, 10.0),
        (20.0, 0.0),
        BjtType::Npn,
        BjtParams::default(),
    );
    s.ac_voltage_source("VIN", (0.0, 10.0), (0.0, 0.0), 0.01, 1000.0, 0.0);
    s.capacitor("CIN", (0.0, 10.0), (10.0, 10.0), 10e-6);
    s.wire((0.0, 0.0), (20.0, 0.0));
    s.wire((20.0, 0.0), (40.0, 0.0));
    s.ground("GND", (0.0, 0.0));
    s
}

fn rc_lowpass() -> Schematic {
    let mut s = Schematic::new();
    s.ac_voltage_source("V1", (0.0, 10.0), (0.0, 0.0), 1.0, 1000.0, 0.0);
    s.resistor("R1", (0.0, 10.0), (10.0, 10.0), 1e3);
    s.capacitor("C1", (10.0, 10.0), (10.0, 0.0), 1e-6);
    s.wire((10.0, 0.0), (0.0, 0.0));
    s.ground("GND", (0.0, 0.0));
    s
}

fn build(demo: Demo) -> Schematic {
    match demo {
        Demo::Divider => divider(),
        Demo::AcResistor => ac_resistor(),
        Demo::InvertingAmp => inverting_amp(),
        Demo::CommonEmitter => common_emitter(),
        Demo::RcLowpass => rc_lowpass(),
    }
}

fn print_sweep(sim: &Simulator) {
    let Some(solution) = sim.results().solution() else {
        return;
    };
    let voltages = sim.results().voltage();
    for n in 1..solution.topology().num_nodes {
        let Some(response) = voltages.sweep_node(NodeId(n)) else {
            continue;
        };
        println!("{}:", NodeId(n));
        for ((f, _), db) in response.points().iter().zip(response.magnitudes_db()) {
            println!("  {:>12.3} Hz  {:>8.2} dB", f, db);
        }
    }
}

fn print_results(sim: &Simulator, schematic: &Schematic) {
    let results = sim.results();
    let Some(solution) = results.solution() else {
        return;
    };

    println!("Nodes:");
    for n in 1..solution.topology().num_nodes {
        let reading = results.voltage().node(NodeId(n)).map(|v| Reading::new(&v, Unit::Volt));
        print_line(&NodeId(n).to_string(), reading);
    }

    println!("Components:");
    for component in &schematic.components {
        if matches!(component, Component::Ground(_)) {
            continue;
        }
        let id = component.id();
        if let Some(mode) = solution.mode(id) {
            println!("  {} mode {:?}", component.name(), mode);
        }
        let v = results
            .voltage()
            .component(id, Direction::Forward)
            .map(|v| Reading::new(&v, Unit::Volt));
        let i = results
            .current()
            .component(id, Direction::Forward)
            .map(|i| Reading::new(&i, Unit::Ampere));
        let p = results.power().component(id);
        print_line(&format!("V({})", component.name()), v);
        print_line(&format!("I({})", component.name()), i);
        print_line(
            &format!("P({})", component.name()),
            p.map(|p| Reading::new(&p, Unit::Watt)),
        );
        if let Some(p) = p {
            log::debug!("{} absorbs at most {:.3e} W", component.name(), p.maximum());
        }
    }
}

fn print_line(label: &str, reading: Option<Reading>) {
    match reading {
        Some(r) => println!("  {:<10} {}", label, r),
        None => println!("  {:<10} unavailable", label),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = SimulatorConfig::new()
        .with_max_mode_iterations(args.max_mode_iterations)
        .with_sweep(SweepConfig::decade(
            args.sweep_start,
            args.sweep_stop,
            args.sweep_points,
        ));
    let schematic = build(args.demo);

    let mut simulator = Simulator::with_config(config);
    let summary = simulator.bias(&schematic, args.kind.into())?;
    if !summary.converged {
        eprintln!(
            "warning: device modes did not settle after {} rounds",
            summary.mode_iterations
        );
    }

    match summary.kind {
        SimulationKind::FrequencySweep => print_sweep(&simulator),
        _ => print_results(&simulator, &schematic),
    }

    Ok(())
}
