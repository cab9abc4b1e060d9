//! Voltage sources, current sources and the ground symbol.

use num_complex::Complex64;

use crate::circuit::{ComponentId, Position};
use crate::error::{Result, SimError};
use crate::signal::{same_frequency, PhasorSignal, PhasorSignalBuilder};

/// Excitation of an independent source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Waveform {
    /// Constant value
    Dc { value: f64 },
    /// `offset + amplitude·cos(2πf·t + phase)`
    Ac {
        /// Peak amplitude
        amplitude: f64,
        /// Frequency in Hz (strictly positive)
        frequency: f64,
        /// Phase in radians
        phase: f64,
        /// DC offset
        offset: f64,
    },
}

impl Waveform {
    /// AC excitation without offset.
    pub fn ac(amplitude: f64, frequency: f64, phase: f64) -> Self {
        Waveform::Ac {
            amplitude,
            frequency,
            phase,
            offset: 0.0,
        }
    }

    /// The DC part of the excitation.
    pub fn dc_value(&self) -> f64 {
        match *self {
            Waveform::Dc { value } => value,
            Waveform::Ac { offset, .. } => offset,
        }
    }

    /// Excitation frequency, `None` for a pure DC source.
    pub fn frequency(&self) -> Option<f64> {
        match *self {
            Waveform::Dc { .. } => None,
            Waveform::Ac { frequency, .. } => Some(frequency),
        }
    }

    /// Phasor of the AC part regardless of frequency.
    pub fn ac_phasor(&self) -> Complex64 {
        match *self {
            Waveform::Dc { .. } => Complex64::new(0.0, 0.0),
            Waveform::Ac {
                amplitude, phase, ..
            } => Complex64::from_polar(amplitude, phase),
        }
    }

    /// Excitation seen by the system solved at `frequency` (0 = DC).
    pub fn value_at(&self, frequency: f64) -> Complex64 {
        if frequency == 0.0 {
            return Complex64::new(self.dc_value(), 0.0);
        }
        match self.frequency() {
            Some(f) if same_frequency(f, frequency) => self.ac_phasor(),
            _ => Complex64::new(0.0, 0.0),
        }
    }

    /// The whole excitation as a phasor-domain signal.
    pub fn to_signal(&self) -> PhasorSignal {
        let mut builder = PhasorSignalBuilder::new();
        builder.add_dc(self.dc_value());
        if let Some(f) = self.frequency() {
            builder.add_phasor(f, self.ac_phasor());
        }
        builder.build()
    }

    fn validate(&self, name: &str) -> Result<()> {
        match *self {
            Waveform::Dc { value } if !value.is_finite() => Err(SimError::invalid_parameter(
                name,
                "value",
                "must be finite",
            )),
            Waveform::Ac { frequency, .. } if !(frequency.is_finite() && frequency > 0.0) => {
                Err(SimError::invalid_parameter(
                    name,
                    "frequency",
                    format!("AC frequency must be positive, got {frequency}"),
                ))
            }
            Waveform::Ac {
                amplitude,
                phase,
                offset,
                ..
            } if !(amplitude.is_finite() && phase.is_finite() && offset.is_finite()) => Err(
                SimError::invalid_parameter(name, "amplitude", "must be finite"),
            ),
            _ => Ok(()),
        }
    }
}

/// An independent voltage source.
///
/// Voltage sources require an extra row/column in the MNA matrix for the
/// branch current. The source enforces: V(t0) - V(t1) = V_source.
#[derive(Debug, Clone)]
pub struct VoltageSource {
    pub id: ComponentId,
    pub name: String,
    pub terminals: [Position; 2], // [positive, negative]
    pub waveform: Waveform,
}

impl VoltageSource {
    /// Create a new voltage source.
    pub fn new(id: ComponentId, name: String, terminals: [Position; 2], waveform: Waveform) -> Self {
        Self {
            id,
            name,
            terminals,
            waveform,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.waveform.validate(&self.name)
    }
}

/// An independent current source.
///
/// Current flows through the source from terminal 0 to terminal 1 and is
/// added directly to the RHS vector of the MNA equations.
#[derive(Debug, Clone)]
pub struct CurrentSource {
    pub id: ComponentId,
    pub name: String,
    pub terminals: [Position; 2],
    pub waveform: Waveform,
}

impl CurrentSource {
    /// Create a new current source.
    pub fn new(id: ComponentId, name: String, terminals: [Position; 2], waveform: Waveform) -> Self {
        Self {
            id,
            name,
            terminals,
            waveform,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.waveform.validate(&self.name)
    }
}

/// Ground reference symbol. Its node becomes node 0.
#[derive(Debug, Clone)]
pub struct Ground {
    pub id: ComponentId,
    pub name: String,
    pub terminals: [Position; 1],
}

impl Ground {
    pub fn new(id: ComponentId, name: String, terminal: Position) -> Self {
        Self {
            id,
            name,
            terminals: [terminal],
        }
    }
}
