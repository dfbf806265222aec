//! Phase-continuous oscillators.

use std::f32::consts::TAU;
use std::fmt;

/// Oscillator waveform, in cycling order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    pub const ALL: [Waveform; 4] = [
        Waveform::Sine,
        Waveform::Square,
        Waveform::Sawtooth,
        Waveform::Triangle,
    ];

    /// The waveform after this one, wrapping around
    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|&w| w == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    pub fn name(self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Triangle => "triangle",
        }
    }

    /// Value at `cycle` (phase in cycles, any real number)
    pub fn sample(self, cycle: f32) -> f32 {
        let frac = cycle - cycle.floor();
        match self {
            Waveform::Sine => (TAU * frac).sin(),
            Waveform::Square => {
                // sign(sin): +1 first half-cycle, -1 second, 0 at the zero crossings
                if frac == 0.0 || frac == 0.5 {
                    0.0
                } else if frac < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * frac - 1.0,
            Waveform::Triangle => 2.0 * (2.0 * frac - 1.0).abs() - 1.0,
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fill `out` with `waveform` at `frequency` starting from `phase` (0-1 cycles).
///
/// Returns the phase after the block so the next block continues seamlessly.
pub fn generate(
    waveform: Waveform,
    frequency: f32,
    sample_rate: u32,
    phase: f32,
    out: &mut [f32],
) -> f32 {
    let step = frequency / sample_rate as f32;
    for (i, sample) in out.iter_mut().enumerate() {
        *sample = waveform.sample(phase + i as f32 * step);
    }
    let next = phase + out.len() as f32 * step;
    next - next.floor()
}
