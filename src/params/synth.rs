//! Synthesizer configuration.

use crate::error::{AudioError, AudioResult};
use crate::synth::Adsr;

/// Polyphonic synthesizer configuration
#[derive(Debug, Clone)]
pub struct SynthConfig {
    /// Output sample rate (Hz)
    pub sample_rate_hz: u32,

    /// Output block size (samples per callback)
    /// 512 ≈ 11.6ms @ 44.1kHz, small for responsive key presses
    pub chunk_size: usize,

    /// Maximum simultaneously sounding voices
    pub max_polyphony: usize,

    /// Gain applied to the device output
    pub master_volume: f32,

    /// Extra gain for the copy fed to the visualization buffer
    pub viz_gain: f32,

    /// Chunks kept in the visualization buffer
    pub viz_chunks: usize,

    /// Velocity given to every new note (0-1)
    pub velocity: f32,

    /// Amplitude envelope shared by all voices
    pub envelope: Adsr,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 44100,
            chunk_size: 512,
            max_polyphony: 8,
            master_volume: 0.3,
            viz_gain: 3.0,
            viz_chunks: 8,
            velocity: 0.8,
            envelope: Adsr::default(),
        }
    }
}

impl SynthConfig {
    /// Validate configuration
    pub fn validate(&self) -> AudioResult<()> {
        if self.sample_rate_hz == 0 {
            return Err(AudioError::InvalidConfig("Sample rate must be > 0".to_string()));
        }
        if self.chunk_size == 0 || self.viz_chunks == 0 {
            return Err(AudioError::InvalidConfig(
                "Synth chunk size and viz depth must be > 0".to_string(),
            ));
        }
        if self.max_polyphony == 0 {
            return Err(AudioError::InvalidConfig("Polyphony must be >= 1".to_string()));
        }
        self.envelope.validate()
    }
}
