//! Parameter definitions with physical units and documented semantics.
//!
//! All tunable numbers live here with:
//! - Physical units (seconds, Hz, dB, etc.)
//! - Documented ranges and meanings
//! - A `validate()` check where a bad value would break the pipeline

mod analysis;
mod audio;
mod synth;

// Re-export all types
pub use analysis::{BeatConfig, FFTConfig};
pub use audio::{audio_constants, AudioConfig};
pub use synth::SynthConfig;
