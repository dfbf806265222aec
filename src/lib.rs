//! Wavelens library - real-time audio capture, spectral analysis, beat
//! tracking and a polyphonic keyboard synth

pub mod analysis;
pub mod audio;
pub mod cli;
pub mod error;
pub mod params;
pub mod synth;

pub use analysis::{AudioFeatures, BeatDetector, FeatureExtractor, SpectralAnalyzer};
pub use audio::{AudioManager, AudioSource, RingBuffer};
pub use error::{AudioError, AudioResult};
pub use synth::SynthesizerSource;
