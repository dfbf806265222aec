//! Spectral analysis and beat detection.
//!
//! Runs on the frame-rate consumer thread and never shares a lock with
//! the audio callbacks: it only sees sample copies pulled from a source.

mod beat;
mod extractor;
mod features;
mod spectrum;

// Re-export public types
pub use beat::{BeatDetector, BeatEvent};
pub use extractor::FeatureExtractor;
pub use features::{AudioFeatures, DEFAULT_NUM_BANDS};
pub use spectrum::{hann_window, SpectralAnalyzer};
