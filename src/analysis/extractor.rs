//! Per-frame pipeline: samples → spectrum → beat → [`AudioFeatures`].

use std::time::Instant;

use super::beat::BeatDetector;
use super::features::AudioFeatures;
use super::spectrum::SpectralAnalyzer;
use crate::audio::AudioSource;
use crate::error::AudioResult;
use crate::params::{BeatConfig, FFTConfig};

/// Spectral analyzer and beat detector driven together once per frame
pub struct FeatureExtractor {
    analyzer: SpectralAnalyzer,
    detector: BeatDetector,
    epoch: Instant,
}

impl FeatureExtractor {
    pub fn new(fft_config: FFTConfig, beat_config: BeatConfig) -> AudioResult<Self> {
        Ok(Self {
            analyzer: SpectralAnalyzer::new(fft_config)?,
            detector: BeatDetector::new(beat_config)?,
            epoch: Instant::now(),
        })
    }

    /// Samples the analyzer wants per frame
    pub fn window_size(&self) -> usize {
        self.analyzer.config().fft_size
    }

    pub fn analyzer(&self) -> &SpectralAnalyzer {
        &self.analyzer
    }

    pub fn detector_mut(&mut self) -> &mut BeatDetector {
        &mut self.detector
    }

    /// Pull a window from `source` and analyze it at the current time
    pub fn process_source(&mut self, source: &dyn AudioSource) -> AudioFeatures {
        let samples = source.get_samples_for_fft(self.window_size());
        self.process(&samples)
    }

    /// Analyze `samples` stamped with seconds since construction
    pub fn process(&mut self, samples: &[f32]) -> AudioFeatures {
        let now = self.epoch.elapsed().as_secs_f64();
        self.process_at(samples, now)
    }

    /// Analyze `samples` observed at `timestamp` seconds
    pub fn process_at(&mut self, samples: &[f32], timestamp: f64) -> AudioFeatures {
        let mut features = self.analyzer.analyze(samples);
        let beat = self.detector.detect_at(&features.spectrum, timestamp);

        features.is_beat = beat.is_beat;
        features.beat_strength = beat.strength;
        features.tempo_bpm = beat.tempo_bpm;
        features.timestamp = timestamp;
        features
    }

    /// Drop smoothed spectrum, peaks and flux history (call on source change)
    pub fn reset(&mut self) {
        self.analyzer.reset();
        self.detector.reset();
    }
}
