//! Spectral-flux beat and tempo detection.
//!
//! Each frame's flux is the summed positive change across bands. A beat
//! fires when flux clears `mean(history) * threshold` and the debounce
//! interval has passed. Tempo comes from the spacing of recent beats.

use std::collections::VecDeque;
use std::time::Instant;

use crate::error::AudioResult;
use crate::params::BeatConfig;

/// Guards the strength ratio against a zero mean
const STRENGTH_EPSILON: f32 = 0.01;

/// Result of one detection step
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BeatEvent {
    pub is_beat: bool,
    /// 0-1
    pub strength: f32,
    /// Latest tempo estimate (0 until known)
    pub tempo_bpm: f32,
}

/// Onset detector over a sliding flux history.
///
/// Owned by the consumer thread. Call [`reset`](Self::reset) whenever the
/// upstream source changes.
pub struct BeatDetector {
    config: BeatConfig,
    threshold: f32,

    previous_spectrum: Option<Vec<f32>>,
    flux_history: VecDeque<f32>,
    last_beat_time: Option<f64>,
    beat_times: VecDeque<f64>,
    tempo_bpm: f32,

    /// Clock origin for [`detect`](Self::detect)
    epoch: Instant,
}

impl BeatDetector {
    pub fn new(config: BeatConfig) -> AudioResult<Self> {
        config.validate()?;
        Ok(Self {
            threshold: config.threshold,
            flux_history: VecDeque::with_capacity(config.history_length),
            beat_times: VecDeque::with_capacity(config.beat_history),
            previous_spectrum: None,
            last_beat_time: None,
            tempo_bpm: 0.0,
            epoch: Instant::now(),
            config,
        })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn tempo_bpm(&self) -> f32 {
        self.tempo_bpm
    }

    /// True once enough flux history exists to compare against its mean
    pub fn is_armed(&self) -> bool {
        self.flux_history.len() >= self.config.history_length / 2
    }

    /// Detect using wall-clock time since construction
    pub fn detect(&mut self, spectrum: &[f32]) -> BeatEvent {
        let now = self.epoch.elapsed().as_secs_f64();
        self.detect_at(spectrum, now)
    }

    /// Detect a beat in `spectrum` observed at `now` seconds
    pub fn detect_at(&mut self, spectrum: &[f32], now: f64) -> BeatEvent {
        let mut event = BeatEvent {
            tempo_bpm: self.tempo_bpm,
            ..Default::default()
        };

        let Some(previous) = self.previous_spectrum.as_mut() else {
            self.previous_spectrum = Some(spectrum.to_vec());
            return event;
        };

        let flux: f32 = spectrum
            .iter()
            .zip(previous.iter())
            .map(|(cur, prev)| (cur - prev).max(0.0))
            .sum();

        // Band count only changes if the analyzer was rebuilt
        if previous.len() == spectrum.len() {
            previous.copy_from_slice(spectrum);
        } else {
            *previous = spectrum.to_vec();
        }

        if self.flux_history.len() == self.config.history_length {
            self.flux_history.pop_front();
        }
        self.flux_history.push_back(flux);

        if !self.is_armed() {
            return event;
        }

        let mean = self.flux_history.iter().sum::<f32>() / self.flux_history.len() as f32;
        let debounced = self
            .last_beat_time
            .map_or(true, |last| now - last >= self.config.min_interval_s);

        if flux > mean * self.threshold && debounced {
            event.is_beat = true;
            event.strength = ((flux - mean) / (mean + STRENGTH_EPSILON)).clamp(0.0, 1.0);
            self.last_beat_time = Some(now);

            if self.beat_times.len() == self.config.beat_history {
                self.beat_times.pop_front();
            }
            self.beat_times.push_back(now);
            self.estimate_tempo();
            event.tempo_bpm = self.tempo_bpm;
        }

        event
    }

    /// Average plausible inter-beat intervals, octave-folded into the display range
    fn estimate_tempo(&mut self) {
        let (lo, hi) = (
            self.config.min_beat_interval_s,
            self.config.max_beat_interval_s,
        );
        let valid: Vec<f64> = self
            .beat_times
            .iter()
            .zip(self.beat_times.iter().skip(1))
            .map(|(a, b)| b - a)
            .filter(|&interval| lo < interval && interval < hi)
            .collect();

        if valid.len() < 2 {
            return;
        }

        let avg_interval = valid.iter().sum::<f64>() / valid.len() as f64;
        if avg_interval <= 0.0 {
            return;
        }

        let mut bpm = (60.0 / avg_interval) as f32;
        while bpm < self.config.tempo_min_bpm {
            bpm *= 2.0;
        }
        while bpm > self.config.tempo_max_bpm {
            bpm /= 2.0;
        }
        self.tempo_bpm = bpm;
    }

    /// Clear all history and tempo state
    pub fn reset(&mut self) {
        self.previous_spectrum = None;
        self.flux_history.clear();
        self.beat_times.clear();
        self.last_beat_time = None;
        self.tempo_bpm = 0.0;
    }

    /// Map sensitivity 0 (most sensitive) ..1 (least) onto threshold 1.0..3.0
    pub fn set_sensitivity(&mut self, sensitivity: f32) {
        self.threshold = 1.0 + sensitivity.clamp(0.0, 1.0) * 2.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BANDS: usize = 64;
    const FRAME: f64 = 1.0 / 60.0;

    /// Slowly rising spectrum: constant low flux every frame
    fn baseline(frame: usize) -> Vec<f32> {
        vec![0.001 * frame as f32; BANDS]
    }

    fn spike(frame: usize) -> Vec<f32> {
        baseline(frame).iter().map(|v| v + 0.5).collect()
    }

    fn detector() -> BeatDetector {
        BeatDetector::new(BeatConfig::default()).unwrap()
    }

    #[test]
    fn test_warm_up_never_fires() {
        let mut detector = detector();
        for frame in 0..21 {
            let spectrum = if frame % 5 == 4 { spike(frame) } else { baseline(frame) };
            let event = detector.detect_at(&spectrum, frame as f64 * FRAME);
            assert!(!event.is_beat);
        }
        assert!(!detector.is_armed());
    }

    #[test]
    fn test_single_spike_single_beat() {
        let mut detector = detector();
        let mut beats = 0;

        for frame in 0..60 {
            let spectrum = if frame == 50 { spike(frame) } else { baseline(frame) };
            let event = detector.detect_at(&spectrum, frame as f64 * FRAME);
            if event.is_beat {
                beats += 1;
                assert_eq!(frame, 50);
                assert!(event.strength > 0.0 && event.strength <= 1.0);
            }
        }
        assert_eq!(beats, 1);
    }

    #[test]
    fn test_debounce_suppresses_close_spikes() {
        let mut detector = detector();
        let mut beat_frames = Vec::new();

        // Spikes at frames 50, 52, 54 (all within 0.1s of 50), then 60
        for frame in 0..70 {
            let spectrum = if [50, 52, 54, 60].contains(&frame) {
                spike(frame)
            } else {
                baseline(frame)
            };
            if detector.detect_at(&spectrum, frame as f64 * FRAME).is_beat {
                beat_frames.push(frame);
            }
        }
        assert_eq!(beat_frames, vec![50, 60]);
    }

    #[test]
    fn test_tempo_from_half_second_beats() {
        let mut detector = detector();
        let spikes = [60, 90, 120, 150];

        let mut tempo = 0.0;
        for frame in 0..160 {
            let spectrum = if spikes.contains(&frame) { spike(frame) } else { baseline(frame) };
            let event = detector.detect_at(&spectrum, frame as f64 / 60.0);
            if spikes.contains(&frame) {
                assert!(event.is_beat, "expected beat at frame {}", frame);
            }
            tempo = event.tempo_bpm;
        }
        assert!((tempo - 120.0).abs() < 0.5, "tempo {}", tempo);
    }

    #[test]
    fn test_tempo_octave_folding() {
        let mut detector = detector();
        // 1.5s apart = 40 BPM, folds up to 80
        for (i, t) in [0.0, 1.5, 3.0].iter().enumerate() {
            detector.beat_times.push_back(*t);
            if i > 0 {
                detector.estimate_tempo();
            }
        }
        assert!((detector.tempo_bpm() - 80.0).abs() < 0.01);

        // 0.25s apart = 240 BPM, folds down to 120
        detector.reset();
        for t in [0.0, 0.25, 0.5, 0.75] {
            detector.beat_times.push_back(t);
        }
        detector.estimate_tempo();
        assert!((detector.tempo_bpm() - 120.0).abs() < 0.01);
    }

    #[test]
    fn test_implausible_intervals_ignored() {
        let mut detector = detector();
        for t in [0.0, 0.1, 0.15, 5.0] {
            detector.beat_times.push_back(t);
        }
        detector.estimate_tempo();
        assert_eq!(detector.tempo_bpm(), 0.0);
    }

    #[test]
    fn test_reset_and_sensitivity() {
        let mut detector = detector();
        for frame in 0..60 {
            detector.detect_at(&baseline(frame), frame as f64 * FRAME);
        }
        assert!(detector.is_armed());

        detector.reset();
        assert!(!detector.is_armed());
        assert_eq!(detector.tempo_bpm(), 0.0);

        detector.set_sensitivity(0.0);
        assert_eq!(detector.threshold(), 1.0);
        detector.set_sensitivity(0.25);
        assert_eq!(detector.threshold(), 1.5);
        detector.set_sensitivity(7.0);
        assert_eq!(detector.threshold(), 3.0);
    }
}
