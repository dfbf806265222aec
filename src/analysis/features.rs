//! Per-frame analysis result handed to visual consumers.

/// Default band count for [`AudioFeatures::default`]
pub const DEFAULT_NUM_BANDS: usize = 64;

/// Features extracted from one analysis frame.
///
/// Created fresh every cycle; `clone()` deep-copies the band arrays so a
/// consumer can keep a frame without aliasing analyzer state.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFeatures {
    /// Smoothed, log-banded magnitudes (0-1)
    pub spectrum: Vec<f32>,

    /// Decaying peak-hold per band (0-1)
    pub spectrum_peaks: Vec<f32>,

    /// Mean band value below the bass split
    pub bass: f32,
    /// Mean band value between the bass and treble splits
    pub mid: f32,
    /// Mean band value above the treble split
    pub treble: f32,

    /// RMS of the gain-boosted input window
    pub rms: f32,
    /// Absolute peak of the gain-boosted input window
    pub peak: f32,

    pub is_beat: bool,
    /// 0-1, how far the onset cleared the adaptive threshold
    pub beat_strength: f32,
    /// Estimated tempo, 0 until enough beats were seen
    pub tempo_bpm: f32,

    /// Magnitude-weighted mean frequency normalized over the analysed range ("brightness")
    pub spectral_centroid: f32,

    /// Seconds since the analysis pipeline was created
    pub timestamp: f64,
}

impl AudioFeatures {
    /// All-zero features with `num_bands` bands
    pub fn silent(num_bands: usize) -> Self {
        Self {
            spectrum: vec![0.0; num_bands],
            spectrum_peaks: vec![0.0; num_bands],
            bass: 0.0,
            mid: 0.0,
            treble: 0.0,
            rms: 0.0,
            peak: 0.0,
            is_beat: false,
            beat_strength: 0.0,
            tempo_bpm: 0.0,
            spectral_centroid: 0.0,
            timestamp: 0.0,
        }
    }

    pub fn num_bands(&self) -> usize {
        self.spectrum.len()
    }

    /// Overall energy (mean of bass, mid, treble)
    pub fn energy(&self) -> f32 {
        (self.bass + self.mid + self.treble) / 3.0
    }

    pub fn low_mid_high(&self) -> (f32, f32, f32) {
        (self.bass, self.mid, self.treble)
    }
}

impl Default for AudioFeatures {
    fn default() -> Self {
        Self::silent(DEFAULT_NUM_BANDS)
    }
}
