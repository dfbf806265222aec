//! Spectral analysis and beat detection configuration.

use crate::error::{AudioError, AudioResult};

/// FFT analysis configuration with frequency band mappings
#[derive(Debug, Clone)]
pub struct FFTConfig {
    /// Audio sample rate (Hz)
    pub sample_rate_hz: u32,

    /// FFT window size (must be power of 2)
    /// 4096 > chunk size, so short windows get zero-padded for a smoother spectrum
    pub fft_size: usize,

    /// Number of logarithmically spaced output bands
    pub num_bands: usize,

    /// Lowest analysed frequency (Hz)
    pub freq_min_hz: f32,

    /// Highest analysed frequency (Hz)
    pub freq_max_hz: f32,

    /// Exponential smoothing factor (0-1, higher = slower/steadier)
    pub smoothing: f32,

    /// Peak-hold fall per frame (normalized units)
    pub peak_decay: f32,

    /// dB mapped to 0.0 after normalization
    pub db_min: f32,

    /// dB mapped to 1.0 after normalization
    pub db_max: f32,

    /// Multiplier applied to input samples before windowing
    pub input_gain: f32,

    /// Bass/mid boundary (Hz)
    pub bass_split_hz: f32,

    /// Mid/treble boundary (Hz)
    pub treble_split_hz: f32,
}

impl Default for FFTConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 44100,
            fft_size: 4096,
            num_bands: 64,
            freq_min_hz: 20.0,
            freq_max_hz: 20000.0,
            smoothing: 0.6,
            peak_decay: 0.03,
            db_min: -80.0,
            db_max: 0.0,
            input_gain: 3.0,
            bass_split_hz: 250.0,
            treble_split_hz: 4000.0,
        }
    }
}

impl FFTConfig {
    /// Number of bins in a real-input spectrum (DC through Nyquist)
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Width of one FFT bin (Hz)
    pub fn bin_width_hz(&self) -> f32 {
        self.sample_rate_hz as f32 / self.fft_size as f32
    }

    /// Convert frequency (Hz) to FFT bin index
    pub fn hz_to_bin(&self, hz: f32) -> usize {
        ((hz * self.fft_size as f32) / self.sample_rate_hz as f32) as usize
    }

    /// Logarithmically spaced band edges, `num_bands + 1` values from min to max
    pub fn band_edges_hz(&self) -> Vec<f32> {
        let lo = self.freq_min_hz.log10();
        let hi = self.freq_max_hz.log10();
        (0..=self.num_bands)
            .map(|i| {
                let t = i as f32 / self.num_bands as f32;
                10f32.powf(lo + (hi - lo) * t)
            })
            .collect()
    }

    /// Validate configuration (FFT size must be power of 2, etc.)
    pub fn validate(&self) -> AudioResult<()> {
        if !self.fft_size.is_power_of_two() {
            return Err(AudioError::InvalidConfig(format!(
                "FFT size must be power of 2, got {}",
                self.fft_size
            )));
        }
        if self.sample_rate_hz == 0 {
            return Err(AudioError::InvalidConfig("Sample rate must be > 0".to_string()));
        }
        if self.num_bands == 0 {
            return Err(AudioError::InvalidConfig("Band count must be > 0".to_string()));
        }
        if !(self.freq_min_hz > 0.0 && self.freq_min_hz < self.freq_max_hz) {
            return Err(AudioError::InvalidConfig(format!(
                "Frequency range must satisfy 0 < min < max, got {}..{}",
                self.freq_min_hz, self.freq_max_hz
            )));
        }
        if self.db_max <= self.db_min {
            return Err(AudioError::InvalidConfig(format!(
                "dB ceiling {} must exceed floor {}",
                self.db_max, self.db_min
            )));
        }
        if !(0.0..1.0).contains(&self.smoothing) {
            return Err(AudioError::InvalidConfig(format!(
                "Smoothing must be in [0, 1), got {}",
                self.smoothing
            )));
        }
        Ok(())
    }
}

/// Spectral-flux beat detector configuration
#[derive(Debug, Clone)]
pub struct BeatConfig {
    /// Flux history length (frames)
    /// 43 ≈ 1 second at 60fps
    pub history_length: usize,

    /// Flux must exceed `mean * threshold` to count as a beat (lower = more sensitive)
    pub threshold: f32,

    /// Debounce between beats (seconds)
    pub min_interval_s: f64,

    /// Beat timestamps kept for tempo estimation
    pub beat_history: usize,

    /// Shortest inter-beat interval trusted for tempo (seconds, exclusive)
    pub min_beat_interval_s: f64,

    /// Longest inter-beat interval trusted for tempo (seconds, exclusive)
    pub max_beat_interval_s: f64,

    /// Displayable tempo range (BPM), estimates are octave-folded into it
    pub tempo_min_bpm: f32,
    pub tempo_max_bpm: f32,
}

impl Default for BeatConfig {
    fn default() -> Self {
        Self {
            history_length: 43,
            threshold: 1.5,
            min_interval_s: 0.1,
            beat_history: 20,
            min_beat_interval_s: 0.2,
            max_beat_interval_s: 2.0,
            tempo_min_bpm: 60.0,
            tempo_max_bpm: 180.0,
        }
    }
}

impl BeatConfig {
    /// Validate configuration
    pub fn validate(&self) -> AudioResult<()> {
        if self.history_length < 2 {
            return Err(AudioError::InvalidConfig(
                "Beat history must hold at least 2 frames".to_string(),
            ));
        }
        // Folding needs at least an octave of room or it never terminates
        if self.tempo_max_bpm < self.tempo_min_bpm * 2.0 {
            return Err(AudioError::InvalidConfig(format!(
                "Tempo range {}..{} BPM must span an octave",
                self.tempo_min_bpm, self.tempo_max_bpm
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fft_config_hz_to_bin() {
        let config = FFTConfig::default();

        // At 44100 Hz sample rate and 4096 FFT size:
        // Bin resolution = 44100 / 4096 ≈ 10.77 Hz per bin
        assert_eq!(config.hz_to_bin(0.0), 0);
        assert_eq!(config.hz_to_bin(10.77), 1);
        assert_eq!(config.hz_to_bin(1000.0), 92);
    }

    #[test]
    fn test_band_edges_are_logarithmic() {
        let config = FFTConfig::default();
        let edges = config.band_edges_hz();

        assert_eq!(edges.len(), 65);
        assert!((edges[0] - 20.0).abs() < 0.01);
        assert!((edges[64] - 20000.0).abs() < 1.0);

        // Constant ratio between neighbours
        let ratio = edges[1] / edges[0];
        for pair in edges.windows(2) {
            assert!((pair[1] / pair[0] - ratio).abs() < 1e-3);
        }
    }

    #[test]
    fn test_validate() {
        assert!(FFTConfig::default().validate().is_ok());

        let config = FFTConfig {
            fft_size: 1000,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = FFTConfig {
            freq_min_hz: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        assert!(BeatConfig::default().validate().is_ok());
        let beat = BeatConfig {
            tempo_min_bpm: 100.0,
            tempo_max_bpm: 150.0,
            ..Default::default()
        };
        assert!(beat.validate().is_err());
    }
}
