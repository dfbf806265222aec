//! Windowed FFT analysis with logarithmic frequency banding.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

use super::features::AudioFeatures;
use crate::error::AudioResult;
use crate::params::FFTConfig;

/// Added to magnitudes before taking the log
const MAGNITUDE_EPSILON: f32 = 1e-10;

/// Spectral analyzer holding the smoothed spectrum and peak-hold state.
///
/// Owned by the consumer thread; call [`reset`](Self::reset) whenever the
/// upstream source changes.
pub struct SpectralAnalyzer {
    config: FFTConfig,

    // FFT resources (pre-allocated)
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    input: Vec<f32>,
    fft_buffer: Vec<Complex<f32>>,
    fft_scratch: Vec<Complex<f32>>,
    magnitudes: Vec<f32>,
    normalized: Vec<f32>,

    /// Center frequency of each bin, DC through Nyquist
    freqs: Vec<f32>,

    /// Bin range of each band: `band_bins[i]..band_bins[i + 1]`
    band_bins: Vec<usize>,

    /// Band index boundaries: bass = `..bass_end`, mid = `bass_end..mid_end`
    bass_end: usize,
    mid_end: usize,

    // Running state
    bands: Vec<f32>,
    smoothed: Vec<f32>,
    peaks: Vec<f32>,
}

impl SpectralAnalyzer {
    pub fn new(config: FFTConfig) -> AudioResult<Self> {
        config.validate()?;

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(config.fft_size);
        let fft_scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        let window = (0..config.fft_size)
            .map(|i| hann_window(i, config.fft_size))
            .collect();

        let num_bins = config.num_bins();
        let bin_width = config.bin_width_hz();
        let freqs: Vec<f32> = (0..num_bins).map(|k| k as f32 * bin_width).collect();

        let edges = config.band_edges_hz();
        let band_bins = edges
            .iter()
            .map(|&edge| freqs.partition_point(|&f| f < edge).min(num_bins - 1))
            .collect();

        let bass_end = edges.partition_point(|&e| e < config.bass_split_hz);
        let mid_end = edges.partition_point(|&e| e < config.treble_split_hz);

        log::debug!(
            "Spectral analyzer: {} bands, {:.1}Hz bins, bass bands 0..{}, mid {}..{}",
            config.num_bands,
            bin_width,
            bass_end,
            bass_end,
            mid_end
        );

        Ok(Self {
            fft,
            window,
            input: vec![0.0; config.fft_size],
            fft_buffer: vec![Complex::new(0.0, 0.0); config.fft_size],
            fft_scratch,
            magnitudes: vec![0.0; num_bins],
            normalized: vec![0.0; num_bins],
            freqs,
            band_bins,
            bass_end,
            mid_end,
            bands: vec![0.0; config.num_bands],
            smoothed: vec![0.0; config.num_bands],
            peaks: vec![0.0; config.num_bands],
            config,
        })
    }

    pub fn config(&self) -> &FFTConfig {
        &self.config
    }

    /// Current smoothed spectrum
    pub fn smoothed_spectrum(&self) -> &[f32] {
        &self.smoothed
    }

    /// Current peak-hold values
    pub fn spectrum_peaks(&self) -> &[f32] {
        &self.peaks
    }

    /// Band index whose edge range contains `hz`, if inside the analysed range
    pub fn band_for_frequency(&self, hz: f32) -> Option<usize> {
        let edges = self.config.band_edges_hz();
        if hz < edges[0] || hz >= edges[edges.len() - 1] {
            return None;
        }
        Some(edges.partition_point(|&e| e <= hz) - 1)
    }

    /// Analyze one window of samples.
    ///
    /// Shorter input is zero-padded on the right, longer input keeps its most
    /// recent `fft_size` samples. Beat fields and timestamp are left at zero.
    pub fn analyze(&mut self, samples: &[f32]) -> AudioFeatures {
        let n = self.config.fft_size;
        let gain = self.config.input_gain;

        // Fit to FFT size, then apply input gain
        let recent = &samples[samples.len().saturating_sub(n)..];
        self.input[..recent.len()].copy_from_slice(recent);
        self.input[recent.len()..].fill(0.0);
        for s in self.input.iter_mut() {
            *s *= gain;
        }

        // Apply Hann window
        for (i, slot) in self.fft_buffer.iter_mut().enumerate() {
            *slot = Complex::new(self.input[i] * self.window[i], 0.0);
        }

        // Perform FFT, keeping the non-negative frequencies
        self.fft
            .process_with_scratch(&mut self.fft_buffer, &mut self.fft_scratch);
        for (mag, c) in self.magnitudes.iter_mut().zip(self.fft_buffer.iter()) {
            *mag = c.norm();
        }

        // Magnitude → dB → 0-1
        let db_range = self.config.db_max - self.config.db_min;
        for (norm, &mag) in self.normalized.iter_mut().zip(self.magnitudes.iter()) {
            let db = 20.0 * (mag + MAGNITUDE_EPSILON).log10();
            *norm = ((db - self.config.db_min) / db_range).clamp(0.0, 1.0);
        }

        self.group_into_bands();

        // Smooth against running state, then update decaying peaks
        let alpha = self.config.smoothing;
        for ((smoothed, peak), &band) in self
            .smoothed
            .iter_mut()
            .zip(self.peaks.iter_mut())
            .zip(self.bands.iter())
        {
            *smoothed = alpha * *smoothed + (1.0 - alpha) * band;
            *peak = (*peak - self.config.peak_decay).max(*smoothed);
        }

        let mut features = AudioFeatures::silent(self.config.num_bands);
        let num_bands = self.config.num_bands;

        if self.bass_end > 0 {
            features.bass = mean(&self.smoothed[..self.bass_end.min(num_bands)]);
        }
        if self.mid_end > self.bass_end {
            features.mid = mean(&self.smoothed[self.bass_end..self.mid_end.min(num_bands)]);
        }
        if num_bands > self.mid_end {
            features.treble = mean(&self.smoothed[self.mid_end..]);
        }

        let sum_sq: f32 = self.input.iter().map(|s| s * s).sum();
        features.rms = (sum_sq / n as f32).sqrt();
        features.peak = self.input.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));

        features.spectral_centroid = self.spectral_centroid();
        features.spectrum.copy_from_slice(&self.smoothed);
        features.spectrum_peaks.copy_from_slice(&self.peaks);
        features
    }

    /// Zero the smoothed spectrum and peak-hold state
    pub fn reset(&mut self) {
        self.smoothed.fill(0.0);
        self.peaks.fill(0.0);
    }

    /// Mean normalized dB of the bins inside each band's edge range.
    /// A band narrower than one bin takes the single bin at its lower edge.
    fn group_into_bands(&mut self) {
        for (i, band) in self.bands.iter_mut().enumerate() {
            let start = self.band_bins[i];
            let end = self.band_bins[i + 1];
            *band = if start < end {
                mean(&self.normalized[start..end])
            } else if start < self.normalized.len() {
                self.normalized[start]
            } else {
                0.0
            };
        }
    }

    /// Magnitude-weighted mean frequency, normalized into 0-1 over the analysed range
    fn spectral_centroid(&self) -> f32 {
        let total: f32 = self.magnitudes.iter().sum();
        if total <= 0.0 {
            return 0.0;
        }
        let weighted: f32 = self
            .freqs
            .iter()
            .zip(self.magnitudes.iter())
            .map(|(f, m)| f * m)
            .sum();
        let centroid = weighted / total;
        ((centroid - self.config.freq_min_hz) / (self.config.freq_max_hz - self.config.freq_min_hz))
            .clamp(0.0, 1.0)
    }
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

/// Hann window function for FFT analysis
pub fn hann_window(index: usize, size: usize) -> f32 {
    if size < 2 {
        return 1.0;
    }
    0.5 * (1.0 - ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos())
}
