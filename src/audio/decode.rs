//! File decode service: path in, mono f32 samples at the target rate out.

use std::path::Path;

use crate::error::{AudioError, AudioResult};

/// Decoded mono audio
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decode a WAV file to mono and resample it to `target_rate`
pub fn decode(path: &Path, target_rate: u32) -> AudioResult<DecodedAudio> {
    if !path.exists() {
        return Err(AudioError::FileNotFound(path.to_path_buf()));
    }

    let decode_err = |reason: String| AudioError::DecodeError {
        path: path.to_path_buf(),
        reason,
    };

    let reader = hound::WavReader::open(path).map_err(|e| decode_err(e.to_string()))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| decode_err(e.to_string()))?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()
                .map_err(|e| decode_err(e.to_string()))?
        }
    };

    // Channel average down to mono
    let mono: Vec<f32> = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();

    let samples = if spec.sample_rate == target_rate {
        mono
    } else {
        log::debug!("Resampling {}Hz -> {}Hz", spec.sample_rate, target_rate);
        resample_linear(&mono, spec.sample_rate as f32, target_rate as f32)
    };

    Ok(DecodedAudio {
        samples,
        sample_rate: target_rate,
    })
}

/// Linear-interpolation resampler
pub fn resample_linear(samples: &[f32], from_sr: f32, to_sr: f32) -> Vec<f32> {
    let ratio = from_sr as f64 / to_sr as f64;
    let output_len = (samples.len() as f64 * to_sr as f64 / from_sr as f64) as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let (idx, frac) = source_position(i, ratio);

        let sample = if idx + 1 < samples.len() {
            samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
        } else if idx < samples.len() {
            samples[idx]
        } else {
            0.0
        };
        output.push(sample);
    }

    output
}

/// Input index and interpolation weight for output sample `i`.
///
/// Kept in f64: f32 loses integer steps past 2^24 outputs (~6 min at 44.1kHz).
fn source_position(i: usize, ratio: f64) -> (usize, f32) {
    let pos = i as f64 * ratio;
    let idx = pos as usize;
    (idx, (pos - idx as f64) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, channels: u16, sample_rate: u32, frames: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in frames {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_missing_file() {
        let err = decode(Path::new("/definitely/not/here.wav"), 44100).unwrap_err();
        assert!(matches!(err, AudioError::FileNotFound(_)));
    }

    #[test]
    fn test_garbage_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.wav");
        std::fs::write(&path, b"not a wav file").unwrap();

        let err = decode(&path, 44100).unwrap_err();
        assert!(matches!(err, AudioError::DecodeError { .. }));
        assert!(err.is_source_unavailable());
    }

    #[test]
    fn test_stereo_is_averaged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        // Two frames: (half, 0) and (-half, -half)
        write_wav(&path, 2, 8000, &[16384, 0, -16384, -16384]);

        let audio = decode(&path, 8000).unwrap();
        assert_eq!(audio.samples.len(), 2);
        assert!((audio.samples[0] - 0.25).abs() < 1e-4);
        assert!((audio.samples[1] + 0.5).abs() < 1e-4);
        assert_eq!(audio.sample_rate, 8000);
    }

    #[test]
    fn test_decode_resamples_to_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        write_wav(&path, 1, 22050, &vec![1000; 22050]);

        let audio = decode(&path, 44100).unwrap();
        assert_eq!(audio.sample_rate, 44100);
        assert_eq!(audio.samples.len(), 44100);
        assert!((audio.duration_secs() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_resample_linear_interpolates() {
        let out = resample_linear(&[0.0, 1.0], 1.0, 2.0);
        assert_eq!(out.len(), 4);
        assert!((out[1] - 0.5).abs() < 1e-6);
        assert_eq!(out[3], 1.0);
    }

    #[test]
    fn test_source_position_steps_past_f32_range() {
        // 2:1 upsampling, ~12.7 min into a 44.1kHz output
        let i = (1usize << 25) + 1;
        let (idx, frac) = source_position(i, 0.5);
        assert_eq!(idx, 1 << 24);
        assert!((frac - 0.5).abs() < 1e-6);

        let (next, next_frac) = source_position(i + 1, 0.5);
        assert_eq!(next, (1 << 24) + 1);
        assert_eq!(next_frac, 0.0);
    }

    #[test]
    fn test_resampled_ramp_has_no_repeats() {
        let ramp: Vec<f32> = (0..480_000).map(|i| i as f32 / 480_000.0).collect();
        let out = resample_linear(&ramp, 48000.0, 44100.0);
        assert_eq!(out.len(), 441_000);
        assert!(out.windows(2).all(|w| w[1] > w[0]));
    }
}
