//! Capture and playback configuration.

use crate::error::{AudioError, AudioResult};

/// Source-side audio configuration shared by microphone and file playback
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// Audio sample rate (Hz)
    pub sample_rate_hz: u32,

    /// Samples per chunk moved through the ring buffer
    /// 2048 ≈ 46ms @ 44.1kHz
    pub chunk_size: usize,

    /// Number of chunks the ring buffer keeps
    pub buffer_chunks: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 44100,
            chunk_size: 2048,
            buffer_chunks: 4,
        }
    }
}

impl AudioConfig {
    /// Total samples the ring buffer can hold
    pub fn buffer_capacity(&self) -> usize {
        self.chunk_size * self.buffer_chunks
    }

    /// Validate configuration (non-zero rate, chunk and depth)
    pub fn validate(&self) -> AudioResult<()> {
        if self.sample_rate_hz == 0 {
            return Err(AudioError::InvalidConfig("Sample rate must be > 0".to_string()));
        }
        if self.chunk_size == 0 {
            return Err(AudioError::InvalidConfig("Chunk size must be > 0".to_string()));
        }
        if self.buffer_chunks == 0 {
            return Err(AudioError::InvalidConfig(
                "Buffer must hold at least one chunk".to_string(),
            ));
        }
        Ok(())
    }
}

/// Audio constants (compile-time)
pub mod audio_constants {
    /// Consumer loop rate (frames per second)
    pub const FRAME_RATE_HZ: u32 = 60;
}
