//! Audio error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while configuring or starting an audio source
#[derive(Error, Debug)]
pub enum AudioError {
    /// No device of the requested direction is available
    #[error("No audio {0} device found")]
    NoDevice(&'static str),

    /// Device index does not exist
    #[error("Audio device not found: index {0}")]
    DeviceNotFound(usize),

    /// Failed to query device configuration
    #[error("Failed to get device config: {0}")]
    ConfigError(String),

    /// Device does not offer f32 samples
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// Failed to build audio stream
    #[error("Failed to build audio stream: {0}")]
    StreamBuildError(String),

    /// Failed to start/play stream
    #[error("Failed to start audio stream: {0}")]
    StreamPlayError(String),

    /// Audio file missing
    #[error("Audio file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Audio file present but not decodable
    #[error("Failed to decode {}: {reason}", path.display())]
    DecodeError { path: PathBuf, reason: String },

    /// Rejected configuration parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AudioError {
    /// True for failures that mean the source cannot produce audio right now.
    ///
    /// Callers are expected to fall back to another source or report it.
    pub fn is_source_unavailable(&self) -> bool {
        !matches!(self, AudioError::InvalidConfig(_))
    }
}

/// Result type for audio operations
pub type AudioResult<T> = Result<T, AudioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(AudioError::NoDevice("input").is_source_unavailable());
        assert!(AudioError::FileNotFound(PathBuf::from("x.wav")).is_source_unavailable());
        assert!(!AudioError::InvalidConfig("fft".into()).is_source_unavailable());
    }

    #[test]
    fn test_messages() {
        let err = AudioError::DecodeError {
            path: PathBuf::from("song.wav"),
            reason: "bad header".into(),
        };
        assert_eq!(err.to_string(), "Failed to decode song.wav: bad header");
    }
}
