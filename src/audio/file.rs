//! File playback source.
//!
//! The whole file is decoded up front; the output callback copies blocks from
//! a looping read cursor into both the device and the visualization buffer.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, StreamTrait};

use super::buffer::{ChunkAssembler, RingBuffer};
use super::decode::decode;
use super::device::{fault_handler, output_device, stream_config};
use super::{lock_or_recover, AudioSource};
use crate::error::{AudioError, AudioResult};
use crate::params::AudioConfig;

/// Decoded samples plus a looping read position
#[derive(Debug, Clone)]
pub struct PlaybackCursor {
    samples: Vec<f32>,
    position: usize,
    sample_rate: u32,
}

impl PlaybackCursor {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            position: 0,
            sample_rate: sample_rate.max(1),
        }
    }

    /// Copy the next `out.len()` samples and advance.
    ///
    /// A block that runs past the end is zero-padded and the cursor wraps to
    /// the start; the rest of that block is silence rather than the file head.
    pub fn fill(&mut self, out: &mut [f32]) {
        let frames = out.len();
        let end = (self.position + frames).min(self.samples.len());
        let n = end - self.position;

        out[..n].copy_from_slice(&self.samples[self.position..end]);
        out[n..].fill(0.0);

        self.position = if n < frames { 0 } else { end };
    }

    /// Jump to `seconds`, clamped to `[0, duration]`
    pub fn seek(&mut self, seconds: f64) {
        let target = (seconds * self.sample_rate as f64).floor();
        self.position = target.clamp(0.0, self.samples.len() as f64) as usize;
    }

    /// Jump by `offset` seconds from the current position
    pub fn seek_relative(&mut self, offset: f64) {
        self.seek(self.current_time() + offset);
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn total_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn current_time(&self) -> f64 {
        self.position as f64 / self.sample_rate as f64
    }

    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Playback progress in 0-1 (0 for an empty file)
    pub fn progress(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.position as f64 / self.samples.len() as f64
    }
}

/// Producer half of a playback source: everything the output callback touches
pub struct PlaybackProducer {
    cursor: Arc<Mutex<PlaybackCursor>>,
    buffer: Arc<RingBuffer>,
    paused: Arc<AtomicBool>,
    assembler: ChunkAssembler,
    channels: usize,
    mono: Vec<f32>,
}

impl PlaybackProducer {
    /// Fill one interleaved output block
    pub fn process(&mut self, data: &mut [f32]) {
        if self.paused.load(Ordering::Relaxed) {
            data.fill(0.0);
            return;
        }

        let frames = data.len() / self.channels;
        if self.mono.len() < frames {
            // Only when the backend hands us a larger block than negotiated
            self.mono.resize(frames, 0.0);
        }
        let block = &mut self.mono[..frames];

        lock_or_recover(&self.cursor).fill(block);

        for (frame, &sample) in data.chunks_mut(self.channels).zip(block.iter()) {
            frame.fill(sample);
        }
        self.assembler.extend(block, &self.buffer);
    }
}

/// Looping playback of a decoded audio file
pub struct FilePlaybackSource {
    config: AudioConfig,
    path: PathBuf,
    file_name: String,

    /// Shared with the output callback
    cursor: Arc<Mutex<PlaybackCursor>>,
    buffer: Arc<RingBuffer>,
    paused: Arc<AtomicBool>,
    faults: Arc<AtomicU64>,

    /// Output stream (kept alive while running)
    stream: Option<cpal::Stream>,
}

impl FilePlaybackSource {
    /// Decode `path` at the configured sample rate.
    ///
    /// Fails with a source-unavailable error if the file is missing or undecodable.
    pub fn new(path: impl AsRef<Path>, config: AudioConfig) -> AudioResult<Self> {
        config.validate()?;
        let path = path.as_ref().to_path_buf();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        log::info!("Loading: {}...", file_name);
        let audio = decode(&path, config.sample_rate_hz)?;
        log::info!(
            "Loaded: {:.1}s, {}Hz",
            audio.duration_secs(),
            audio.sample_rate
        );

        Ok(Self::from_samples(path, file_name, audio.samples, config))
    }

    /// Wrap already-decoded mono samples at `config.sample_rate_hz`
    pub fn from_samples(
        path: PathBuf,
        file_name: String,
        samples: Vec<f32>,
        config: AudioConfig,
    ) -> Self {
        let buffer = Arc::new(RingBuffer::new(config.chunk_size, config.buffer_chunks));
        let cursor = PlaybackCursor::new(samples, config.sample_rate_hz);
        Self {
            config,
            path,
            file_name,
            cursor: Arc::new(Mutex::new(cursor)),
            buffer,
            paused: Arc::new(AtomicBool::new(false)),
            faults: Arc::new(AtomicU64::new(0)),
            stream: None,
        }
    }

    /// Build the callback state for an output with `channels` interleaved channels
    pub fn producer(&self, channels: usize) -> PlaybackProducer {
        PlaybackProducer {
            cursor: Arc::clone(&self.cursor),
            buffer: Arc::clone(&self.buffer),
            paused: Arc::clone(&self.paused),
            assembler: ChunkAssembler::new(self.config.chunk_size),
            channels: channels.max(1),
            mono: vec![0.0; self.config.chunk_size],
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn seek(&self, seconds: f64) {
        lock_or_recover(&self.cursor).seek(seconds);
    }

    pub fn seek_relative(&self, offset: f64) {
        lock_or_recover(&self.cursor).seek_relative(offset);
    }

    pub fn current_time(&self) -> f64 {
        lock_or_recover(&self.cursor).current_time()
    }

    pub fn progress(&self) -> f64 {
        lock_or_recover(&self.cursor).progress()
    }

    pub fn duration(&self) -> f64 {
        lock_or_recover(&self.cursor).duration()
    }
}

impl AudioSource for FilePlaybackSource {
    fn start(&mut self) -> AudioResult<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let device = output_device()?;
        let stream_config = stream_config(
            &device,
            false,
            self.config.sample_rate_hz,
            self.config.chunk_size,
        )?;

        log::debug!(
            "Playback config: {} channels, {}Hz, {:?}",
            stream_config.channels,
            stream_config.sample_rate.0,
            stream_config.buffer_size
        );

        let mut producer = self.producer(usize::from(stream_config.channels));
        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| producer.process(data),
                fault_handler("Playback", Arc::clone(&self.faults)),
                None,
            )
            .map_err(|e| AudioError::StreamBuildError(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamPlayError(e.to_string()))?;

        log::info!("Playing: {}", self.file_name);
        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                log::debug!("Playback pause before close failed: {}", e);
            }
            drop(stream);
            log::info!("Playback stopped");
        }
        self.buffer.clear();
    }

    fn pause(&mut self) {
        self.paused.store(true, Ordering::Relaxed);
    }

    fn resume(&mut self) {
        self.paused.store(false, Ordering::Relaxed);
    }

    fn is_running(&self) -> bool {
        self.stream.is_some()
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    fn name(&self) -> String {
        format!("File: {}", self.file_name)
    }

    fn get_samples(&self) -> Vec<f32> {
        self.buffer.get_latest()
    }

    fn get_samples_for_fft(&self, n: usize) -> Vec<f32> {
        self.buffer.get_samples(n)
    }

    fn fault_count(&self) -> u64 {
        self.faults.load(Ordering::Relaxed)
    }
}

impl Drop for FilePlaybackSource {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize) -> Vec<f32> {
        (0..len).map(|i| i as f32).collect()
    }

    fn source(samples: Vec<f32>, chunk_size: usize) -> FilePlaybackSource {
        let config = AudioConfig {
            sample_rate_hz: 10,
            chunk_size,
            buffer_chunks: 4,
        };
        FilePlaybackSource::from_samples(
            PathBuf::from("ramp.wav"),
            "ramp.wav".to_string(),
            samples,
            config,
        )
    }

    #[test]
    fn test_cursor_wraps_with_zero_padding() {
        let mut cursor = PlaybackCursor::new(ramp(10), 10);
        let mut block = [0.0; 4];

        cursor.fill(&mut block);
        cursor.fill(&mut block);
        assert_eq!(block, [4.0, 5.0, 6.0, 7.0]);

        // Runs off the end: tail then silence, cursor back to 0
        cursor.fill(&mut block);
        assert_eq!(block, [8.0, 9.0, 0.0, 0.0]);
        assert_eq!(cursor.position(), 0);

        cursor.fill(&mut block);
        assert_eq!(block, [0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_seek_clamps() {
        let mut cursor = PlaybackCursor::new(ramp(100), 10);

        cursor.seek(2.5);
        assert_eq!(cursor.position(), 25);
        assert!((cursor.current_time() - 2.5).abs() < 1e-9);
        assert!((cursor.progress() - 0.25).abs() < 1e-9);

        cursor.seek(-3.0);
        assert_eq!(cursor.position(), 0);

        cursor.seek(99.0);
        assert_eq!(cursor.position(), 100);
        assert!((cursor.progress() - 1.0).abs() < 1e-9);

        cursor.seek(5.0);
        cursor.seek_relative(-1.5);
        assert_eq!(cursor.position(), 35);
        cursor.seek_relative(100.0);
        assert_eq!(cursor.position(), 100);
    }

    #[test]
    fn test_empty_cursor() {
        let mut cursor = PlaybackCursor::new(Vec::new(), 44100);
        let mut block = [1.0; 3];
        cursor.fill(&mut block);
        assert_eq!(block, [0.0; 3]);
        assert_eq!(cursor.progress(), 0.0);
        assert_eq!(cursor.duration(), 0.0);
    }

    #[test]
    fn test_producer_feeds_output_and_buffer() {
        let playback = source(ramp(16), 4);
        let mut producer = playback.producer(2);

        let mut data = [0.0; 8];
        producer.process(&mut data);
        assert_eq!(data, [0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 3.0, 3.0]);
        assert_eq!(playback.get_samples(), vec![0.0, 1.0, 2.0, 3.0]);
        assert!((playback.current_time() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_paused_producer_is_silent() {
        let mut playback = source(ramp(16), 4);
        let mut producer = playback.producer(1);

        playback.pause();
        let mut data = [1.0; 4];
        producer.process(&mut data);
        assert_eq!(data, [0.0; 4]);
        assert_eq!(playback.current_time(), 0.0);
        assert!(playback.get_samples_for_fft(4).iter().all(|&s| s == 0.0));

        playback.resume();
        producer.process(&mut data);
        assert_eq!(data, [0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_stop_clears_buffer() {
        let mut playback = source(ramp(16), 4);
        let mut producer = playback.producer(1);
        let mut data = [0.0; 4];
        producer.process(&mut data);
        assert!(!playback.buffer.is_empty());

        playback.stop();
        assert!(playback.buffer.is_empty());
        assert!(!playback.is_running());
        assert_eq!(playback.name(), "File: ramp.wav");
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let result = FilePlaybackSource::new("/no/such/track.wav", AudioConfig::default());
        match result {
            Err(e) => assert!(e.is_source_unavailable()),
            Ok(_) => panic!("expected missing file to fail"),
        }
    }
}
