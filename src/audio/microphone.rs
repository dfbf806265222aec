//! Live microphone capture.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, StreamTrait};

use super::buffer::{ChunkAssembler, RingBuffer};
use super::device::{downmix_frame, fault_handler, input_device, stream_config};
use super::AudioSource;
use crate::error::{AudioError, AudioResult};
use crate::params::AudioConfig;

/// Capture half of a microphone source: everything the input callback touches
pub struct CaptureProducer {
    buffer: Arc<RingBuffer>,
    paused: Arc<AtomicBool>,
    assembler: ChunkAssembler,
    channels: usize,
}

impl CaptureProducer {
    /// Downmix one interleaved input block into the ring buffer.
    ///
    /// Paused blocks are dropped; readers keep seeing the last chunks.
    pub fn process(&mut self, data: &[f32]) {
        if self.paused.load(Ordering::Relaxed) {
            return;
        }
        for frame in data.chunks(self.channels) {
            self.assembler.push_sample(downmix_frame(frame), &self.buffer);
        }
    }
}

/// Microphone input feeding a ring buffer from the device callback
pub struct MicrophoneSource {
    config: AudioConfig,
    device_index: Option<usize>,
    device_name: Option<String>,

    /// Shared with the capture callback
    buffer: Arc<RingBuffer>,
    paused: Arc<AtomicBool>,
    faults: Arc<AtomicU64>,

    /// Input stream (kept alive while running)
    stream: Option<cpal::Stream>,
}

impl MicrophoneSource {
    /// Create a source for the given input device index (`None` = host default).
    ///
    /// No device is opened until [`start`](AudioSource::start).
    pub fn new(config: AudioConfig, device_index: Option<usize>) -> AudioResult<Self> {
        config.validate()?;
        let buffer = Arc::new(RingBuffer::new(config.chunk_size, config.buffer_chunks));
        Ok(Self {
            config,
            device_index,
            device_name: None,
            buffer,
            paused: Arc::new(AtomicBool::new(false)),
            faults: Arc::new(AtomicU64::new(0)),
            stream: None,
        })
    }

    /// The ring buffer the capture callback writes into
    pub fn buffer(&self) -> &Arc<RingBuffer> {
        &self.buffer
    }

    /// Build the callback state for an input with `channels` interleaved channels
    pub fn producer(&self, channels: usize) -> CaptureProducer {
        CaptureProducer {
            buffer: Arc::clone(&self.buffer),
            paused: Arc::clone(&self.paused),
            assembler: ChunkAssembler::new(self.config.chunk_size),
            channels: channels.max(1),
        }
    }
}

impl AudioSource for MicrophoneSource {
    fn start(&mut self) -> AudioResult<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let device = input_device(self.device_index)?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let stream_config = stream_config(
            &device,
            true,
            self.config.sample_rate_hz,
            self.config.chunk_size,
        )?;
        let channels = usize::from(stream_config.channels.max(1));

        log::debug!(
            "Microphone config: {} channels, {}Hz, {:?}",
            channels,
            stream_config.sample_rate.0,
            stream_config.buffer_size
        );

        let mut producer = self.producer(channels);
        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| producer.process(data),
                fault_handler("Microphone", Arc::clone(&self.faults)),
                None,
            )
            .map_err(|e| AudioError::StreamBuildError(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamPlayError(e.to_string()))?;

        log::info!("Microphone started: {}", device_name);
        self.device_name = Some(device_name);
        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                log::debug!("Microphone pause before close failed: {}", e);
            }
            // Dropping the stream joins the backend callback thread
            drop(stream);
            log::info!("Microphone stopped");
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
        match (self.device_index, &self.device_name) {
            (Some(_), Some(name)) => format!("Mic: {}", name),
            _ => "Microphone".to_string(),
        }
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

impl Drop for MicrophoneSource {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_without_start_is_safe() {
        let mut mic = MicrophoneSource::new(AudioConfig::default(), None).unwrap();
        assert!(!mic.is_running());
        mic.stop();
        mic.stop();
        assert_eq!(mic.get_samples_for_fft(16), vec![0.0; 16]);
    }

    #[test]
    fn test_pause_toggle() {
        let mut mic = MicrophoneSource::new(AudioConfig::default(), None).unwrap();
        assert!(mic.toggle_pause());
        assert!(mic.is_paused());
        assert!(!mic.toggle_pause());
        assert_eq!(mic.name(), "Microphone");
    }

    fn mic(chunk_size: usize) -> MicrophoneSource {
        let config = AudioConfig {
            chunk_size,
            ..AudioConfig::default()
        };
        MicrophoneSource::new(config, None).unwrap()
    }

    #[test]
    fn test_capture_averages_stereo() {
        let mic = mic(4);
        let mut producer = mic.producer(2);

        producer.process(&[1.0, 0.0, 0.5, 0.5, -1.0, 0.0, 0.2, 0.4]);
        let latest = mic.get_samples();
        let expected = [0.5, 0.5, -0.5, 0.3];
        for (got, want) in latest.iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-6);
        }
    }

    #[test]
    fn test_capture_rechunks_partial_blocks() {
        let mic = mic(4);
        let mut producer = mic.producer(1);

        producer.process(&[1.0, 2.0, 3.0]);
        assert!(mic.buffer().is_empty());
        producer.process(&[4.0, 5.0]);
        assert_eq!(mic.get_samples(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_paused_capture_serves_stale_data() {
        let mut mic = mic(2);
        let mut producer = mic.producer(1);

        producer.process(&[0.1, 0.2]);
        mic.pause();
        producer.process(&[0.9, 0.9, 0.9, 0.9]);
        assert_eq!(mic.get_samples(), vec![0.1, 0.2]);
        assert_eq!(mic.buffer().num_chunks(), 1);

        mic.resume();
        producer.process(&[0.3, 0.4]);
        assert_eq!(mic.get_samples(), vec![0.3, 0.4]);
    }
}
