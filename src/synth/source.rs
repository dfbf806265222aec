//! Keyboard-played polyphonic synthesizer as an audio source.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use cpal::traits::{DeviceTrait, StreamTrait};

use super::note::Note;
use super::oscillator::Waveform;
use super::voices::{SynthRenderer, VoiceTable};
use crate::audio::device::{fault_handler, output_device, stream_config};
use crate::audio::{lock_or_recover, AudioSource, RingBuffer};
use crate::error::{AudioError, AudioResult};
use crate::params::SynthConfig;

/// Polyphonic synthesizer driven by note events from the UI thread
pub struct SynthesizerSource {
    config: SynthConfig,
    epoch: Instant,

    /// Shared with the output callback
    voices: Arc<Mutex<VoiceTable>>,
    viz_buffer: Arc<RingBuffer>,
    paused: Arc<AtomicBool>,
    faults: Arc<AtomicU64>,

    /// Output stream (kept alive while running)
    stream: Option<cpal::Stream>,
}

impl SynthesizerSource {
    pub fn new(config: SynthConfig) -> AudioResult<Self> {
        config.validate()?;
        Ok(Self {
            voices: Arc::new(Mutex::new(VoiceTable::new(config.max_polyphony))),
            viz_buffer: Arc::new(RingBuffer::new(config.chunk_size, config.viz_chunks)),
            paused: Arc::new(AtomicBool::new(false)),
            faults: Arc::new(AtomicU64::new(0)),
            stream: None,
            epoch: Instant::now(),
            config,
        })
    }

    /// Seconds on the synth clock, shared with the output callback
    pub fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Build the callback state for an output with `channels` interleaved channels
    pub fn renderer(&self, channels: usize) -> SynthRenderer {
        SynthRenderer::new(
            &self.config,
            Arc::clone(&self.voices),
            Arc::clone(&self.viz_buffer),
            Arc::clone(&self.paused),
            self.epoch,
            channels,
        )
    }

    pub fn note_on(&self, key: char) -> bool {
        self.note_on_at(key, self.now())
    }

    pub fn note_on_at(&self, key: char, now: f64) -> bool {
        let started = lock_or_recover(&self.voices).note_on(key, now, self.config.velocity);
        if started {
            log::trace!("Note on: {}", key);
        }
        started
    }

    pub fn note_off(&self, key: char) -> bool {
        self.note_off_at(key, self.now())
    }

    pub fn note_off_at(&self, key: char, now: f64) -> bool {
        lock_or_recover(&self.voices).note_off(key, now)
    }

    /// Snapshot of the sounding (and releasing) notes
    pub fn get_active_notes(&self) -> Vec<Note> {
        lock_or_recover(&self.voices).notes().to_vec()
    }

    /// Advance to the next waveform, returning its name
    pub fn cycle_waveform(&self) -> &'static str {
        let waveform = lock_or_recover(&self.voices).cycle_waveform();
        log::info!("Waveform: {}", waveform);
        waveform.name()
    }

    pub fn waveform(&self) -> Waveform {
        lock_or_recover(&self.voices).waveform()
    }

    /// Enable or disable the keyboard; returns the new state
    pub fn toggle_enabled(&self) -> bool {
        let enabled = lock_or_recover(&self.voices).toggle_enabled();
        log::info!("Synth {}", if enabled { "enabled" } else { "disabled" });
        enabled
    }

    pub fn is_enabled(&self) -> bool {
        lock_or_recover(&self.voices).is_enabled()
    }
}

impl AudioSource for SynthesizerSource {
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
            "Synth config: {} channels, {}Hz, {:?}",
            stream_config.channels,
            stream_config.sample_rate.0,
            stream_config.buffer_size
        );

        let mut renderer = self.renderer(usize::from(stream_config.channels));
        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| renderer.process(data),
                fault_handler("Synth", Arc::clone(&self.faults)),
                None,
            )
            .map_err(|e| AudioError::StreamBuildError(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamPlayError(e.to_string()))?;

        log::info!("Synth started ({} voices)", self.config.max_polyphony);
        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                log::debug!("Synth pause before close failed: {}", e);
            }
            drop(stream);
            log::info!("Synth stopped");
        }
        lock_or_recover(&self.voices).clear();
        self.viz_buffer.clear();
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
        format!("Piano [{}]", self.waveform())
    }

    fn get_samples(&self) -> Vec<f32> {
        self.viz_buffer.get_latest()
    }

    fn get_samples_for_fft(&self, n: usize) -> Vec<f32> {
        self.viz_buffer.get_samples(n)
    }

    fn fault_count(&self) -> u64 {
        self.faults.load(Ordering::Relaxed)
    }
}

impl Drop for SynthesizerSource {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::{generate, midi_to_frequency, Adsr};

    const RATE: u32 = 1000;

    fn config() -> SynthConfig {
        SynthConfig {
            sample_rate_hz: RATE,
            chunk_size: 10,
            max_polyphony: 3,
            master_volume: 1.0,
            viz_gain: 2.0,
            viz_chunks: 4,
            velocity: 1.0,
            envelope: Adsr {
                attack: 0.0,
                decay: 0.0,
                sustain: 1.0,
                release: 0.05,
            },
        }
    }

    fn synth() -> SynthesizerSource {
        SynthesizerSource::new(config()).unwrap()
    }

    fn keys(synth: &SynthesizerSource) -> Vec<char> {
        synth.get_active_notes().iter().map(|n| n.source_key).collect()
    }

    #[test]
    fn test_note_on_is_idempotent() {
        let synth = synth();
        synth.note_on_at('a', 0.0);
        synth.note_on_at('a', 0.01);
        assert_eq!(keys(&synth), vec!['a']);
    }

    #[test]
    fn test_polyphony_cap_evicts_earliest() {
        let synth = synth();
        for (i, key) in ['a', 's', 'd', 'f'].into_iter().enumerate() {
            synth.note_on_at(key, i as f64 * 0.1);
        }
        assert_eq!(keys(&synth), vec!['s', 'd', 'f']);
    }

    #[test]
    fn test_released_voice_removed_after_release() {
        let synth = synth();
        let mut renderer = synth.renderer(1);
        let mut block = [0.0; 10];

        synth.note_on_at('a', 0.0);
        renderer.process_at(&mut block, 0.0);
        synth.note_off_at('a', 0.01);

        renderer.process_at(&mut block, 0.03);
        assert_eq!(keys(&synth), vec!['a']);

        renderer.process_at(&mut block, 0.07);
        assert!(synth.get_active_notes().is_empty());
    }

    #[test]
    fn test_phase_persists_across_blocks() {
        let synth = synth();
        let mut renderer = synth.renderer(1);
        let mut block = [0.0; 10];

        synth.note_on_at('h', 0.0);
        renderer.process_at(&mut block, 0.0);

        // 440Hz for 10 samples at 1kHz = 4.4 cycles
        let phase = synth.get_active_notes()[0].phase;
        assert!((phase - 0.4).abs() < 1e-3);
    }

    #[test]
    fn test_two_voices_scaled_by_sqrt() {
        let synth = synth();
        let mut renderer = synth.renderer(1);
        let mut block = [0.0; 10];

        synth.note_on_at('a', 0.0);
        synth.note_on_at('h', 0.0);
        renderer.process_at(&mut block, 0.0);

        let mut c4 = [0.0f32; 10];
        let mut a4 = [0.0f32; 10];
        generate(Waveform::Sine, midi_to_frequency(60), RATE, 0.0, &mut c4);
        generate(Waveform::Sine, midi_to_frequency(69), RATE, 0.0, &mut a4);

        for ((got, c), a) in block.iter().zip(c4.iter()).zip(a4.iter()) {
            let want = (c + a) / 2f32.sqrt();
            assert!((got - want).abs() < 1e-4);
        }
    }

    #[test]
    fn test_paused_output_is_silent_and_not_buffered() {
        let mut synth = synth();
        let mut renderer = synth.renderer(2);
        synth.note_on_at('a', 0.0);
        synth.pause();

        let mut data = [1.0; 20];
        renderer.process_at(&mut data, 0.0);
        assert_eq!(data, [0.0; 20]);
        assert!(synth.get_samples_for_fft(10).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_viz_copy_uses_viz_gain() {
        let synth = synth();
        let mut renderer = synth.renderer(2);
        synth.note_on_at('a', 0.0);

        let mut data = [0.0; 20];
        renderer.process_at(&mut data, 0.0);
        let viz = synth.get_samples();
        for (frame, v) in data.chunks(2).zip(viz.iter()) {
            assert_eq!(frame[0], frame[1]);
            assert!((v - 2.0 * frame[0]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_name_and_stop() {
        let mut synth = synth();
        assert_eq!(synth.name(), "Piano [sine]");
        assert_eq!(synth.cycle_waveform(), "square");
        assert_eq!(synth.name(), "Piano [square]");

        synth.note_on_at('a', 0.0);
        synth.stop();
        assert!(synth.get_active_notes().is_empty());
        assert!(!synth.is_running());
    }

    #[test]
    fn test_partial_trailing_frame_is_silent() {
        let synth = synth();
        let mut renderer = synth.renderer(2);
        synth.note_on_at('a', 0.0);

        let mut data = [0.0; 20];
        renderer.process_at(&mut data, 0.0);

        // A ragged block: 10 whole stereo frames plus one stray sample
        let mut ragged = [1.0; 21];
        renderer.process_at(&mut ragged, 0.01);
        assert_eq!(ragged[20], 0.0);
        for frame in ragged[..20].chunks(2) {
            assert_eq!(frame[0], frame[1]);
        }
    }
}
