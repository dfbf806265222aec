//! Owner of the one active audio source.
//!
//! Switching always stops the previous source (clearing its buffer) before
//! the next one starts, and bumps a generation counter so the analysis side
//! knows to reset its smoothed state. A file source switched away from is
//! parked, not dropped, so toggling back resumes it without decoding again.

use std::path::Path;

use super::file::FilePlaybackSource;
use super::microphone::MicrophoneSource;
use super::AudioSource;
use crate::error::AudioResult;
use crate::params::{AudioConfig, SynthConfig};
use crate::synth::SynthesizerSource;

/// The concrete source currently feeding analysis
pub enum ActiveSource {
    Microphone(MicrophoneSource),
    File(FilePlaybackSource),
    Synthesizer(SynthesizerSource),
}

impl ActiveSource {
    pub fn as_source(&self) -> &dyn AudioSource {
        match self {
            ActiveSource::Microphone(mic) => mic,
            ActiveSource::File(file) => file,
            ActiveSource::Synthesizer(synth) => synth,
        }
    }

    pub fn as_source_mut(&mut self) -> &mut dyn AudioSource {
        match self {
            ActiveSource::Microphone(mic) => mic,
            ActiveSource::File(file) => file,
            ActiveSource::Synthesizer(synth) => synth,
        }
    }
}

/// Source switching plus pass-through controls for the active source
pub struct AudioManager {
    audio_config: AudioConfig,
    synth_config: SynthConfig,
    active: Option<ActiveSource>,
    /// Stopped file source, kept with its samples and cursor
    parked_file: Option<FilePlaybackSource>,
    generation: u64,
}

impl AudioManager {
    pub fn new(audio_config: AudioConfig, synth_config: SynthConfig) -> AudioResult<Self> {
        audio_config.validate()?;
        synth_config.validate()?;
        Ok(Self {
            audio_config,
            synth_config,
            active: None,
            parked_file: None,
            generation: 0,
        })
    }

    /// Switch to live input from `device` (`None` = host default)
    pub fn start_microphone(&mut self, device: Option<usize>) -> AudioResult<()> {
        self.stop();
        let mic = MicrophoneSource::new(self.audio_config.clone(), device)?;
        self.activate(ActiveSource::Microphone(mic))
    }

    /// Switch to looping playback of `path`
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> AudioResult<()> {
        self.stop();
        let file = FilePlaybackSource::new(path, self.audio_config.clone())?;
        self.parked_file = None;
        self.activate(ActiveSource::File(file))
    }

    /// Switch to the keyboard synthesizer
    pub fn start_synthesizer(&mut self) -> AudioResult<()> {
        self.stop();
        let synth = SynthesizerSource::new(self.synth_config.clone())?;
        self.activate(ActiveSource::Synthesizer(synth))
    }

    /// Microphone ⇄ last loaded file.
    ///
    /// From the microphone with no file loaded yet, stays on the microphone.
    /// From any other source (or none), goes to the microphone.
    pub fn toggle_source(&mut self) -> AudioResult<()> {
        let on_mic = matches!(self.active, Some(ActiveSource::Microphone(_)));
        if !on_mic {
            return self.start_microphone(None);
        }
        if self.parked_file.is_none() {
            return Ok(());
        }
        self.stop();
        match self.parked_file.take() {
            Some(file) => self.activate(ActiveSource::File(file)),
            None => Ok(()),
        }
    }

    fn activate(&mut self, mut source: ActiveSource) -> AudioResult<()> {
        source.as_source_mut().start()?;
        log::info!("Source: {}", source.as_source().name());
        self.active = Some(source);
        self.generation += 1;
        Ok(())
    }

    /// Stop the active source, if any. A file source is parked for
    /// [`toggle_source`](Self::toggle_source); others are dropped.
    pub fn stop(&mut self) {
        if let Some(mut source) = self.active.take() {
            source.as_source_mut().stop();
            if let ActiveSource::File(file) = source {
                self.parked_file = Some(file);
            }
            self.generation += 1;
        }
    }

    pub fn pause(&mut self) {
        if let Some(source) = self.current_mut() {
            source.pause();
        }
    }

    pub fn resume(&mut self) {
        if let Some(source) = self.current_mut() {
            source.resume();
        }
    }

    /// Flip pause on the active source; false when nothing is active
    pub fn toggle_pause(&mut self) -> bool {
        self.current_mut()
            .map(|source| source.toggle_pause())
            .unwrap_or(false)
    }

    pub fn source_name(&self) -> String {
        self.current()
            .map(|source| source.name())
            .unwrap_or_else(|| "None".to_string())
    }

    pub fn is_running(&self) -> bool {
        self.current().is_some_and(|source| source.is_running())
    }

    pub fn is_paused(&self) -> bool {
        self.current().is_some_and(|source| source.is_paused())
    }

    /// `n` recent samples from the active source, or silence
    pub fn samples_for_fft(&self, n: usize) -> Vec<f32> {
        match self.current() {
            Some(source) => source.get_samples_for_fft(n),
            None => vec![0.0; n],
        }
    }

    /// Increments on every source change, including stop
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn active(&self) -> Option<&ActiveSource> {
        self.active.as_ref()
    }

    pub fn current(&self) -> Option<&dyn AudioSource> {
        self.active.as_ref().map(ActiveSource::as_source)
    }

    pub fn current_mut(&mut self) -> Option<&mut dyn AudioSource> {
        self.active.as_mut().map(ActiveSource::as_source_mut)
    }

    /// The file source, when file playback is active
    pub fn file_player(&self) -> Option<&FilePlaybackSource> {
        match &self.active {
            Some(ActiveSource::File(file)) => Some(file),
            _ => None,
        }
    }

    /// The synthesizer, when it is the active source
    pub fn synthesizer(&self) -> Option<&SynthesizerSource> {
        match &self.active {
            Some(ActiveSource::Synthesizer(synth)) => Some(synth),
            _ => None,
        }
    }

    /// Path of the active or parked file source
    pub fn last_file(&self) -> Option<&Path> {
        self.file_player()
            .or(self.parked_file.as_ref())
            .map(FilePlaybackSource::path)
    }
}

impl Drop for AudioManager {
    fn drop(&mut self) {
        self.stop();
    }
}
