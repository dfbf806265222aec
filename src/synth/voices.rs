//! Active-voice table and the block renderer that mixes it.
//!
//! The table sits behind one mutex shared by the UI thread (note events) and
//! the audio callback. The callback snapshots it, renders without the lock,
//! then writes phases back and drops finished voices.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use super::envelope::Adsr;
use super::note::{key_to_midi, Note};
use super::oscillator::{generate, Waveform};
use crate::audio::{lock_or_recover, ChunkAssembler, RingBuffer};
use crate::params::SynthConfig;

/// Fixed-capacity set of sounding notes, at most one per key.
///
/// Notes are kept in start order, so the front is always the oldest.
#[derive(Debug)]
pub struct VoiceTable {
    notes: Vec<Note>,
    max_polyphony: usize,
    waveform: Waveform,
    enabled: bool,
}

impl VoiceTable {
    pub fn new(max_polyphony: usize) -> Self {
        let max_polyphony = max_polyphony.max(1);
        Self {
            notes: Vec::with_capacity(max_polyphony),
            max_polyphony,
            waveform: Waveform::default(),
            enabled: true,
        }
    }

    /// Start the note mapped to `key`.
    ///
    /// Ignored if the key is unmapped, already sounding, or the synth is
    /// disabled. At the polyphony cap the oldest-started voice is stolen.
    pub fn note_on(&mut self, key: char, now: f64, velocity: f32) -> bool {
        if !self.enabled {
            return false;
        }
        let Some(midi) = key_to_midi(key) else {
            return false;
        };
        let key = key.to_ascii_lowercase();
        if self.notes.iter().any(|n| n.source_key == key) {
            return false;
        }

        if self.notes.len() >= self.max_polyphony {
            let oldest = self
                .notes
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| a.start_time.total_cmp(&b.start_time))
                .map(|(i, _)| i);
            if let Some(index) = oldest {
                let stolen = self.notes.remove(index);
                log::debug!("Voice stolen: {}", stolen.name());
            }
        }

        self.notes.push(Note::new(key, midi, now, velocity));
        true
    }

    /// Begin the release tail of `key`'s note
    pub fn note_off(&mut self, key: char, now: f64) -> bool {
        let key = key.to_ascii_lowercase();
        match self.notes.iter_mut().find(|n| n.source_key == key) {
            Some(note) => {
                note.release(now);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn max_polyphony(&self) -> usize {
        self.max_polyphony
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn clear(&mut self) {
        self.notes.clear();
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn cycle_waveform(&mut self) -> Waveform {
        self.waveform = self.waveform.next();
        self.waveform
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Flip the enabled flag; disabling silences every voice
    pub fn toggle_enabled(&mut self) -> bool {
        self.enabled = !self.enabled;
        if !self.enabled {
            self.notes.clear();
        }
        self.enabled
    }

    /// Persist a voice's phase, unless that voice was replaced meanwhile
    fn store_phase(&mut self, key: char, start_time: f64, phase: f32) {
        if let Some(note) = self
            .notes
            .iter_mut()
            .find(|n| n.source_key == key && n.start_time == start_time)
        {
            note.phase = phase;
        }
    }

    fn remove_voice(&mut self, key: char, start_time: f64) {
        self.notes
            .retain(|n| !(n.source_key == key && n.start_time == start_time));
    }
}

/// Callback-side mixer: everything the synth output stream touches.
///
/// All scratch buffers are sized at construction; they only grow if the
/// backend delivers a larger block than negotiated.
pub struct SynthRenderer {
    table: Arc<Mutex<VoiceTable>>,
    viz_buffer: Arc<RingBuffer>,
    paused: Arc<AtomicBool>,
    assembler: ChunkAssembler,
    epoch: Instant,

    sample_rate: u32,
    envelope: Adsr,
    master_volume: f32,
    viz_gain: f32,
    channels: usize,

    snapshot: Vec<Note>,
    finished: Vec<(char, f64)>,
    osc: Vec<f32>,
    env: Vec<f32>,
    mix: Vec<f32>,
    viz: Vec<f32>,
}

impl SynthRenderer {
    pub(crate) fn new(
        config: &SynthConfig,
        table: Arc<Mutex<VoiceTable>>,
        viz_buffer: Arc<RingBuffer>,
        paused: Arc<AtomicBool>,
        epoch: Instant,
        channels: usize,
    ) -> Self {
        let block = config.chunk_size;
        Self {
            table,
            viz_buffer,
            paused,
            assembler: ChunkAssembler::new(block),
            epoch,
            sample_rate: config.sample_rate_hz,
            envelope: config.envelope,
            master_volume: config.master_volume,
            viz_gain: config.viz_gain,
            channels: channels.max(1),
            snapshot: Vec::with_capacity(config.max_polyphony),
            finished: Vec::with_capacity(config.max_polyphony),
            osc: vec![0.0; block],
            env: vec![0.0; block],
            mix: vec![0.0; block],
            viz: vec![0.0; block],
        }
    }

    /// Fill one interleaved output block at the current time
    pub fn process(&mut self, data: &mut [f32]) {
        let now = self.epoch.elapsed().as_secs_f64();
        self.process_at(data, now);
    }

    /// Fill one interleaved output block as if rendered at `now`
    pub fn process_at(&mut self, data: &mut [f32], now: f64) {
        if self.paused.load(Ordering::Relaxed) {
            data.fill(0.0);
            return;
        }

        let frames = data.len() / self.channels;
        self.render(frames, now);

        let mut out = data.chunks_exact_mut(self.channels);
        for (frame, &sample) in (&mut out).zip(self.mix[..frames].iter()) {
            frame.fill(sample);
        }
        out.into_remainder().fill(0.0);

        for (v, &m) in self.viz[..frames].iter_mut().zip(self.mix[..frames].iter()) {
            *v = m * self.viz_gain;
        }
        self.assembler.extend(&self.viz[..frames], &self.viz_buffer);
    }

    /// Mix all voices into `self.mix[..frames]`, scaled by master volume
    fn render(&mut self, frames: usize, now: f64) {
        self.ensure_capacity(frames);

        let waveform = {
            let table = lock_or_recover(&self.table);
            self.snapshot.clear();
            self.snapshot.extend(table.notes.iter().cloned());
            table.waveform
        };

        let mix = &mut self.mix[..frames];
        mix.fill(0.0);
        self.finished.clear();

        for note in self.snapshot.iter_mut() {
            let osc = &mut self.osc[..frames];
            let env = &mut self.env[..frames];

            note.phase = generate(waveform, note.frequency, self.sample_rate, note.phase, osc);

            let since_release = note.time_since_release(now);
            self.envelope
                .fill(env, self.sample_rate, note.time_since_start(now), since_release);

            for ((m, &s), &a) in mix.iter_mut().zip(osc.iter()).zip(env.iter()) {
                *m += s * a * note.velocity;
            }

            if self.envelope.is_finished(since_release) {
                self.finished.push((note.source_key, note.start_time));
            }
        }

        {
            let mut table = lock_or_recover(&self.table);
            for note in &self.snapshot {
                table.store_phase(note.source_key, note.start_time, note.phase);
            }
            for &(key, start_time) in &self.finished {
                table.remove_voice(key, start_time);
            }
        }

        let voices = self.snapshot.len();
        let scale = if voices > 1 {
            self.master_volume / (voices as f32).sqrt()
        } else {
            self.master_volume
        };
        for m in mix.iter_mut() {
            *m *= scale;
        }
    }

    fn ensure_capacity(&mut self, frames: usize) {
        if self.mix.len() < frames {
            self.osc.resize(frames, 0.0);
            self.env.resize(frames, 0.0);
            self.mix.resize(frames, 0.0);
            self.viz.resize(frames, 0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retrigger_is_ignored() {
        let mut table = VoiceTable::new(8);
        assert!(table.note_on('a', 0.0, 0.8));
        assert!(!table.note_on('a', 0.1, 0.8));
        assert_eq!(table.len(), 1);
        assert_eq!(table.notes()[0].start_time, 0.0);
    }

    #[test]
    fn test_unmapped_key_is_ignored() {
        let mut table = VoiceTable::new(8);
        assert!(!table.note_on('o', 0.0, 0.8));
        assert!(!table.note_on('z', 0.0, 0.8));
        assert!(table.is_empty());
    }

    #[test]
    fn test_steals_oldest_voice() {
        let mut table = VoiceTable::new(3);
        table.note_on('a', 0.0, 0.8);
        table.note_on('s', 0.1, 0.8);
        table.note_on('d', 0.2, 0.8);
        table.note_on('f', 0.3, 0.8);

        let keys: Vec<char> = table.notes().iter().map(|n| n.source_key).collect();
        assert_eq!(keys, vec!['s', 'd', 'f']);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_note_off_keeps_voice() {
        let mut table = VoiceTable::new(4);
        table.note_on('h', 0.0, 0.8);
        assert!(table.note_off('h', 0.5));
        assert!(!table.note_off('j', 0.5));
        assert_eq!(table.len(), 1);
        assert_eq!(table.notes()[0].release_time, Some(0.5));
    }

    #[test]
    fn test_disable_clears_and_blocks() {
        let mut table = VoiceTable::new(4);
        table.note_on('a', 0.0, 0.8);
        assert!(!table.toggle_enabled());
        assert!(table.is_empty());
        assert!(!table.note_on('a', 0.1, 0.8));
        assert!(table.toggle_enabled());
        assert!(table.note_on('a', 0.2, 0.8));
    }

    #[test]
    fn test_waveform_cycle() {
        let mut table = VoiceTable::new(1);
        assert_eq!(table.waveform(), Waveform::Sine);
        assert_eq!(table.cycle_waveform(), Waveform::Square);
    }
}
