//! Sounding notes and the computer-keyboard piano layout.

/// Keyboard row layout: home row is the white keys from C4, top row the black keys.
/// `o` sits where C#5 would be but stays unmapped.
const KEYBOARD_MAP: [(char, u8); 16] = [
    ('a', 60),
    ('w', 61),
    ('s', 62),
    ('e', 63),
    ('d', 64),
    ('f', 65),
    ('t', 66),
    ('g', 67),
    ('y', 68),
    ('h', 69),
    ('u', 70),
    ('j', 71),
    ('k', 72),
    ('l', 74),
    ('p', 75),
    (';', 76),
];

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// MIDI note number for a keyboard key, if the key plays a note
pub fn key_to_midi(key: char) -> Option<u8> {
    let key = key.to_ascii_lowercase();
    KEYBOARD_MAP
        .iter()
        .find(|(k, _)| *k == key)
        .map(|&(_, midi)| midi)
}

/// Equal-tempered frequency, A4 (69) = 440 Hz
pub fn midi_to_frequency(midi: u8) -> f32 {
    440.0 * 2f32.powf((midi as f32 - 69.0) / 12.0)
}

/// Scientific pitch name, e.g. 60 → "C4"
pub fn note_name(midi: u8) -> String {
    let octave = (midi / 12) as i32 - 1;
    format!("{}{}", NOTE_NAMES[(midi % 12) as usize], octave)
}

/// Pitch class 0 (C) .. 11 (B), for colouring notes
pub fn pitch_class(midi: u8) -> u8 {
    midi % 12
}

/// One sounding voice.
///
/// Times are seconds on the synthesizer's clock. A released note keeps
/// sounding through its release tail until the voice table drops it.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub frequency: f32,
    pub midi_number: u8,
    pub source_key: char,
    pub start_time: f64,
    pub release_time: Option<f64>,
    /// Oscillator phase accumulator (0-1 cycles)
    pub phase: f32,
    pub velocity: f32,
}

impl Note {
    pub fn new(source_key: char, midi_number: u8, start_time: f64, velocity: f32) -> Self {
        Self {
            frequency: midi_to_frequency(midi_number),
            midi_number,
            source_key,
            start_time,
            release_time: None,
            phase: 0.0,
            velocity,
        }
    }

    pub fn is_released(&self) -> bool {
        self.release_time.is_some()
    }

    pub fn time_since_start(&self, now: f64) -> f64 {
        now - self.start_time
    }

    pub fn time_since_release(&self, now: f64) -> Option<f64> {
        self.release_time.map(|t| now - t)
    }

    /// Mark released at `now`; a second release keeps the first time
    pub fn release(&mut self, now: f64) {
        if self.release_time.is_none() {
            self.release_time = Some(now);
        }
    }

    pub fn name(&self) -> String {
        note_name(self.midi_number)
    }
}
