//! Polyphonic software synthesizer.
//!
//! Note events come from the UI thread; the output callback mixes every
//! active voice into each device block and mirrors it into a small ring
//! buffer so the synth can be analyzed like any other source.

mod envelope;
mod note;
mod oscillator;
mod source;
mod voices;

// Re-export public types
pub use envelope::Adsr;
pub use note::{key_to_midi, midi_to_frequency, note_name, pitch_class, Note};
pub use oscillator::{generate, Waveform};
pub use source::SynthesizerSource;
pub use voices::{SynthRenderer, VoiceTable};
