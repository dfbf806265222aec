//! Audio sources and the shared ring buffer.
//!
//! Every source owns a producer context (device callback thread) that writes
//! into its private [`RingBuffer`]; the frame-rate consumer only pulls copies
//! through the [`AudioSource`] capability trait.

mod buffer;
mod decode;
pub(crate) mod device;
mod file;
mod manager;
mod microphone;

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::AudioResult;

// Re-export public types
pub use buffer::{ChunkAssembler, RingBuffer};
pub use decode::{decode, resample_linear, DecodedAudio};
pub use device::{list_devices, DeviceInfo};
pub use file::{FilePlaybackSource, PlaybackCursor};
pub use manager::{ActiveSource, AudioManager};
pub use microphone::{CaptureProducer, MicrophoneSource};

/// Capability set shared by microphone, file playback and synthesizer sources
pub trait AudioSource {
    /// Begin producing samples. No-op if already running.
    fn start(&mut self) -> AudioResult<()>;

    /// Halt production and clear the ring buffer. Safe if never started.
    fn stop(&mut self);

    /// Stop writing new samples without tearing the stream down
    fn pause(&mut self);

    fn resume(&mut self);

    /// Flip the pause state, returning the new state
    fn toggle_pause(&mut self) -> bool {
        if self.is_paused() {
            self.resume();
        } else {
            self.pause();
        }
        self.is_paused()
    }

    fn is_running(&self) -> bool;

    fn is_paused(&self) -> bool;

    /// Display name for the UI
    fn name(&self) -> String;

    /// Most recent chunk (zeros when nothing has been produced)
    fn get_samples(&self) -> Vec<f32>;

    /// Exactly `n` recent samples for analysis, zero-padded at the front
    fn get_samples_for_fft(&self, n: usize) -> Vec<f32>;

    /// Transient callback faults reported by the backend so far
    fn fault_count(&self) -> u64 {
        0
    }
}

/// Lock a mutex, recovering the data if another thread panicked while holding it.
///
/// The audio callback must never unwind, so a poisoned lock is treated as usable.
pub(crate) fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
