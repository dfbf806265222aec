//! Thread-safe ring buffer of recent mono audio chunks.
//!
//! The producer (device or decode callback) pushes fixed-size chunks; the
//! frame-rate consumer pulls copies. Every operation takes the same lock and
//! copies while holding it, so readers always see a consistent snapshot.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::lock_or_recover;

/// Bounded FIFO of mono sample chunks. Pushing beyond capacity evicts the oldest.
#[derive(Debug)]
pub struct RingBuffer {
    chunk_size: usize,
    max_chunks: usize,
    chunks: Mutex<VecDeque<Vec<f32>>>,
}

impl RingBuffer {
    pub fn new(chunk_size: usize, max_chunks: usize) -> Self {
        let max_chunks = max_chunks.max(1);
        Self {
            chunk_size,
            max_chunks,
            chunks: Mutex::new(VecDeque::with_capacity(max_chunks)),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn max_chunks(&self) -> usize {
        self.max_chunks
    }

    /// Store a copy of `samples` as the newest chunk.
    ///
    /// Input longer than one chunk keeps only its most recent `chunk_size`
    /// samples, so `total_samples() <= max_chunks * chunk_size` always holds.
    /// Once full, the evicted chunk's allocation is reused.
    pub fn push(&self, samples: &[f32]) {
        let start = samples.len().saturating_sub(self.chunk_size);
        let samples = &samples[start..];

        let mut chunks = lock_or_recover(&self.chunks);
        let mut slot = if chunks.len() >= self.max_chunks {
            chunks.pop_front().unwrap_or_default()
        } else {
            Vec::with_capacity(self.chunk_size)
        };
        slot.clear();
        slot.extend_from_slice(samples);
        chunks.push_back(slot);
    }

    /// Copy of the most recent chunk, or a zero-filled chunk when empty
    pub fn get_latest(&self) -> Vec<f32> {
        let chunks = lock_or_recover(&self.chunks);
        match chunks.back() {
            Some(latest) => latest.clone(),
            None => vec![0.0; self.chunk_size],
        }
    }

    /// All buffered samples in chronological order
    pub fn get_all(&self) -> Vec<f32> {
        let chunks = lock_or_recover(&self.chunks);
        let total = chunks.iter().map(Vec::len).sum();
        let mut all = Vec::with_capacity(total);
        for chunk in chunks.iter() {
            all.extend_from_slice(chunk);
        }
        all
    }

    /// Exactly `n` samples: the most recent `n`, left-padded with zeros if
    /// fewer are buffered.
    pub fn get_samples(&self, n: usize) -> Vec<f32> {
        let mut out = vec![0.0; n];
        self.read_latest_into(&mut out);
        out
    }

    /// Fill `out` with the most recent `out.len()` samples, zero-padding the front.
    ///
    /// Non-allocating form of [`get_samples`](Self::get_samples) for callers
    /// that reuse a window buffer every frame.
    pub fn read_latest_into(&self, out: &mut [f32]) {
        let chunks = lock_or_recover(&self.chunks);
        let mut end = out.len();

        // Walk newest to oldest, filling from the back
        for chunk in chunks.iter().rev() {
            if end == 0 {
                break;
            }
            let take = chunk.len().min(end);
            out[end - take..end].copy_from_slice(&chunk[chunk.len() - take..]);
            end -= take;
        }
        out[..end].fill(0.0);
    }

    /// Drop all chunks; `get_latest` returns silence afterwards
    pub fn clear(&self) {
        lock_or_recover(&self.chunks).clear();
    }

    pub fn is_empty(&self) -> bool {
        lock_or_recover(&self.chunks).is_empty()
    }

    pub fn num_chunks(&self) -> usize {
        lock_or_recover(&self.chunks).len()
    }

    pub fn total_samples(&self) -> usize {
        lock_or_recover(&self.chunks).iter().map(Vec::len).sum()
    }
}

/// Producer-side staging area that turns arbitrary callback block sizes
/// into exact `chunk_size` pushes.
///
/// Owned by the callback closure, so it needs no lock of its own.
#[derive(Debug)]
pub struct ChunkAssembler {
    staging: Vec<f32>,
    chunk_size: usize,
}

impl ChunkAssembler {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            staging: Vec::with_capacity(chunk_size),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Append one sample, pushing a full chunk to `buffer` when complete
    pub fn push_sample(&mut self, sample: f32, buffer: &RingBuffer) {
        self.staging.push(sample);
        if self.staging.len() == self.chunk_size {
            buffer.push(&self.staging);
            self.staging.clear();
        }
    }

    /// Append a block of samples
    pub fn extend(&mut self, samples: &[f32], buffer: &RingBuffer) {
        let mut rest = samples;
        while !rest.is_empty() {
            let room = self.chunk_size - self.staging.len();
            let take = room.min(rest.len());
            self.staging.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            if self.staging.len() == self.chunk_size {
                buffer.push(&self.staging);
                self.staging.clear();
            }
        }
    }

    /// Discard a partially filled chunk
    pub fn reset(&mut self) {
        self.staging.clear();
    }
}
