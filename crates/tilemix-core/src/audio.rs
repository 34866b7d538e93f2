// crates/tilemix-core/src/audio.rs
//
// Raw PCM model plus the audio half of the mosaic: split a buffer into
// fixed-duration segments, then concatenate a fresh random permutation of
// them into one playable stream. No resampling, no recoding — the stream
// keeps the source format, only the segment order changes.

use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Default length of one shuffle unit.
pub const DEFAULT_SEGMENT_MS: u64 = 500;

// ── PCM format ────────────────────────────────────────────────────────────────

/// Interleaved-PCM format descriptor. Everything duration-related derives
/// from it: `byte_rate` bytes play per second.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AudioSpec {
    pub sample_rate:     u32,
    pub channels:        u16,
    pub bits_per_sample: u16,
}

impl Default for AudioSpec {
    /// The loader's normalization target: CD-rate stereo s16.
    fn default() -> Self {
        Self { sample_rate: 44_100, channels: 2, bits_per_sample: 16 }
    }
}

impl AudioSpec {
    /// Bytes per sample frame (all channels of one sampling instant).
    pub fn block_align(&self) -> usize {
        self.channels as usize * (self.bits_per_sample as usize / 8)
    }

    pub fn byte_rate(&self) -> usize {
        self.sample_rate as usize * self.block_align()
    }

    /// Playback time of `byte_len` bytes in this format.
    pub fn duration_of(&self, byte_len: usize) -> Duration {
        if self.byte_rate() == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(byte_len as f64 / self.byte_rate() as f64)
    }

    /// Byte count for `span` of audio, rounded down to a whole sample frame
    /// so no slice ever splits a sample across segments. Never less than one
    /// frame.
    pub fn bytes_for(&self, span: Duration) -> usize {
        let align = self.block_align().max(1);
        let raw   = (span.as_secs_f64() * self.byte_rate() as f64) as usize;
        (raw / align).max(1) * align
    }
}

// ── Buffers ───────────────────────────────────────────────────────────────────

/// A clip's decoded audio track: raw interleaved PCM plus its format.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBuffer {
    pub spec: AudioSpec,
    pub data: Vec<u8>,
}

impl AudioBuffer {
    pub fn new(spec: AudioSpec, data: Vec<u8>) -> Self {
        Self { spec, data }
    }

    pub fn empty(spec: AudioSpec) -> Self {
        Self { spec, data: Vec::new() }
    }

    pub fn duration(&self) -> Duration {
        self.spec.duration_of(self.data.len())
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration().as_millis() as u64
    }

    /// Append another buffer's samples. Both sides must share a format —
    /// the loader normalizes every clip to one spec before this is called.
    pub fn append(&mut self, other: &AudioBuffer) {
        debug_assert_eq!(self.spec, other.spec, "AudioBuffer::append — format mismatch");
        self.data.extend_from_slice(&other.data);
    }
}

// ── Segment set ───────────────────────────────────────────────────────────────

/// The ordered segments of one source buffer. Splitting is lossless:
/// `concat()` reproduces the source byte-for-byte. `mix()` draws a fresh
/// uniformly random permutation on every call.
#[derive(Clone, Debug)]
pub struct SegmentSet {
    spec:     AudioSpec,
    segments: Vec<Vec<u8>>,
}

impl SegmentSet {
    /// Slice `buffer` into `segment`-long pieces; the final piece keeps
    /// whatever is left and may be shorter. A buffer shorter than one
    /// segment (including an empty one) yields a single-element set.
    pub fn split(buffer: &AudioBuffer, segment: Duration) -> Self {
        let step = buffer.spec.bytes_for(segment);
        let mut segments = Vec::with_capacity(buffer.data.len() / step + 1);
        let mut at = 0;
        while at < buffer.data.len() {
            let end = (at + step).min(buffer.data.len());
            segments.push(buffer.data[at..end].to_vec());
            at = end;
        }
        if segments.is_empty() {
            segments.push(Vec::new());
        }
        Self { spec: buffer.spec, segments }
    }

    pub fn spec(&self) -> AudioSpec {
        self.spec
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(Vec::is_empty)
    }

    pub fn total_bytes(&self) -> usize {
        self.segments.iter().map(Vec::len).sum()
    }

    /// Concatenate in original order — the exact source buffer.
    pub fn concat(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_bytes());
        for seg in &self.segments {
            out.extend_from_slice(seg);
        }
        out
    }

    /// One shuffled stream: a fresh random permutation of the segments,
    /// concatenated. Total length (and therefore playback time) is identical
    /// regardless of the permutation drawn.
    pub fn mix(&self, rng: &mut impl Rng) -> Vec<u8> {
        let mut order: Vec<usize> = (0..self.segments.len()).collect();
        order.shuffle(rng);
        let mut out = Vec::with_capacity(self.total_bytes());
        for i in order {
            out.extend_from_slice(&self.segments[i]);
        }
        out
    }
}
