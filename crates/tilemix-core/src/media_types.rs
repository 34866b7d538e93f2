// crates/tilemix-core/src/media_types.rs
//
// Contracts between the engine and its collaborators, plus the types that
// flow across the loader channel. No egui, no ffmpeg — just plain data.

use std::path::PathBuf;

use thiserror::Error;

use crate::audio::{AudioBuffer, AudioSpec};
use crate::frame::Frame;
use crate::session::ClipInfo;

/// What can go wrong inside one playback iteration. Failures are local to
/// the iteration that hit them: the video loop skips the tick and re-arms,
/// the audio loop shuts down cleanly.
#[derive(Debug, Error)]
pub enum MediaError {
    /// The decoding service failed to produce a frame.
    #[error("decode: {0}")]
    Decode(String),
    /// The audio output device rejected a stream.
    #[error("audio sink: {0}")]
    Sink(String),
}

/// Decoding service contract: random access to decoded frames by time
/// offset. Implementations may be arbitrarily slow — callers treat a call
/// as blocking.
pub trait FrameSource: Send {
    fn frame_at(&self, secs: f64) -> Result<Frame, MediaError>;
}

/// Audio output contract. `play` hands over one PCM stream and returns
/// without waiting for it to finish; `stop_all` silences the device
/// immediately, discarding anything queued.
pub trait AudioSink: Send + Sync {
    fn play(&self, pcm: &[u8], spec: AudioSpec) -> Result<(), MediaError>;
    fn stop_all(&self);
}

/// Results sent from the background clip loader to the app shell.
pub enum LoadResult {
    /// Probe + audio extraction finished; the clip is ready to play.
    ClipReady { info: ClipInfo, audio: AudioBuffer },
    /// The file couldn't be loaded. The session is left untouched.
    LoadError { path: PathBuf, msg: String },
}
