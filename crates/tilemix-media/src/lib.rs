// crates/tilemix-media/src/lib.rs
//
// The runtime half of TileMix: FFmpeg decoding, the background clip loader,
// and the playback scheduler. No egui dependency — communicates with the
// app shell via channels and plain core types only.
//
// To add a new media capability:
//   1. Create a new module file here
//   2. Add `pub mod mymodule;` below
//   3. Call it from worker.rs (load_clip) or scheduler.rs

pub mod audio;
pub mod decode;
pub mod probe;
pub mod scheduler;
pub mod worker;

// Re-export the main public API so app-shell imports stay simple.
pub use decode::{ClipFrames, CANVAS_H, CANVAS_W};
pub use scheduler::{render_tick, AudioLoop, FrameCadence};
pub use worker::MediaWorker;
pub use tilemix_core::media_types::{AudioSink, FrameSource, LoadResult, MediaError};
