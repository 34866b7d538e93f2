// crates/tilemix-app/src/context.rs
//
// AppContext owns every runtime handle that is NOT part of the serializable
// session state: the loader worker, the rodio output, both scheduler
// halves, and the per-clip decoded material. TileMixApp holds one of these
// plus a SessionState and the pending command queue — nothing else.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rodio::OutputStream;
use uuid::Uuid;

use tilemix_core::audio::AudioBuffer;
use tilemix_media::{AudioLoop, ClipFrames, FrameCadence, MediaWorker};

use crate::sink::RodioSink;

pub struct AppContext {
    pub worker: MediaWorker,

    /// rodio OutputStream — must outlive the sink connected to its mixer.
    /// None when no audio device is available; the app then runs silent.
    pub audio_stream: Option<OutputStream>,
    pub audio_sink:   Option<Arc<RodioSink>>,
    pub audio_loop:   AudioLoop,

    /// Periodic video redraw timer.
    pub cadence: FrameCadence,
    /// Permutation source for the video pipeline (the audio loop thread
    /// owns its own).
    pub rng: StdRng,

    /// Runtime-only per-clip material, keyed by clip id.
    pub sources:       HashMap<Uuid, ClipFrames>,
    pub audio_buffers: HashMap<Uuid, AudioBuffer>,

    /// The mosaic canvas texture, created on the first rendered frame.
    pub canvas: Option<egui::TextureHandle>,
    /// Most recent per-iteration failure, surfaced in the status line.
    pub last_error: Option<String>,
}

impl AppContext {
    pub fn new(tick_ms: u64) -> Self {
        let audio_stream = match rodio::OutputStreamBuilder::open_default_stream() {
            Ok(stream) => Some(stream),
            Err(e) => {
                log::warn!("[app] no audio output: {e}");
                None
            }
        };
        let audio_sink = audio_stream.as_ref().map(|s| Arc::new(RodioSink::new(s)));

        Self {
            worker: MediaWorker::new(),
            audio_stream,
            audio_sink,
            audio_loop: AudioLoop::new(),
            cadence:    FrameCadence::new(Duration::from_millis(tick_ms.max(1))),
            rng:        StdRng::from_entropy(),
            sources:       HashMap::new(),
            audio_buffers: HashMap::new(),
            canvas:     None,
            last_error: None,
        }
    }
}
