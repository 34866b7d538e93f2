// crates/tilemix-media/src/worker.rs
//
// MediaWorker: background clip loading. Each load_clip call probes the file
// and extracts its audio on its own thread, then reports back over the
// shared result channel. The app shell drains the channel once per UI pass.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};
use uuid::Uuid;

use tilemix_core::media_types::LoadResult;
use tilemix_core::session::ClipInfo;

use crate::audio::extract_audio;
use crate::probe::probe_clip;

pub struct MediaWorker {
    /// Shared result channel, drained by the app shell.
    pub rx:   Receiver<LoadResult>,
    tx:       Sender<LoadResult>,
    shutdown: Arc<AtomicBool>,
}

impl MediaWorker {
    pub fn new() -> Self {
        let (tx, rx) = bounded(64);
        Self {
            rx,
            tx,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Probe `path` and extract its audio on a background thread.
    /// Results (or a per-file error) arrive on `rx`.
    pub fn load_clip(&self, path: PathBuf) {
        let tx = self.tx.clone();
        let sd = self.shutdown.clone();

        thread::spawn(move || {
            if sd.load(Ordering::Relaxed) { return; }

            let (duration, fps) = match probe_clip(&path) {
                Ok(d) => d,
                Err(e) => {
                    log::warn!("[media] probe failed for '{}': {e}", path.display());
                    let _ = tx.send(LoadResult::LoadError { path, msg: e.to_string() });
                    return;
                }
            };

            if sd.load(Ordering::Relaxed) { return; }
            let audio = match extract_audio(&path) {
                Ok(buf) => buf,
                Err(e) => {
                    log::warn!("[media] audio extract failed for '{}': {e}", path.display());
                    let _ = tx.send(LoadResult::LoadError { path, msg: e });
                    return;
                }
            };

            let name = path.file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string();

            let info = ClipInfo {
                id: Uuid::new_v4(),
                path,
                name,
                duration,
                fps,
            };
            log::info!("[media] loaded {:.2}s @ {:.2}fps ← {}", duration, fps, info.path.display());
            let _ = tx.send(LoadResult::ClipReady { info, audio });
        });
    }

    /// Ask in-flight loads to bail out at their next checkpoint.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

impl Default for MediaWorker {
    fn default() -> Self {
        Self::new()
    }
}
