// crates/tilemix-app/src/app.rs
//
// The TileMix shell: one window with the mosaic canvas, the clip list, and
// transport controls. Widgets and hotkeys emit EngineCommands; they are
// processed after the UI pass, then the video cadence is polled and the
// canvas redrawn if a tick is due. All mutable playback state lives here on
// the UI thread — the audio loop thread only ever sees immutable material.

use std::sync::Arc;
use std::time::{Duration, Instant};

use eframe::egui;
use serde::{Deserialize, Serialize};

use tilemix_core::audio::{AudioBuffer, SegmentSet};
use tilemix_core::commands::EngineCommand;
use tilemix_core::media_types::{AudioSink, LoadResult};
use tilemix_core::session::{NavDirection, SessionState};
use tilemix_media::{render_tick, ClipFrames};

use crate::context::AppContext;

/// Longest the shell sleeps between passes even when no tick is near —
/// keeps loader results and button feedback prompt.
const IDLE_REPAINT: Duration = Duration::from_millis(250);

#[derive(Serialize, Deserialize)]
struct AppStorage {
    session: SessionState,
}

pub struct TileMixApp {
    session: SessionState,
    context: AppContext,
    /// Commands emitted by widgets/hotkeys this pass, processed after the UI pass.
    pending_cmds: Vec<EngineCommand>,
    /// Forces one immediate redraw outside the cadence (navigation, clip pick).
    redraw_now: bool,
}

impl TileMixApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let session = cc.storage
            .and_then(|s| eframe::get_value::<AppStorage>(s, eframe::APP_KEY))
            .map(|d| d.session)
            .unwrap_or_default();

        let context = AppContext::new(session.config.tick_ms);

        // Decoded material is runtime-only — re-request loading for every
        // clip the restored session still lists.
        for clip in &session.clips {
            context.worker.load_clip(clip.path.clone());
        }

        Self {
            session,
            context,
            pending_cmds: Vec::new(),
            redraw_now: false,
        }
    }

    // ── Loader results ───────────────────────────────────────────────────────

    fn ingest_load_results(&mut self) {
        while let Ok(result) = self.context.worker.rx.try_recv() {
            match result {
                LoadResult::ClipReady { info, audio } => {
                    self.context.sources.insert(info.id, ClipFrames::new(info.path.clone()));
                    self.context.audio_buffers.insert(info.id, audio);
                    self.session.add_clip(info);
                }
                LoadResult::LoadError { path, msg } => {
                    self.context.last_error = Some(format!("{}: {msg}", path.display()));
                }
            }
        }
    }

    // ── Commands ─────────────────────────────────────────────────────────────

    fn process_command(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::LoadClips(paths) => {
                for path in paths {
                    self.context.worker.load_clip(path);
                }
            }
            EngineCommand::Start => self.start_playback(),
            EngineCommand::StopAudio => {
                // Harmless when idle; silences the device right away otherwise.
                self.context.audio_loop.stop();
            }
            EngineCommand::StopVideo => {
                self.context.cadence.disarm();
                self.session.video_running = false;
            }
            EngineCommand::Navigate(dir) => {
                if self.session.navigate(dir) {
                    self.redraw_now = true;
                }
            }
        }
    }

    fn start_playback(&mut self) {
        if self.session.clips.is_empty() {
            self.context.last_error = Some("load some video files first".into());
            return;
        }

        // Combined audio of every loaded clip, in collection order, so the
        // shuffled stream remixes the whole session.
        let mut combined: Option<AudioBuffer> = None;
        for clip in &self.session.clips {
            if let Some(buf) = self.context.audio_buffers.get(&clip.id) {
                match &mut combined {
                    Some(all) => all.append(buf),
                    None      => combined = Some(buf.clone()),
                }
            }
        }

        match (combined, self.context.audio_sink.clone()) {
            (Some(buf), Some(sink)) => {
                let segment = Duration::from_millis(self.session.config.segment_ms.max(1));
                let set = SegmentSet::split(&buf, segment);
                log::info!("[app] audio loop over {} segments ({} ms total)",
                    set.len(), buf.duration_ms());
                self.context.audio_loop.start(set, sink as Arc<dyn AudioSink>, None);
            }
            (_, None) => log::warn!("[app] start without an audio device — video only"),
            (None, _) => log::warn!("[app] clips still loading — audio skipped"),
        }

        self.context.cadence.arm(Instant::now());
        self.session.video_running = true;
        self.redraw_now = true;
    }

    // ── Video tick ───────────────────────────────────────────────────────────

    fn render_mosaic(&mut self, ctx: &egui::Context) {
        let Some(clip) = self.session.active_clip() else { return };
        let Some(source) = self.context.sources.get(&clip.id) else {
            return; // still loading — the next tick will catch it
        };

        let at = self.session.offset_secs();
        match render_tick(source, at, &self.session.config, &mut self.context.rng) {
            Ok(frame) => {
                let image = egui::ColorImage::from_rgb(
                    [frame.width as usize, frame.height as usize],
                    &frame.data,
                );
                match &mut self.context.canvas {
                    Some(tex) => tex.set(image, egui::TextureOptions::LINEAR),
                    None => {
                        self.context.canvas =
                            Some(ctx.load_texture("mosaic-canvas", image, egui::TextureOptions::LINEAR));
                    }
                }
                self.context.last_error = None;
            }
            Err(e) => {
                // Skip this redraw — the cadence has already re-armed.
                log::warn!("[app] tick skipped: {e}");
                self.context.last_error = Some(e.to_string());
            }
        }
    }

    // ── UI ───────────────────────────────────────────────────────────────────

    fn handle_keys(&mut self, ctx: &egui::Context) {
        let nav = ctx.input(|i| {
            if i.key_pressed(egui::Key::ArrowRight)     { Some(NavDirection::Forward) }
            else if i.key_pressed(egui::Key::ArrowLeft) { Some(NavDirection::Backward) }
            else if i.key_pressed(egui::Key::ArrowUp)   { Some(NavDirection::PrevClip) }
            else if i.key_pressed(egui::Key::ArrowDown) { Some(NavDirection::NextClip) }
            else { None }
        });
        if let Some(dir) = nav {
            self.pending_cmds.push(EngineCommand::Navigate(dir));
        }
    }

    fn ui_controls(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Load videos…").clicked() {
                    if let Some(paths) = rfd::FileDialog::new()
                        .add_filter("video", &["mp4", "avi", "mov", "mkv", "webm"])
                        .pick_files()
                    {
                        self.pending_cmds.push(EngineCommand::LoadClips(paths));
                    }
                }
                if ui.button("▶ Start").clicked() {
                    self.pending_cmds.push(EngineCommand::Start);
                }
                if ui.button("⏹ Stop audio").clicked() {
                    self.pending_cmds.push(EngineCommand::StopAudio);
                }
                if ui.button("⏹ Stop video").clicked() {
                    self.pending_cmds.push(EngineCommand::StopVideo);
                }
                ui.separator();
                let audio = if self.context.audio_loop.is_playing() { "remixing" } else { "idle" };
                let video = if self.session.video_running { "running" } else { "stopped" };
                ui.label(format!("audio {audio} · video {video}"));
                ui.separator();
                ui.label("←/→ step · ↑/↓ switch clip");
            });
        });
    }

    fn ui_clip_list(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("clips").default_width(220.0).show(ctx, |ui| {
            ui.heading("Clips");
            let mut picked = None;
            for (i, clip) in self.session.clips.iter().enumerate() {
                let selected = i == self.session.position.clip;
                let label = format!("{} · {:.1}s", clip.name, clip.duration);
                if ui.selectable_label(selected, label).clicked() {
                    picked = Some(i);
                }
                if !self.context.sources.contains_key(&clip.id) {
                    ui.weak("  loading…");
                }
            }
            if let Some(i) = picked {
                self.session.position.clip = i;
                self.redraw_now = true;
            }
            if self.session.clips.is_empty() {
                ui.weak("No clips loaded yet.");
            }
        });
    }

    fn ui_canvas(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            match &self.context.canvas {
                Some(tex) => {
                    ui.centered_and_justified(|ui| {
                        ui.add(egui::Image::new(tex).shrink_to_fit());
                    });
                }
                None => {
                    ui.centered_and_justified(|ui| {
                        ui.weak("Load videos and press Start.");
                    });
                }
            }
            if let Some(err) = &self.context.last_error {
                ui.colored_label(egui::Color32::LIGHT_RED, err);
            }
        });
    }
}

impl eframe::App for TileMixApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ingest_load_results();
        self.handle_keys(ctx);

        self.ui_controls(ctx);
        self.ui_clip_list(ctx);
        self.ui_canvas(ctx);

        for cmd in std::mem::take(&mut self.pending_cmds) {
            self.process_command(cmd);
        }

        let due = self.context.cadence.poll(Instant::now());
        if due || self.redraw_now {
            self.redraw_now = false;
            self.render_mosaic(ctx);
        }

        // Wake for the next tick; cap the wait so loader results surface
        // promptly even while video is stopped.
        let wait = self.context.cadence
            .until_due(Instant::now())
            .unwrap_or(IDLE_REPAINT)
            .min(IDLE_REPAINT);
        ctx.request_repaint_after(wait);
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, &AppStorage {
            session: self.session.clone(),
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.context.audio_loop.stop();
        self.context.worker.shutdown();
    }
}
