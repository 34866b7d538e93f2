// crates/tilemix-core/src/session.rs
//
// Session data: the loaded clip collection, the playback cursor, and the
// mosaic configuration. Owned by the app shell and passed by reference into
// the scheduler — everything here lives on the UI thread, so no locking.
// Serializable via serde so a session can be restored on relaunch.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audio::DEFAULT_SEGMENT_MS;
use crate::blur::DEFAULT_BLUR_KERNEL;
use crate::mosaic::GridSpec;

// ── Clip metadata ─────────────────────────────────────────────────────────────

/// One loaded source clip as the session sees it. Decoded frames and the
/// extracted audio live with the runtime, keyed by `id`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClipInfo {
    pub id:       Uuid,
    pub path:     PathBuf,
    pub name:     String,
    /// Seconds.
    pub duration: f64,
    pub fps:      f64,
}

impl ClipInfo {
    /// Frame count of the clip, never less than one.
    pub fn frame_limit(&self) -> u64 {
        ((self.duration * self.fps) as u64).max(1)
    }
}

// ── Configuration ─────────────────────────────────────────────────────────────

/// Tuning knobs for both mosaic pipelines. Defaults reproduce the classic
/// behavior: 4×4 grid, 41-tap blur, a redraw every second, 500 ms audio
/// segments, one-frame navigation steps.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct MosaicConfig {
    pub grid:        GridSpec,
    /// Kernel size of the softening pass; `None` disables it.
    pub blur_kernel: Option<u32>,
    /// Video redraw interval in milliseconds.
    pub tick_ms:     u64,
    /// Audio shuffle unit in milliseconds.
    pub segment_ms:  u64,
    /// Frames moved per forward/backward navigation command.
    pub nav_step:    u64,
}

impl Default for MosaicConfig {
    fn default() -> Self {
        Self {
            grid:        GridSpec::default(),
            blur_kernel: Some(DEFAULT_BLUR_KERNEL),
            tick_ms:     1000,
            segment_ms:  DEFAULT_SEGMENT_MS,
            nav_step:    1,
        }
    }
}

// ── Playback position & navigation ────────────────────────────────────────────

/// The cursor driving which frame the video pipeline reads next:
/// which clip, and how many frames into it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackPosition {
    pub clip:  usize,
    pub frame: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavDirection {
    /// Step the frame cursor forward within the active clip.
    Forward,
    /// Step it backward.
    Backward,
    /// Switch to the previous clip in the collection.
    PrevClip,
    /// Switch to the next clip.
    NextClip,
}

// ── Session state ─────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionState {
    pub clips:    Vec<ClipInfo>,
    pub position: PlaybackPosition,
    pub config:   MosaicConfig,
    /// True while the periodic video redraw is armed. Runtime-only.
    #[serde(skip)]
    pub video_running: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            clips:         Vec::new(),
            position:      PlaybackPosition::default(),
            config:        MosaicConfig::default(),
            video_running: false,
        }
    }
}

impl SessionState {
    /// Register a loaded clip. Re-loading a path that is already present
    /// replaces its metadata instead of duplicating the entry.
    pub fn add_clip(&mut self, info: ClipInfo) {
        if let Some(existing) = self.clips.iter_mut().find(|c| c.path == info.path) {
            *existing = info;
        } else {
            self.clips.push(info);
        }
    }

    pub fn active_clip(&self) -> Option<&ClipInfo> {
        self.clips.get(self.position.clip)
    }

    /// Time offset of the cursor inside the active clip, in seconds.
    /// A cursor past the clip end reads as 0 (wrapped, never an error).
    pub fn offset_secs(&self) -> f64 {
        match self.active_clip() {
            Some(clip) if clip.fps > 0.0 => {
                let frame = if self.position.frame >= clip.frame_limit() {
                    0
                } else {
                    self.position.frame
                };
                frame as f64 / clip.fps
            }
            _ => 0.0,
        }
    }

    /// Apply one navigation command to the cursor.
    ///
    /// Forward wraps to frame 0 past the clip end; backward stops at 0.
    /// Clip switches clamp to the collection bounds — no wraparound.
    /// Returns false (a no-op, not a failure) when no clips are loaded.
    pub fn navigate(&mut self, dir: NavDirection) -> bool {
        if self.clips.is_empty() {
            return false;
        }
        let step = self.config.nav_step.max(1);
        match dir {
            NavDirection::Forward  => self.position.frame += step,
            NavDirection::Backward => self.position.frame = self.position.frame.saturating_sub(step),
            NavDirection::PrevClip => self.position.clip = self.position.clip.saturating_sub(1),
            NavDirection::NextClip => {
                self.position.clip = (self.position.clip + 1).min(self.clips.len() - 1);
            }
        }
        self.wrap_frame();
        true
    }

    /// Wrap the frame cursor to 0 once it runs past the active clip's end.
    /// Also applied after clip switches, where the old offset may be out of
    /// range for the new clip.
    fn wrap_frame(&mut self) {
        if let Some(clip) = self.active_clip() {
            if self.position.frame >= clip.frame_limit() {
                self.position.frame = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(name: &str, duration: f64, fps: f64) -> ClipInfo {
        ClipInfo {
            id: Uuid::new_v4(),
            path: PathBuf::from(format!("/clips/{name}.mp4")),
            name: name.to_string(),
            duration,
            fps,
        }
    }

    fn session_with(clips: Vec<ClipInfo>) -> SessionState {
        let mut s = SessionState::default();
        for c in clips {
            s.add_clip(c);
        }
        s
    }

    #[test]
    fn navigate_with_no_clips_is_a_no_op() {
        let mut s = SessionState::default();
        assert!(!s.navigate(NavDirection::Forward));
        assert_eq!(s.position, PlaybackPosition::default());
    }

    #[test]
    fn next_clip_clamps_at_the_last_index() {
        let mut s = session_with(vec![clip("a", 10.0, 25.0), clip("b", 10.0, 25.0)]);
        s.navigate(NavDirection::NextClip);
        s.navigate(NavDirection::NextClip);
        s.navigate(NavDirection::NextClip);
        assert_eq!(s.position.clip, 1);
    }

    #[test]
    fn prev_clip_clamps_at_zero() {
        let mut s = session_with(vec![clip("a", 10.0, 25.0), clip("b", 10.0, 25.0)]);
        s.navigate(NavDirection::PrevClip);
        assert_eq!(s.position.clip, 0);
    }

    #[test]
    fn forward_past_the_end_wraps_to_zero() {
        // 2 s at 5 fps → frames 0..10.
        let mut s = session_with(vec![clip("a", 2.0, 5.0)]);
        s.position.frame = 9;
        s.navigate(NavDirection::Forward);
        assert_eq!(s.position.frame, 0);
    }

    #[test]
    fn backward_saturates_at_zero() {
        let mut s = session_with(vec![clip("a", 2.0, 5.0)]);
        s.navigate(NavDirection::Backward);
        assert_eq!(s.position.frame, 0);
    }

    #[test]
    fn switching_to_a_shorter_clip_wraps_the_stale_offset() {
        let mut s = session_with(vec![clip("long", 100.0, 25.0), clip("short", 1.0, 25.0)]);
        s.position.frame = 500;
        s.navigate(NavDirection::NextClip);
        assert_eq!(s.position.clip, 1);
        assert_eq!(s.position.frame, 0);
    }

    #[test]
    fn offset_secs_follows_the_cursor() {
        let mut s = session_with(vec![clip("a", 10.0, 25.0)]);
        s.position.frame = 50;
        assert!((s.offset_secs() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn reloading_a_path_replaces_instead_of_duplicating() {
        let mut s = session_with(vec![clip("a", 10.0, 25.0)]);
        let mut again = clip("a", 12.0, 30.0);
        again.path = s.clips[0].path.clone();
        s.add_clip(again);
        assert_eq!(s.clips.len(), 1);
        assert!((s.clips[0].duration - 12.0).abs() < 1e-9);
    }
}
