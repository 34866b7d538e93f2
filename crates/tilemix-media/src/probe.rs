// crates/tilemix-media/src/probe.rs
//
// In-process FFmpeg probing: clip duration and frame rate.

use std::path::PathBuf;

use anyhow::Result;
use ffmpeg_the_third as ffmpeg;
use ffmpeg::media::Type;

/// Fallback frame rate when the container reports none (still images,
/// broken headers). Matches the most common source material.
const DEFAULT_FPS: f64 = 25.0;

/// Probe `path` for (duration seconds, frames per second).
pub fn probe_clip(path: &PathBuf) -> Result<(f64, f64)> {
    let ictx = ffmpeg::format::input(path)?;

    // Container duration first; fall back to the best stream's own duration.
    let mut duration = ictx.duration() as f64 / ffmpeg::ffi::AV_TIME_BASE as f64;
    if duration <= 0.0 {
        if let Some(stream) = ictx.streams().best(Type::Video)
            .or_else(|| ictx.streams().best(Type::Audio))
        {
            let tb = stream.time_base();
            duration = stream.duration() as f64 * tb.numerator() as f64
                / tb.denominator() as f64;
        }
    }
    if duration <= 0.0 {
        anyhow::bail!("duration unknown for '{}'", path.display());
    }

    let fps = ictx.streams().best(Type::Video)
        .map(|s| {
            let r = s.avg_frame_rate();
            if r.denominator() > 0 && r.numerator() > 0 {
                r.numerator() as f64 / r.denominator() as f64
            } else {
                DEFAULT_FPS
            }
        })
        .unwrap_or(DEFAULT_FPS);

    log::debug!("[media] probe {duration:.2}s @ {fps:.2}fps ← {}", path.display());
    Ok((duration, fps))
}
