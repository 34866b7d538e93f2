// crates/tilemix-media/src/decode.rs
//
// Random-access frame decoding: seek to a time offset, decode one frame,
// scale it to the mosaic canvas. One-shot per request — the mosaic redraws
// once a second and navigation jumps arbitrarily, so a stateful sequential
// decoder would be re-opened on nearly every call anyway.

use std::path::PathBuf;

use anyhow::Result;
use ffmpeg_the_third as ffmpeg;
use ffmpeg::format::{input, Pixel};
use ffmpeg::media::Type;
use ffmpeg::software::scaling::{context::Context as SwsContext, flag::Flags};

use tilemix_core::frame::Frame;
use tilemix_core::media_types::{FrameSource, MediaError};

/// Mosaic canvas size. Every decoded frame is scaled here before
/// partitioning, so tiles are consistent across sources of any resolution.
pub const CANVAS_W: u32 = 640;
pub const CANVAS_H: u32 = 480;

/// The decoding service for one clip: maps a time offset to a decoded
/// canvas-sized RGB frame.
pub struct ClipFrames {
    path: PathBuf,
}

impl ClipFrames {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl FrameSource for ClipFrames {
    fn frame_at(&self, secs: f64) -> Result<Frame, MediaError> {
        decode_frame_at(&self.path, secs, CANVAS_W, CANVAS_H)
            .map_err(|e| MediaError::Decode(e.to_string()))
    }
}

/// Seek `path` to `timestamp` and decode one frame, scaled to
/// `out_w × out_h` RGB with a Lanczos filter.
pub fn decode_frame_at(path: &PathBuf, timestamp: f64, out_w: u32, out_h: u32) -> Result<Frame> {
    let mut ictx = input(path)?;

    let video_stream_idx = ictx.streams().best(Type::Video)
        .ok_or_else(|| anyhow::anyhow!("no video stream"))?
        .index();

    let seek_ts = {
        let stream = ictx.stream(video_stream_idx).unwrap();
        let tb     = stream.time_base();
        (timestamp * tb.denominator() as f64 / tb.numerator() as f64) as i64
    };
    let _ = ictx.seek(seek_ts, ..=seek_ts);

    // Second context for decoder construction (Parameters borrows from Stream/ictx).
    let ictx2       = input(path)?;
    let stream2     = ictx2.stream(video_stream_idx)
        .ok_or_else(|| anyhow::anyhow!("stream gone"))?;
    let decoder_ctx = ffmpeg::codec::context::Context::from_parameters(stream2.parameters())?;
    let mut decoder = decoder_ctx.decoder().video()?;

    let mut scaler = SwsContext::get(
        decoder.format(), decoder.width(), decoder.height(),
        Pixel::RGB24, out_w, out_h,
        Flags::LANCZOS,
    )?;

    // last_good holds the most-recently scaled frame in case we hit EOF
    // before reaching seek_ts (e.g. requesting the final frame of a clip).
    let mut last_good: Option<ffmpeg::util::frame::video::Video> = None;

    for result in ictx.packets() {
        let (stream, packet) = match result {
            Ok(p)  => p,
            Err(_) => continue,
        };
        if stream.index() != video_stream_idx { continue; }
        if decoder.send_packet(&packet).is_err() { continue; }
        let mut decoded = ffmpeg::util::frame::video::Video::empty();
        while decoder.receive_frame(&mut decoded).is_ok() {
            let mut out_frame = ffmpeg::util::frame::video::Video::empty();
            scaler.run(&decoded, &mut out_frame)?;
            last_good = Some(out_frame.clone());
            // Skip frames that landed before our target due to keyframe-aligned seek.
            if let Some(pts) = decoded.pts() {
                if pts + 2 < seek_ts { continue; }
            }
            return Ok(destripe(&out_frame, out_w, out_h));
        }
    }

    // EOF reached without hitting seek_ts — use the last frame we saw.
    if let Some(out_frame) = last_good {
        return Ok(destripe(&out_frame, out_w, out_h));
    }

    Err(anyhow::anyhow!("no frame found at t={timestamp:.3}"))
}

/// Copy only visible pixels out of the scaled frame, dropping the per-row
/// stride padding FFmpeg allocates.
fn destripe(out_frame: &ffmpeg::util::frame::video::Video, out_w: u32, out_h: u32) -> Frame {
    let stride = out_frame.stride(0);
    let raw    = out_frame.data(0);
    let row_bytes = out_w as usize * 3;
    let data: Vec<u8> = (0..out_h as usize)
        .flat_map(|row| &raw[row * stride..row * stride + row_bytes])
        .copied()
        .collect();
    Frame::new(out_w, out_h, data)
}
